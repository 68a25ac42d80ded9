use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

pub const APPLICATION_DIR: &str = "timekeeper";

/// Directory the documents are kept in when `--dir` isn't given.
pub fn default_application_path() -> Result<PathBuf> {
    let mut path = {
        #[cfg(windows)]
        {
            env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA should be present on Windows"))?
        }
        #[cfg(target_os = "linux")]
        {
            env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/state")))
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))?
        }
        #[cfg(not(any(windows, target_os = "linux")))]
        {
            env::var("HOME")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("Couldn't find HOME"))?
        }
    };

    #[cfg(not(any(windows, target_os = "linux")))]
    path.push(".timekeeper");
    #[cfg(any(windows, target_os = "linux"))]
    path.push(APPLICATION_DIR);

    Ok(path)
}

/// Resolves the application directory and makes sure it exists.
pub fn resolve_application_path(dir: Option<PathBuf>) -> Result<PathBuf> {
    let path = dir.map_or_else(default_application_path, Ok)?;

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}
