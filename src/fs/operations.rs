use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Reads a whole file. A missing file is not an error and gives `None`.
pub async fn read_if_exists(path: &Path) -> Result<Option<String>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    file.lock_shared()?;
    let mut contents = String::new();
    let result = file.read_to_string(&mut contents).await;
    file.unlock_async().await?;
    result?;

    Ok(Some(contents))
}

/// Replaces the contents of `path`. Data is written into a sibling file first and moved over the
/// target afterwards, so an interrupted write never leaves a truncated document behind.
pub async fn replace_contents(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let temporary = temporary_path(path);
    debug!("Writing {path:?} through {temporary:?}");

    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temporary)
        .await?;

    // Semi-safe acquire-release for a file
    file.lock_exclusive()?;
    let result = write_all_synced(&mut file, contents).await;
    file.unlock_async().await?;
    drop(file);

    if let Err(e) = result {
        let _ = fs::remove_file(&temporary).await;
        return Err(e);
    }

    fs::rename(&temporary, path).await
}

async fn write_all_synced(file: &mut File, contents: &[u8]) -> Result<(), io::Error> {
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
