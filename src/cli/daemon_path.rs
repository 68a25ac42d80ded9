use std::path::{Path, PathBuf};

pub const DAEMON_NAME: &str = "timekeeper-daemon";

/// The daemon binary is installed next to the cli one.
pub fn to_daemon_path(cli_path: &Path) -> PathBuf {
    let mut path = cli_path.to_path_buf();
    path.set_file_name(DAEMON_NAME);
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::to_daemon_path;

    #[test]
    #[cfg(unix)]
    fn test_daemon_is_a_sibling() {
        assert_eq!(
            to_daemon_path(Path::new("/usr/local/bin/timekeeper")),
            Path::new("/usr/local/bin/timekeeper-daemon")
        );
    }
}
