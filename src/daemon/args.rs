use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Flags of the `timekeeper-daemon` binary.
#[derive(Parser, Debug)]
#[command(name = "timekeeper-daemon", version, about = "Background activity tracker")]
pub struct DaemonArgs {
    /// Run in the current process instead of detaching.
    #[arg(long)]
    pub force: bool,
    /// Application directory. By default $XDG_STATE_HOME/timekeeper or
    /// $HOME/.local/state/timekeeper.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}
