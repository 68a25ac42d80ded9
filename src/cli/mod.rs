pub mod commands;
pub mod daemon_path;
pub mod output;
pub mod process;
pub mod prompt;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{restart_server, stop_trackers};
use tracing::level_filters::LevelFilter;

use crate::{
    engine::settings::SettingsUpdate,
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX, DAEMON_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Timekeeper", version, long_about = None)]
#[command(about = "Measures how long you spend in each window", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a background tracker, replacing a running one")]
    Init {},
    #[command(
        about = "Run a tracker directly in current console. Used for creating a tracker internally and for debugging"
    )]
    Serve {},
    #[command(about = "Track in the foreground with a live summary. Commands are read from stdin")]
    Watch {
        #[arg(long = "collapse", help = "Start with these groups collapsed")]
        collapsed: Vec<String>,
    },
    #[command(about = "Stop currently running trackers. They save before exiting")]
    Stop {},
    #[command(about = "Print a summary of the tracked time")]
    Summary {
        #[arg(long, help = "Print as JSON")]
        json: bool,
        #[arg(long = "collapse", help = "Collapse these groups")]
        collapsed: Vec<String>,
    },
    #[command(about = "Remove entries tracked for less than a threshold")]
    Purge {
        #[arg(long, help = "Threshold in seconds. Defaults to the purge-threshold setting")]
        threshold: Option<u64>,
        #[arg(long, short, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Remove all tracked data and start over")]
    Clear {
        #[arg(long, short, help = "Don't ask for confirmation")]
        yes: bool,
    },
    #[command(about = "Print settings, or change the ones given")]
    Settings {
        #[command(flatten)]
        update: SettingsUpdate,
    },
    #[command(about = "Print the rules used to group windows")]
    Groups {
        #[arg(long, help = "Write the default rules into groups.json for editing")]
        init: bool,
    },
    #[command(about = "Print where the data is kept")]
    Path {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    let dir = resolve_application_path(args.dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    match &args.commands {
        Commands::Serve {} => enable_logging(DAEMON_PREFIX, &dir, logging_level, args.log)?,
        // The screen is redrawn constantly, logs only go into files.
        Commands::Watch { .. } => enable_logging(CLI_PREFIX, &dir, logging_level, false)?,
        _ => enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?,
    }

    match args.commands {
        Commands::Init {} => {
            restart_server(Some(&dir))?;
            println!("Started tracking into {}", dir.display());
            Ok(())
        }
        Commands::Stop {} => {
            let stopped = stop_trackers()?;
            println!("Stopped {stopped} trackers");
            Ok(())
        }
        Commands::Serve {} => commands::serve(&dir).await,
        Commands::Watch { collapsed } => commands::watch(&dir, collapsed).await,
        Commands::Summary { json, collapsed } => commands::summary(&dir, json, collapsed).await,
        Commands::Purge { threshold, yes } => commands::purge(&dir, threshold, yes).await,
        Commands::Clear { yes } => commands::clear(&dir, yes).await,
        Commands::Settings { update } => commands::settings(&dir, update).await,
        Commands::Groups { init } => commands::groups(&dir, init).await,
        Commands::Path {} => commands::path(&dir),
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Args, Commands};

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_settings_update() {
        let args = Args::parse_from([
            "timekeeper",
            "settings",
            "--afk-timeout",
            "120",
            "--top-per-group",
            "3",
            "--dir",
            "/tmp/tk",
        ]);

        let Commands::Settings { update } = args.commands else {
            panic!("Expected the settings command");
        };
        assert_eq!(update.afk_timeout, Some(120));
        assert_eq!(update.top_per_group, Some(3));
        assert_eq!(update.save_interval, None);
        assert_eq!(args.dir.as_deref(), Some(std::path::Path::new("/tmp/tk")));
    }

    #[test]
    fn test_parse_repeated_collapse() {
        let args = Args::parse_from([
            "timekeeper",
            "summary",
            "--json",
            "--collapse",
            "Office",
            "--collapse",
            "Web Browsing",
        ]);

        let Commands::Summary { json, collapsed } = args.commands else {
            panic!("Expected the summary command");
        };
        assert!(json);
        assert_eq!(collapsed, vec!["Office", "Web Browsing"]);
    }
}
