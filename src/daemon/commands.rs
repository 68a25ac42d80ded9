use std::{num::ParseIntError, str::FromStr};

use anyhow::Result;
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};
use tracing::debug;

use crate::engine::settings::SettingsUpdate;

pub const COMMAND_HELP: &str = "Commands: toggle <group> | purge [confirm] | clear [confirm] | \
set <setting> <value> | save";

/// Commands a user interface can issue to a running tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Collapse or expand a group in the live view.
    ToggleGroup(String),
    /// Without `commit` only reports how many entries would go.
    Purge { commit: bool },
    Clear { confirmed: bool },
    UpdateSettings(SettingsUpdate),
    /// Save right away instead of waiting for the next scheduled flush.
    Flush,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandParseError {
    #[error("Unknown command {0:?}")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown setting {0:?}")]
    UnknownSetting(String),
    #[error("Invalid value for {setting}: {source}")]
    InvalidValue {
        setting: String,
        source: ParseIntError,
    },
}

/// What the tracker receives for every non-empty input line.
pub type UiInput = Result<UiCommand, CommandParseError>;

fn parse_confirmation(rest: &str, usage: &'static str) -> Result<bool, CommandParseError> {
    match rest {
        "" => Ok(false),
        "confirm" | "yes" | "y" => Ok(true),
        _ => Err(CommandParseError::Usage(usage)),
    }
}

fn parse_setting(rest: &str) -> Result<SettingsUpdate, CommandParseError> {
    const USAGE: &str = "set <setting> <value>";

    let mut parts = rest.split_whitespace();
    let (Some(setting), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CommandParseError::Usage(USAGE));
    };
    let invalid = |source| CommandParseError::InvalidValue {
        setting: setting.to_string(),
        source,
    };

    let mut update = SettingsUpdate::default();
    match setting.replace('-', "_").to_ascii_lowercase().as_str() {
        "afk_timeout" => update.afk_timeout = Some(value.parse().map_err(invalid)?),
        "save_interval" | "save_time" => {
            update.save_interval = Some(value.parse().map_err(invalid)?)
        }
        "min_display_time" => update.min_display_time = Some(value.parse().map_err(invalid)?),
        "top_per_group" => update.top_per_group = Some(value.parse().map_err(invalid)?),
        "purge_threshold" => update.purge_threshold = Some(value.parse().map_err(invalid)?),
        "title_truncate" => update.title_truncate = Some(value.parse().map_err(invalid)?),
        _ => return Err(CommandParseError::UnknownSetting(setting.to_string())),
    }
    Ok(update)
}

impl FromStr for UiCommand {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (command, rest) = s
            .split_once(char::is_whitespace)
            .map_or((s, ""), |(command, rest)| (command, rest.trim()));

        match command.to_ascii_lowercase().as_str() {
            "toggle" if rest.is_empty() => Err(CommandParseError::Usage("toggle <group>")),
            "toggle" => Ok(UiCommand::ToggleGroup(rest.to_string())),
            "purge" => Ok(UiCommand::Purge {
                commit: parse_confirmation(rest, "purge [confirm]")?,
            }),
            "clear" => Ok(UiCommand::Clear {
                confirmed: parse_confirmation(rest, "clear [confirm]")?,
            }),
            "set" => Ok(UiCommand::UpdateSettings(parse_setting(rest)?)),
            "save" | "flush" if rest.is_empty() => Ok(UiCommand::Flush),
            _ => Err(CommandParseError::Unknown(s.to_string())),
        }
    }
}

/// Reads commands line by line until `input` ends or the tracker stops listening.
pub async fn forward_commands<R: AsyncBufRead + Unpin>(
    input: R,
    sender: mpsc::Sender<UiInput>,
) -> Result<()> {
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("Received command line {line:?}");
        if sender.send(line.parse()).await.is_err() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tokio::sync::mpsc;

    use crate::engine::settings::SettingsUpdate;

    use super::{forward_commands, CommandParseError, UiCommand};

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "toggle  Web Browsing ".parse(),
            Ok(UiCommand::ToggleGroup("Web Browsing".into()))
        );
        assert_eq!("purge".parse(), Ok(UiCommand::Purge { commit: false }));
        assert_eq!("PURGE confirm".parse(), Ok(UiCommand::Purge { commit: true }));
        assert_eq!("clear".parse(), Ok(UiCommand::Clear { confirmed: false }));
        assert_eq!("clear yes".parse(), Ok(UiCommand::Clear { confirmed: true }));
        assert_eq!("save".parse(), Ok(UiCommand::Flush));
        assert_eq!(
            "set top-per-group 3".parse(),
            Ok(UiCommand::UpdateSettings(SettingsUpdate {
                top_per_group: Some(3),
                ..Default::default()
            }))
        );
        assert_eq!(
            "set SAVE_TIME 30".parse(),
            Ok(UiCommand::UpdateSettings(SettingsUpdate {
                save_interval: Some(30),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "dance".parse::<UiCommand>(),
            Err(CommandParseError::Unknown("dance".into()))
        );
        assert_eq!(
            "toggle".parse::<UiCommand>(),
            Err(CommandParseError::Usage("toggle <group>"))
        );
        assert_eq!(
            "purge now".parse::<UiCommand>(),
            Err(CommandParseError::Usage("purge [confirm]"))
        );
        assert_eq!(
            "set colour blue".parse::<UiCommand>(),
            Err(CommandParseError::UnknownSetting("colour".into()))
        );
        assert!(matches!(
            "set afk_timeout -4".parse::<UiCommand>(),
            Err(CommandParseError::InvalidValue { setting, .. }) if setting == "afk_timeout"
        ));
        assert_eq!(
            "set afk_timeout".parse::<UiCommand>(),
            Err(CommandParseError::Usage("set <setting> <value>"))
        );
    }

    #[tokio::test]
    async fn test_forward_commands_skips_blank_lines() -> Result<()> {
        let (sender, mut receiver) = mpsc::channel(10);

        forward_commands(&b"toggle Office\n\n   \npurge confirm\nbogus\n"[..], sender).await?;

        assert_eq!(
            receiver.recv().await,
            Some(Ok(UiCommand::ToggleGroup("Office".into())))
        );
        assert_eq!(
            receiver.recv().await,
            Some(Ok(UiCommand::Purge { commit: true }))
        );
        assert!(matches!(receiver.recv().await, Some(Err(_))));
        assert_eq!(receiver.recv().await, None);
        Ok(())
    }
}
