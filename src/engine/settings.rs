use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;
const MIN_TITLE_TRUNCATE: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime tunables of the tracker. Every value can be changed while tracking and is persisted
/// next to the accounting data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Idle seconds after which the user counts as away.
    pub afk_timeout: u64,
    /// Seconds between flushes to disk.
    pub save_interval: u64,
    /// Entries tracked for less than this many seconds are folded into a global bucket.
    pub min_display_time: u64,
    pub top_per_group: usize,
    /// Default threshold in seconds used by purge.
    pub purge_threshold: u64,
    /// Maximum label length in characters.
    pub title_truncate: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            afk_timeout: 60,
            save_interval: 60,
            min_display_time: 60,
            top_per_group: 5,
            purge_threshold: 10,
            title_truncate: 50,
        }
    }
}

/// A partial settings change. Missing values keep their current state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::Args)]
pub struct SettingsUpdate {
    #[arg(long, help = "Idle seconds after which you are considered AFK")]
    pub afk_timeout: Option<u64>,
    #[arg(long, help = "Seconds between saves")]
    pub save_interval: Option<u64>,
    #[arg(long, help = "Entries below this many seconds are grouped as insignificant")]
    pub min_display_time: Option<u64>,
    #[arg(long, help = "Number of entries shown per group")]
    pub top_per_group: Option<usize>,
    #[arg(long, help = "Default threshold in seconds for purge")]
    pub purge_threshold: Option<u64>,
    #[arg(long, help = "Maximum length of displayed titles")]
    pub title_truncate: Option<usize>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Settings {
    pub fn afk_timeout(&self) -> Duration {
        Duration::from_secs(self.afk_timeout)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval)
    }

    /// Produces the settings with `update` applied. The update is rejected as a whole if any
    /// resulting value is invalid.
    pub fn apply(&self, update: &SettingsUpdate) -> Result<Settings, SettingsError> {
        let candidate = Settings {
            afk_timeout: update.afk_timeout.unwrap_or(self.afk_timeout),
            save_interval: update.save_interval.unwrap_or(self.save_interval),
            min_display_time: update.min_display_time.unwrap_or(self.min_display_time),
            top_per_group: update.top_per_group.unwrap_or(self.top_per_group),
            purge_threshold: update.purge_threshold.unwrap_or(self.purge_threshold),
            title_truncate: update.title_truncate.unwrap_or(self.title_truncate),
        };
        candidate.validate()?;
        Ok(candidate)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_interval("afk_timeout", self.afk_timeout)?;
        validate_interval("save_interval", self.save_interval)?;
        if self.top_per_group == 0 {
            return Err(SettingsError::Invalid {
                field: "top_per_group",
                reason: "must be at least 1".into(),
            });
        }
        if self.title_truncate < MIN_TITLE_TRUNCATE {
            return Err(SettingsError::Invalid {
                field: "title_truncate",
                reason: format!("must be at least {MIN_TITLE_TRUNCATE} characters"),
            });
        }
        Ok(())
    }
}

fn validate_interval(field: &'static str, seconds: u64) -> Result<(), SettingsError> {
    if seconds == 0 {
        return Err(SettingsError::Invalid {
            field,
            reason: "must be positive".into(),
        });
    }
    if seconds > MAX_INTERVAL_SECS {
        return Err(SettingsError::Invalid {
            field,
            reason: format!("cannot exceed {MAX_INTERVAL_SECS} seconds"),
        });
    }
    Ok(())
}
