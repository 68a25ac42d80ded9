//! Serialized forms of the stored documents. Field names follow the established file format, so
//! existing files keep loading.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::{
    canonical::DEFAULT_VERSIONED_APPS,
    classify::GroupRuleSet,
    settings::{Settings, SettingsUpdate},
};

use super::ledger::Ledger;

/// Accounting data document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DataDocument {
    #[serde(default)]
    pub window_times: IndexMap<String, f64>,
    #[serde(rename = "AFK_time", default)]
    pub afk_time: f64,
    #[serde(default, with = "lenient_date")]
    pub reset_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub window_original_titles: IndexMap<String, String>,
}

impl DataDocument {
    pub fn from_ledger(ledger: &Ledger) -> Self {
        Self {
            window_times: ledger.window_times.clone(),
            afk_time: ledger.afk_time,
            reset_date: Some(ledger.reset_date),
            window_original_titles: ledger.original_titles.clone(),
        }
    }

    /// Converts the document into a ledger. Values that would break accounting invariants are
    /// repaired instead of rejected.
    pub fn into_ledger(self, now: DateTime<Utc>) -> Ledger {
        let window_times = self
            .window_times
            .into_iter()
            .map(|(title, seconds)| {
                if seconds < 0. {
                    warn!("Stored duration for {title:?} is negative, resetting to 0");
                }
                (title, seconds.max(0.))
            })
            .collect();

        Ledger {
            window_times,
            original_titles: self.window_original_titles,
            afk_time: self.afk_time.max(0.),
            reset_date: self.reset_date.unwrap_or(now),
        }
    }
}

/// Tunables document. Every field is optional so that a hand edited file with missing keys still
/// loads.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SettingsDocument {
    #[serde(rename = "AFK_TIMEOUT", default)]
    pub afk_timeout: Option<u64>,
    #[serde(rename = "SAVE_TIME", default)]
    pub save_interval: Option<u64>,
    #[serde(rename = "MIN_DISPLAY_TIME", default)]
    pub min_display_time: Option<u64>,
    #[serde(rename = "TOP_PER_GROUP", default)]
    pub top_per_group: Option<usize>,
    #[serde(rename = "PURGE_THRESHOLD", default)]
    pub purge_threshold: Option<u64>,
    #[serde(rename = "TITLE_TRUNCATE", default)]
    pub title_truncate: Option<usize>,
    #[serde(rename = "RESET_DATE", default, with = "lenient_date")]
    pub reset_date: Option<DateTime<Utc>>,
}

impl SettingsDocument {
    pub fn new(settings: &Settings, reset_date: DateTime<Utc>) -> Self {
        Self {
            afk_timeout: Some(settings.afk_timeout),
            save_interval: Some(settings.save_interval),
            min_display_time: Some(settings.min_display_time),
            top_per_group: Some(settings.top_per_group),
            purge_threshold: Some(settings.purge_threshold),
            title_truncate: Some(settings.title_truncate),
            reset_date: Some(reset_date),
        }
    }

    pub fn as_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            afk_timeout: self.afk_timeout,
            save_interval: self.save_interval,
            min_display_time: self.min_display_time,
            top_per_group: self.top_per_group,
            purge_threshold: self.purge_threshold,
            title_truncate: self.title_truncate,
        }
    }
}

/// Classification configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub groups: GroupRuleSet,
    /// Groups whose windows keep counting as active while the user is idle, e.g. video players.
    #[serde(default = "default_afk_exempt")]
    pub afk_exempt: Vec<String>,
    /// Applications whose titles carry their version right after the name.
    #[serde(default = "default_versioned_apps")]
    pub versioned_apps: Vec<String>,
}

impl GroupConfig {
    pub fn is_afk_exempt(&self, group: &str) -> bool {
        self.afk_exempt.iter().any(|v| v == group)
    }
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            groups: GroupRuleSet::default(),
            afk_exempt: default_afk_exempt(),
            versioned_apps: default_versioned_apps(),
        }
    }
}

fn default_afk_exempt() -> Vec<String> {
    vec!["Unimportant".to_string()]
}

fn default_versioned_apps() -> Vec<String> {
    DEFAULT_VERSIONED_APPS.iter().map(|v| v.to_string()).collect()
}

/// Dates are written as RFC 3339. Reading also accepts dates without an offset, which are
/// treated as UTC. Anything unparseable is dropped with a warning instead of failing the whole
/// document.
mod lenient_date {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::warn;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(value) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        Ok(parse(&value))
    }

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(date) = DateTime::parse_from_rfc3339(value) {
            return Some(date.with_timezone(&Utc));
        }
        if let Ok(date) = value.parse::<NaiveDateTime>() {
            return Some(date.and_utc());
        }
        warn!("Couldn't parse stored date {value:?}");
        None
    }
}
