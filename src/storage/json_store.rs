use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

use crate::{
    engine::settings::Settings,
    fs::operations::{read_if_exists, replace_contents},
};

use super::{
    documents::{DataDocument, GroupConfig, SettingsDocument},
    ledger::Ledger,
    Snapshot, Store,
};

pub const DATA_FILE: &str = "window_times.json";
pub const SETTINGS_FILE: &str = "timekeeper_settings.json";
pub const GROUPS_FILE: &str = "groups.json";

/// The main realization of [Store]. Keeps every document as pretty printed JSON inside one
/// directory.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: PathBuf) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn data_path(&self) -> PathBuf {
        self.dir.join(DATA_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn groups_path(&self) -> PathBuf {
        self.dir.join(GROUPS_FILE)
    }

    /// Writes the group rules, e.g. to give the user a starting point for editing.
    pub async fn save_groups(&self, config: &GroupConfig) -> Result<()> {
        write_document(&self.groups_path(), config).await
    }

    /// `None` when the stored values don't pass validation. The whole document is ignored then.
    fn settings_from(defaults: &Settings, document: &SettingsDocument) -> Option<Settings> {
        defaults
            .apply(&document.as_update())
            .inspect_err(|e| warn!("Ignoring stored settings: {e}"))
            .ok()
    }
}

/// Reads and parses a document. `None` means the document should be treated as absent, either
/// because it doesn't exist or because it's broken.
async fn read_document<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match read_if_exists(path).await {
        Ok(Some(contents)) => contents,
        Ok(None) => {
            debug!("{path:?} doesn't exist, using defaults");
            return None;
        }
        Err(e) => {
            warn!("Failed to read {path:?}: {e}");
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(document) => Some(document),
        Err(e) => {
            warn!("{path:?} is corrupted, using defaults: {e}");
            None
        }
    }
}

async fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    let mut buffer = serde_json::to_vec_pretty(document)?;
    buffer.push(b'\n');
    replace_contents(path, &buffer).await?;
    Ok(())
}

impl Store for JsonStore {
    async fn load(&self, defaults: Settings, now: DateTime<Utc>) -> Snapshot {
        let mut ledger = read_document::<DataDocument>(&self.data_path())
            .await
            .map_or_else(|| Ledger::new(now), |v| v.into_ledger(now));

        let stored = read_document::<SettingsDocument>(&self.settings_path())
            .await
            .and_then(|document| Some((Self::settings_from(&defaults, &document)?, document)));
        let settings = match stored {
            Some((settings, document)) => {
                if let Some(reset_date) = document.reset_date {
                    ledger.reset_date = reset_date;
                }
                settings
            }
            None => defaults,
        };

        debug!(
            "Loaded {} entries, {}s AFK since {}",
            ledger.window_times.len(),
            ledger.afk_time,
            ledger.reset_date
        );
        Snapshot { ledger, settings }
    }

    async fn save(&self, ledger: &Ledger, settings: &Settings) -> Result<()> {
        let data = write_document(&self.data_path(), &DataDocument::from_ledger(ledger))
            .await
            .inspect_err(|e| error!("Error saving data {e:?}"));
        let settings = write_document(
            &self.settings_path(),
            &SettingsDocument::new(settings, ledger.reset_date),
        )
        .await
        .inspect_err(|e| error!("Error saving settings {e:?}"));

        data.and(settings)
    }

    async fn load_groups(&self) -> GroupConfig {
        read_document(&self.groups_path()).await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        engine::{
            classify::{GroupRule, GroupRuleSet},
            settings::Settings,
        },
        storage::{documents::GroupConfig, ledger::Ledger, Store},
        utils::logging::TEST_LOGGING,
    };

    use super::JsonStore;

    fn test_ledger() -> Ledger {
        let mut ledger = Ledger::new(Utc.with_ymd_and_hms(2024, 11, 2, 8, 30, 15).unwrap());
        ledger.add_active("report.docx - Word", 1234.567);
        ledger.add_active("Obsidian", 0.25);
        ledger.add_active("Unknown", 0.);
        ledger.offer_original_title("report.docx - Word", "● report.docx - Word");
        ledger.offer_original_title("Obsidian", "Obsidian v1.11.4");
        ledger.afk_time = 99.5;
        ledger
    }

    #[tokio::test]
    async fn test_load_missing_documents() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        let now = Utc::now();

        let snapshot = store.load(Settings::default(), now).await;

        assert_eq!(snapshot.ledger, Ledger::new(now));
        assert_eq!(snapshot.settings, Settings::default());
        assert_eq!(store.load_groups().await, GroupConfig::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_load_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        let ledger = test_ledger();
        let settings = Settings {
            afk_timeout: 120,
            top_per_group: 3,
            ..Default::default()
        };

        store.save(&ledger, &settings).await?;
        let snapshot = store.load(Settings::default(), Utc::now()).await;

        assert_eq!(snapshot.settings, settings);
        assert_eq!(snapshot.ledger.reset_date, ledger.reset_date);
        assert_eq!(snapshot.ledger.original_titles, ledger.original_titles);
        assert!((snapshot.ledger.afk_time - ledger.afk_time).abs() < 1e-9);
        assert_eq!(
            snapshot.ledger.window_times.keys().collect::<Vec<_>>(),
            ledger.window_times.keys().collect::<Vec<_>>()
        );
        for (title, seconds) in &ledger.window_times {
            assert!((snapshot.ledger.window_times[title] - seconds).abs() < 1e-9);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_documents_are_separate() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        store.save(&test_ledger(), &Settings::default()).await?;

        let data: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.data_path())?)?;
        let settings: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.settings_path())?)?;

        assert!(data.get("window_times").is_some());
        assert!(data.get("AFK_time").is_some());
        assert!(data.get("reset_date").is_some());
        assert!(data.get("window_original_titles").is_some());
        assert!(data.get("AFK_TIMEOUT").is_none());
        assert_eq!(settings["TITLE_TRUNCATE"], 50);
        assert!(settings.get("window_times").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_documents_fall_back_to_defaults() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        std::fs::write(store.data_path(), "{\"window_times\": {\"a\": 1")?;
        std::fs::write(store.settings_path(), "[]")?;
        std::fs::write(store.groups_path(), "not json")?;
        let now = Utc::now();

        let snapshot = store.load(Settings::default(), now).await;

        assert_eq!(snapshot.ledger, Ledger::new(now));
        assert_eq!(snapshot.settings, Settings::default());
        assert_eq!(store.load_groups().await, GroupConfig::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_hand_edited_settings() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        store.save(&test_ledger(), &Settings::default()).await?;
        std::fs::write(
            store.settings_path(),
            r#"{"TOP_PER_GROUP": 2, "RESET_DATE": "2020-01-01T00:00:00+00:00"}"#,
        )?;

        let snapshot = store.load(Settings::default(), Utc::now()).await;

        assert_eq!(snapshot.settings.top_per_group, 2);
        assert_eq!(snapshot.settings.afk_timeout, Settings::default().afk_timeout);
        assert_eq!(
            snapshot.ledger.reset_date,
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_stored_settings_are_ignored() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        std::fs::write(
            store.settings_path(),
            r#"{"TOP_PER_GROUP": 2, "SAVE_TIME": 0, "RESET_DATE": "2020-01-01T00:00:00+00:00"}"#,
        )?;
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let snapshot = store.load(Settings::default(), now).await;

        assert_eq!(snapshot.settings, Settings::default());
        assert_eq!(snapshot.ledger.reset_date, now);
        Ok(())
    }

    #[tokio::test]
    async fn test_groups_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::new(dir.path().to_path_buf())?;
        let config = GroupConfig {
            groups: GroupRuleSet::new(vec![
                GroupRule::new("Zeta", [" - Z"]),
                GroupRule::new("Alpha", [" - A"]),
            ]),
            afk_exempt: vec!["Zeta".into()],
            versioned_apps: vec![],
        };

        store.save_groups(&config).await?;
        let loaded = store.load_groups().await;

        assert_eq!(loaded, config);
        assert_eq!(
            loaded.groups.group_names().collect::<Vec<_>>(),
            vec!["Zeta", "Alpha"]
        );
        Ok(())
    }
}
