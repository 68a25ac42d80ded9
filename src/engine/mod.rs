//! The activity accounting engine. [Engine] owns all accounting state and is the only thing that
//! mutates it; everything else talks to it through its methods.

pub mod accounting;
pub mod aggregate;
pub mod canonical;
pub mod classify;
pub mod settings;

use std::time::Duration;

use accounting::{ActivityTracker, TickOutcome};
use aggregate::{build_view, CollapsedGroupSet, Focus, ViewModel};
use anyhow::Result;
use canonical::Canonicalizer;
use chrono::{DateTime, Utc};
use settings::{Settings, SettingsError, SettingsUpdate};
use tokio::time::Instant;
use tracing::info;

use crate::storage::{documents::GroupConfig, ledger::Ledger, Snapshot};

/// A yes/no gate for irreversible operations.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// An answer that was given ahead of time, e.g. with a `--yes` flag.
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, _question: &str) -> bool {
        self.0
    }
}

/// Result of a purge dry-run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurgePreview {
    pub threshold: f64,
    pub candidates: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeOutcome {
    NothingToPurge,
    Declined { candidates: usize },
    Purged { removed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Declined,
    Cleared,
}

pub struct Engine {
    ledger: Ledger,
    settings: Settings,
    config: GroupConfig,
    canonicalizer: Canonicalizer,
    tracker: ActivityTracker,
}

impl Engine {
    pub fn new(snapshot: Snapshot, config: GroupConfig, start: Instant) -> Result<Self> {
        let canonicalizer = Canonicalizer::new(config.versioned_apps.iter().map(String::as_str))?;
        Ok(Self {
            tracker: ActivityTracker::new(start, snapshot.settings.afk_timeout()),
            ledger: snapshot.ledger,
            settings: snapshot.settings,
            config,
            canonicalizer,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    pub fn focus(&self) -> Focus<'_> {
        Focus {
            title: self.tracker.current_title(),
            afk: self.tracker.is_afk(),
        }
    }

    /// Accounts the time since the previous tick using a freshly probed title and idle time.
    pub fn tick(&mut self, raw_title: &str, idle: Duration, now: Instant) -> TickOutcome {
        self.tracker.tick(
            &mut self.ledger,
            &self.canonicalizer,
            &self.config,
            raw_title,
            idle,
            now,
        )
    }

    pub fn view(&self, collapsed: &CollapsedGroupSet, now: DateTime<Utc>) -> ViewModel {
        build_view(
            &self.ledger,
            &self.config.groups,
            &self.settings,
            collapsed,
            self.focus(),
            now,
        )
    }

    pub fn purge_preview(&self, threshold: f64) -> PurgePreview {
        PurgePreview {
            threshold,
            candidates: self.ledger.count_below(threshold),
        }
    }

    /// Removes entries tracked for less than `threshold` seconds once `gate` agrees.
    pub fn purge(&mut self, threshold: f64, gate: &mut dyn Confirm) -> PurgeOutcome {
        let PurgePreview { candidates, .. } = self.purge_preview(threshold);
        if candidates == 0 {
            return PurgeOutcome::NothingToPurge;
        }
        let question =
            format!("Purge {candidates} entries below {threshold}s? This cannot be undone.");
        if !gate.confirm(&question) {
            return PurgeOutcome::Declined { candidates };
        }
        let removed = self.ledger.purge(threshold);
        info!("Purged {removed} entries below {threshold}s");
        PurgeOutcome::Purged { removed }
    }

    /// Drops all tracked history and starts a new epoch at `now` once `gate` agrees.
    pub fn clear(&mut self, gate: &mut dyn Confirm, now: DateTime<Utc>) -> ClearOutcome {
        let question = "Clear all tracked data? This resets the tracked history and reset date.";
        if !gate.confirm(question) {
            return ClearOutcome::Declined;
        }
        self.ledger.clear(now);
        info!("Cleared tracked data, new epoch starts at {now}");
        ClearOutcome::Cleared
    }

    /// Applies a partial settings change. Nothing changes if any value is invalid.
    pub fn update_settings(&mut self, update: &SettingsUpdate) -> Result<&Settings, SettingsError> {
        let settings = self.settings.apply(update)?;
        self.tracker.set_afk_timeout(settings.afk_timeout());
        self.settings = settings;
        info!("Updated settings {:?}", self.settings);
        Ok(&self.settings)
    }
}
