//! Storage is organized through [json_store::JsonStore].
//! The basic idea is:
//!  - There is an application directory holding a few small JSON documents.
//!  - Accounting data and tunables are separate documents, so settings can be edited by hand
//!    without touching the history.
//!  - Loading never fails. Missing or broken documents are replaced with defaults.

pub mod documents;
pub mod json_store;
pub mod ledger;

use std::future::Future;

use anyhow::Result;
use chrono::{DateTime, Utc};
use documents::GroupConfig;
use ledger::Ledger;

use crate::engine::settings::Settings;

/// Everything needed to resume tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub ledger: Ledger,
    pub settings: Settings,
}

/// Interface for abstracting persistence of the accounting state.
pub trait Store {
    /// Loads the stored state. Values that are missing or can't be read fall back to `defaults`
    /// and an empty ledger starting at `now`.
    fn load(&self, defaults: Settings, now: DateTime<Utc>) -> impl Future<Output = Snapshot>;

    /// Writes accounting data and settings as two separate documents.
    fn save(&self, ledger: &Ledger, settings: &Settings) -> impl Future<Output = Result<()>>;

    /// Loads classification rules, falling back to the built in ones.
    fn load_groups(&self) -> impl Future<Output = GroupConfig>;
}
