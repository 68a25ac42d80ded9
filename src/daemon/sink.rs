use tracing::{info, trace};

use crate::engine::{aggregate::ViewModel, settings::Settings};

/// Receives everything the tracker wants to show to a user.
#[cfg_attr(test, mockall::automock)]
pub trait ViewSink {
    /// Called with a freshly built view on every render.
    fn present(&mut self, view: &ViewModel, settings: &Settings);

    /// One-off messages, e.g. results of commands.
    fn notify(&mut self, message: &str);
}

/// Used when there's nobody watching, e.g. for a background tracker.
pub struct HeadlessSink;

impl ViewSink for HeadlessSink {
    fn present(&mut self, view: &ViewModel, _settings: &Settings) {
        trace!(
            "Active {:.1}s, AFK {:.1}s, {} entries",
            view.totals.total_active,
            view.totals.total_afk,
            view.totals.entry_count
        );
    }

    fn notify(&mut self, message: &str) {
        info!("{message}");
    }
}
