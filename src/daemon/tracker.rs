use std::time::Duration;

use anyhow::Result;
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    engine::{aggregate::CollapsedGroupSet, ClearOutcome, Engine, FixedAnswer, PurgeOutcome},
    storage::Store,
    utils::clock::Clock,
    window_api::WindowManager,
};

use super::{
    commands::{UiCommand, UiInput},
    sink::ViewSink,
};

pub const TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const RENDER_INTERVAL: Duration = Duration::from_millis(500);

enum Event {
    Shutdown,
    Input(UiInput),
    InputClosed,
    Tick,
    Render,
    Flush,
}

/// Moves a deadline one period forward. A deadline that was missed entirely is rescheduled from
/// `now` instead of firing several times in a row.
fn next_deadline(deadline: Instant, period: Duration, now: Instant) -> Instant {
    let next = deadline + period;
    if next <= now {
        now + period
    } else {
        next
    }
}

async fn next_input(inputs: &mut Option<mpsc::Receiver<UiInput>>) -> Option<UiInput> {
    match inputs {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// The cooperative loop driving the engine. It is the only owner of the [Engine], so every
/// mutation of the accounting state happens here.
pub struct TrackerModule<S: Store> {
    engine: Engine,
    store: S,
    probe: Box<dyn WindowManager>,
    sink: Box<dyn ViewSink>,
    inputs: Option<mpsc::Receiver<UiInput>>,
    collapsed: CollapsedGroupSet,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl<S: Store> TrackerModule<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Engine,
        store: S,
        probe: Box<dyn WindowManager>,
        sink: Box<dyn ViewSink>,
        inputs: Option<mpsc::Receiver<UiInput>>,
        collapsed: CollapsedGroupSet,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            store,
            probe,
            sink,
            inputs,
            collapsed,
            shutdown,
            clock,
        }
    }

    fn probe(&mut self) -> (String, Duration) {
        let title = self.probe.get_active_window_title().unwrap_or_else(|e| {
            warn!("Failed to get active window {e:?}");
            String::new()
        });
        let idle = self.probe.get_idle_time().unwrap_or_else(|e| {
            warn!("Failed to get idle time {e:?}");
            Duration::ZERO
        });
        (title, idle)
    }

    fn tick(&mut self) {
        let (title, idle) = self.probe();
        let now = self.clock.instant();
        self.engine.tick(&title, idle, now);
    }

    fn render(&mut self) {
        let view = self.engine.view(&self.collapsed, self.clock.time());
        self.sink.present(&view, self.engine.settings());
    }

    /// Saves the current state. Failures are logged and tracking goes on with the in-memory
    /// state.
    async fn flush(&mut self) -> bool {
        match self
            .store
            .save(self.engine.ledger(), self.engine.settings())
            .await
        {
            Ok(()) => {
                debug!("Flushed {} entries", self.engine.ledger().window_times.len());
                true
            }
            Err(e) => {
                error!("Failed to save tracked data {e:?}");
                false
            }
        }
    }

    async fn handle(&mut self, command: UiCommand) {
        info!("Handling {command:?}");
        match command {
            UiCommand::ToggleGroup(group) => {
                if !self.engine.config().groups.is_known_group(&group) {
                    self.sink.notify(&format!("{group:?} isn't a known group"));
                } else if self.collapsed.toggle(&group) {
                    self.sink.notify(&format!("Collapsed {group}"));
                } else {
                    self.sink.notify(&format!("Expanded {group}"));
                }
            }
            UiCommand::Purge { commit } => {
                let threshold = self.engine.settings().purge_threshold as f64;
                match self.engine.purge(threshold, &mut FixedAnswer(commit)) {
                    PurgeOutcome::NothingToPurge => self
                        .sink
                        .notify(&format!("No entries below {threshold}s, nothing to purge")),
                    PurgeOutcome::Declined { candidates } => self.sink.notify(&format!(
                        "{candidates} entries below {threshold}s would be purged. \
                         Send `purge confirm` to remove them"
                    )),
                    PurgeOutcome::Purged { removed } => {
                        self.flush().await;
                        self.sink
                            .notify(&format!("Purged {removed} entries below {threshold}s"));
                    }
                }
            }
            UiCommand::Clear { confirmed } => {
                let now = self.clock.time();
                match self.engine.clear(&mut FixedAnswer(confirmed), now) {
                    ClearOutcome::Declined => self
                        .sink
                        .notify("This drops all tracked data. Send `clear confirm` to proceed"),
                    ClearOutcome::Cleared => {
                        self.flush().await;
                        self.sink.notify("Cleared all tracked data");
                    }
                }
            }
            UiCommand::UpdateSettings(update) => match self.engine.update_settings(&update) {
                Ok(_) => {
                    self.flush().await;
                    self.sink.notify("Settings updated");
                }
                Err(e) => self.sink.notify(&e.to_string()),
            },
            UiCommand::Flush => {
                if self.flush().await {
                    self.sink.notify("Saved");
                } else {
                    self.sink.notify("Saving failed, see the log for details");
                }
            }
        }
    }

    /// Executes the tracker event loop until shutdown is requested. The state is flushed one last
    /// time before returning.
    pub async fn run(mut self) -> Result<()> {
        let start = self.clock.instant();
        let mut next_tick = start;
        let mut next_render = start;
        let mut next_flush = start + self.engine.settings().save_interval();

        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Event::Shutdown,
                input = next_input(&mut self.inputs) => {
                    input.map_or(Event::InputClosed, Event::Input)
                }
                _ = self.clock.sleep_until(next_tick) => Event::Tick,
                _ = self.clock.sleep_until(next_render) => Event::Render,
                _ = self.clock.sleep_until(next_flush) => Event::Flush,
            };

            match event {
                Event::Shutdown => break,
                Event::Input(Ok(command)) => {
                    self.handle(command).await;
                    let now = self.clock.instant();
                    next_flush = next_flush.min(now + self.engine.settings().save_interval());
                    next_render = now;
                }
                Event::Input(Err(e)) => {
                    self.sink.notify(&e.to_string());
                    next_render = self.clock.instant();
                }
                Event::InputClosed => {
                    debug!("Command input closed");
                    self.inputs = None;
                }
                Event::Tick => {
                    self.tick();
                    next_tick = next_deadline(next_tick, TICK_INTERVAL, self.clock.instant());
                }
                Event::Render => {
                    self.render();
                    next_render = next_deadline(next_render, RENDER_INTERVAL, self.clock.instant());
                }
                Event::Flush => {
                    self.flush().await;
                    // Measured after saving so a slow save delays the next one instead of
                    // overlapping it.
                    next_flush = self.clock.instant() + self.engine.settings().save_interval();
                }
            }
        }

        info!("Stopping tracker");
        self.tick();
        self.flush().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::next_deadline;

    #[test]
    fn test_next_deadline() {
        let start = Instant::now();
        let period = Duration::from_millis(500);

        assert_eq!(next_deadline(start, period, start), start + period);
        assert_eq!(
            next_deadline(start, period, start + Duration::from_millis(499)),
            start + period
        );
        assert_eq!(
            next_deadline(start, period, start + Duration::from_secs(3)),
            start + Duration::from_secs(3) + period
        );
    }
}
