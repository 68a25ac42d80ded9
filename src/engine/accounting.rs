use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::storage::{documents::GroupConfig, ledger::Ledger};

use super::canonical::Canonicalizer;

#[derive(Debug, Clone)]
pub struct AfkEvaluator {
    threshold: Duration,
}

impl AfkEvaluator {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn is_afk(&self, idle_time: Duration) -> bool {
        self.threshold < idle_time
    }
}

/// What a single tick did with the elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time went to the AFK total.
    Afk,
    /// Time went to the previously focused window.
    Active { switched: bool },
}

/// Tracks which window is focused and routes the time between ticks either into the focused
/// window's entry or into the AFK total.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    current_title: Option<String>,
    last_switch: Instant,
    last_afk: bool,
    afk: AfkEvaluator,
}

impl ActivityTracker {
    pub fn new(start: Instant, afk_timeout: Duration) -> Self {
        Self {
            current_title: None,
            last_switch: start,
            last_afk: false,
            afk: AfkEvaluator::new(afk_timeout),
        }
    }

    pub fn set_afk_timeout(&mut self, afk_timeout: Duration) {
        self.afk = AfkEvaluator::new(afk_timeout);
    }

    pub fn current_title(&self) -> Option<&str> {
        self.current_title.as_deref()
    }

    /// Whether the last tick found the user away.
    pub fn is_afk(&self) -> bool {
        self.last_afk
    }

    /// Accounts the time since the previous tick. `raw_title` and `idle` are the freshly probed
    /// window title and user idle time.
    pub fn tick(
        &mut self,
        ledger: &mut Ledger,
        canonicalizer: &Canonicalizer,
        config: &GroupConfig,
        raw_title: &str,
        idle: Duration,
        now: Instant,
    ) -> TickOutcome {
        let canonical = canonicalizer.normalize(raw_title);
        let group = config.groups.group_of(&canonical);
        let elapsed = now.saturating_duration_since(self.last_switch).as_secs_f64();

        self.last_afk = self.afk.is_afk(idle);
        if self.last_afk && !config.is_afk_exempt(group) {
            trace!("Idle for {idle:?}, adding {elapsed}s to AFK");
            ledger.afk_time += elapsed;
            self.last_switch = now;
            return TickOutcome::Afk;
        }

        if let Some(current) = &self.current_title {
            ledger.add_active(current, elapsed);
        }

        let switched = self.current_title.as_deref() != Some(canonical.as_str());
        if switched {
            debug!("Focus moved to {canonical:?} ({group})");
            ledger.offer_original_title(&canonical, raw_title);
            ledger.touch(&canonical);
            self.current_title = Some(canonical);
        }

        self.last_switch = now;
        TickOutcome::Active { switched }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tokio::time::Instant;

    use crate::{
        engine::canonical::Canonicalizer,
        storage::{documents::GroupConfig, ledger::Ledger},
    };

    use super::{ActivityTracker, TickOutcome};

    struct Fixture {
        tracker: ActivityTracker,
        ledger: Ledger,
        canonicalizer: Canonicalizer,
        config: GroupConfig,
        now: Instant,
    }

    impl Fixture {
        fn new() -> Self {
            let now = Instant::now();
            Self {
                tracker: ActivityTracker::new(now, Duration::from_secs(60)),
                ledger: Ledger::new(Utc::now()),
                canonicalizer: Canonicalizer::default(),
                config: GroupConfig::default(),
                now,
            }
        }

        fn tick_after(&mut self, millis: u64, raw_title: &str, idle_secs: u64) -> TickOutcome {
            self.now += Duration::from_millis(millis);
            self.tracker.tick(
                &mut self.ledger,
                &self.canonicalizer,
                &self.config,
                raw_title,
                Duration::from_secs(idle_secs),
                self.now,
            )
        }
    }

    #[test]
    fn test_first_observation_creates_entry() {
        let mut fixture = Fixture::new();
        let outcome = fixture.tick_after(500, "report.docx - Word", 0);

        assert_eq!(outcome, TickOutcome::Active { switched: true });
        assert_eq!(fixture.ledger.duration_of("report.docx - Word"), Some(0.));
        assert_eq!(fixture.tracker.current_title(), Some("report.docx - Word"));
    }

    #[test]
    fn test_time_goes_to_previous_window() {
        let mut fixture = Fixture::new();
        fixture.tick_after(500, "a", 0);
        fixture.tick_after(500, "a", 0);
        fixture.tick_after(1000, "b", 0);
        fixture.tick_after(500, "b", 0);

        assert_eq!(fixture.ledger.duration_of("a"), Some(1.5));
        assert_eq!(fixture.ledger.duration_of("b"), Some(0.5));
    }

    #[test]
    fn test_versions_share_an_entry() {
        let mut fixture = Fixture::new();
        fixture.tick_after(500, "Obsidian v1.11.4", 0);
        fixture.tick_after(500, "Obsidian v1.12.0", 0);
        fixture.tick_after(500, "Obsidian v1.12.0", 0);

        assert_eq!(fixture.ledger.window_times.len(), 1);
        assert_eq!(fixture.ledger.duration_of("Obsidian"), Some(1.));
        assert_eq!(fixture.ledger.original_titles["Obsidian"], "Obsidian v1.11.4");
    }

    #[test]
    fn test_afk_time_is_not_attributed_to_window() {
        let mut fixture = Fixture::new();
        fixture.tick_after(500, "a", 0);
        assert_eq!(fixture.tick_after(500, "a", 61), TickOutcome::Afk);
        fixture.tick_after(2000, "a", 120);
        // Back from AFK: the gap since the last AFK tick counts as active again.
        fixture.tick_after(500, "a", 0);

        assert_eq!(fixture.ledger.afk_time, 2.5);
        assert_eq!(fixture.ledger.duration_of("a"), Some(0.5));
        assert!(!fixture.tracker.is_afk());
    }

    #[test]
    fn test_idle_equal_to_timeout_is_not_afk() {
        let mut fixture = Fixture::new();
        fixture.tick_after(500, "a", 60);
        assert!(matches!(fixture.tick_after(500, "a", 60), TickOutcome::Active { .. }));
        assert_eq!(fixture.ledger.afk_time, 0.);
    }

    #[test]
    fn test_exempt_group_ignores_idle() {
        let mut fixture = Fixture::new();
        let video = "Some talk - YouTube — Mozilla Firefox";
        fixture.tick_after(500, video, 0);
        for _ in 0..10 {
            let outcome = fixture.tick_after(500, video, 10_000);
            assert_eq!(outcome, TickOutcome::Active { switched: false });
        }

        assert_eq!(fixture.ledger.afk_time, 0.);
        assert_eq!(fixture.ledger.duration_of(video), Some(5.));
        assert!(fixture.tracker.is_afk());
    }

    #[test]
    fn test_time_is_conserved() {
        let mut fixture = Fixture::new();
        let start = fixture.now;
        let titles = ["a - Word", "b", "Video - YouTube — Mozilla Firefox", "c"];
        for step in 0..200u64 {
            let title = titles[(step / 7) as usize % titles.len()];
            let idle = if (step / 13) % 3 == 0 { 500 } else { 0 };
            fixture.tick_after(250 + step % 5 * 100, title, idle);
        }

        let wall_clock = (fixture.now - start).as_secs_f64();
        let accounted = fixture.ledger.total_active() + fixture.ledger.afk_time;
        // Only the first active tick loses its interval, as no window was focused before it. The
        // AFK ticks preceding it don't set one.
        assert!((wall_clock - accounted).abs() <= 0.65 + 1e-6);
    }

    #[test]
    fn test_purged_current_entry_is_recreated() {
        let mut fixture = Fixture::new();
        fixture.tick_after(500, "a", 0);
        fixture.ledger.purge(10.);
        fixture.tick_after(500, "a", 0);

        assert_eq!(fixture.ledger.duration_of("a"), Some(0.5));
    }

    #[test]
    fn test_shorter_raw_title_replaces_representative() {
        let mut fixture = Fixture::new();
        fixture.tick_after(500, "● notes - Notepad", 0);
        fixture.tick_after(500, "b", 0);
        fixture.tick_after(500, "notes - Notepad", 0);

        assert_eq!(
            fixture.ledger.original_titles["notes - Notepad"],
            "notes - Notepad"
        );
    }
}
