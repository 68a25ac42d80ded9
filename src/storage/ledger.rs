use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Accumulated accounting state since the last reset. This is everything that ends up in the data
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    /// Canonical title to active seconds. Insertion ordered, which keeps aggregation and saved
    /// documents stable.
    pub window_times: IndexMap<String, f64>,
    /// Canonical title to the shortest raw title seen for it.
    pub original_titles: IndexMap<String, String>,
    pub afk_time: f64,
    pub reset_date: DateTime<Utc>,
}

impl Ledger {
    pub fn new(reset_date: DateTime<Utc>) -> Self {
        Self {
            window_times: IndexMap::new(),
            original_titles: IndexMap::new(),
            afk_time: 0.,
            reset_date,
        }
    }

    pub fn total_active(&self) -> f64 {
        self.window_times.values().sum()
    }

    pub fn duration_of(&self, canonical_title: &str) -> Option<f64> {
        self.window_times.get(canonical_title).copied()
    }

    /// Adds time to an entry, creating it when needed.
    pub fn add_active(&mut self, canonical_title: &str, seconds: f64) {
        match self.window_times.get_mut(canonical_title) {
            Some(v) => *v += seconds,
            None => {
                self.window_times.insert(canonical_title.to_string(), seconds);
            }
        }
    }

    /// Makes sure an entry exists so a freshly focused window is visible before it accrues time.
    pub fn touch(&mut self, canonical_title: &str) {
        if !self.window_times.contains_key(canonical_title) {
            self.window_times.insert(canonical_title.to_string(), 0.);
        }
    }

    /// Stores `raw_title` as the representative of `canonical_title` if there is none yet or the
    /// new one is strictly shorter.
    pub fn offer_original_title(&mut self, canonical_title: &str, raw_title: &str) {
        match self.original_titles.get_mut(canonical_title) {
            Some(stored) => {
                if !raw_title.is_empty() && raw_title.chars().count() < stored.chars().count() {
                    *stored = raw_title.to_string();
                }
            }
            None => {
                let representative = if raw_title.is_empty() {
                    canonical_title
                } else {
                    raw_title
                };
                self.original_titles
                    .insert(canonical_title.to_string(), representative.to_string());
            }
        }
    }

    /// Counts entries a purge with `threshold` would remove. Doesn't modify anything.
    pub fn count_below(&self, threshold: f64) -> usize {
        self.window_times.values().filter(|v| **v < threshold).count()
    }

    /// Removes every entry tracked for strictly less than `threshold` seconds. Returns the number
    /// of removed entries.
    pub fn purge(&mut self, threshold: f64) -> usize {
        let before = self.window_times.len();
        let original_titles = &mut self.original_titles;
        self.window_times.retain(|title, seconds| {
            let keep = *seconds >= threshold;
            if !keep {
                original_titles.shift_remove(title);
            }
            keep
        });
        before - self.window_times.len()
    }

    /// Drops all history and starts a new accounting epoch at `now`.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.window_times.clear();
        self.original_titles.clear();
        self.afk_time = 0.;
        self.reset_date = now;
    }
}
