//! Builds the grouped, ranked and truncated summary shown to the user.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::ledger::Ledger;

use super::{classify::GroupRuleSet, settings::Settings};

const SECONDS_PER_DAY: f64 = 24. * 60. * 60.;

/// Groups whose members are hidden in the view. Purely presentational.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapsedGroupSet(BTreeSet<String>);

impl CollapsedGroupSet {
    pub fn new(groups: impl IntoIterator<Item = String>) -> Self {
        Self(groups.into_iter().collect())
    }

    /// Flips the collapsed state of a group. Returns whether it's collapsed now.
    pub fn toggle(&mut self, group: &str) -> bool {
        if self.0.remove(group) {
            false
        } else {
            self.0.insert(group.to_string());
            true
        }
    }

    pub fn contains(&self, group: &str) -> bool {
        self.0.contains(group)
    }
}

/// What the user is looking at right now.
#[derive(Debug, Clone, Copy, Default)]
pub struct Focus<'a> {
    pub title: Option<&'a str>,
    pub afk: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    #[default]
    None,
    /// Contains the focused window.
    Current,
    /// Contains the focused window but the user is idle.
    CurrentAfk,
}

impl Highlight {
    fn of(is_current: bool, focus: &Focus<'_>) -> Self {
        match (is_current, focus.afk) {
            (false, _) => Highlight::None,
            (true, false) => Highlight::Current,
            (true, true) => Highlight::CurrentAfk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Totals {
    pub total_active: f64,
    pub total_afk: f64,
    /// Number of tracked titles, including insignificant ones.
    pub entry_count: usize,
    pub reset_date: DateTime<Utc>,
    pub elapsed_days: f64,
    pub avg_hours_per_day: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryView {
    pub canonical_title: String,
    pub label: String,
    pub duration: f64,
    pub highlight: Highlight,
}

/// Several entries shown as a single line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateLine {
    pub total: f64,
    pub count: usize,
    pub highlight: Highlight,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GroupBody {
    Collapsed,
    Expanded {
        top: Vec<EntryView>,
        others: Option<AggregateLine>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub name: String,
    pub total: f64,
    pub member_count: usize,
    pub highlight: Highlight,
    pub body: GroupBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub totals: Totals,
    pub groups: Vec<GroupView>,
    /// Entries below the minimum display time, across all groups.
    pub insignificant: AggregateLine,
}

/// Derives the view from the accounting tables. Doesn't modify anything and gives the same result
/// for the same input.
pub fn build_view(
    ledger: &Ledger,
    rules: &GroupRuleSet,
    settings: &Settings,
    collapsed: &CollapsedGroupSet,
    focus: Focus<'_>,
    now: DateTime<Utc>,
) -> ViewModel {
    let total_active = ledger.total_active();
    let elapsed_days = ((now - ledger.reset_date).num_milliseconds() as f64 / 1000.
        / SECONDS_PER_DAY)
        .max(1.);

    let min_display_time = settings.min_display_time as f64;
    let mut insignificant_total = 0.;
    let mut insignificant_count = 0;
    let mut grouped = BTreeMap::<&str, Vec<EntryView>>::new();

    for (title, duration) in &ledger.window_times {
        if *duration < min_display_time {
            insignificant_total += duration;
            insignificant_count += 1;
            continue;
        }
        let classification = rules.classify(title, settings.title_truncate);
        grouped
            .entry(classification.group)
            .or_default()
            .push(EntryView {
                canonical_title: title.clone(),
                label: classification.label,
                duration: *duration,
                highlight: Highlight::of(focus.title == Some(title.as_str()), &focus),
            });
    }

    let current_group = focus.title.map(|v| rules.group_of(v));

    let groups = grouped
        .into_iter()
        .map(|(name, mut members)| {
            let total = members.iter().map(|v| v.duration).sum();
            let member_count = members.len();
            let highlight = Highlight::of(current_group == Some(name), &focus);

            let body = if collapsed.contains(name) {
                GroupBody::Collapsed
            } else {
                // Stable, so equal durations keep their insertion order.
                members.sort_by(|a, b| b.duration.total_cmp(&a.duration));
                let rest = members.split_off(settings.top_per_group.min(member_count));
                let others = (!rest.is_empty()).then(|| AggregateLine {
                    total: rest.iter().map(|v| v.duration).sum(),
                    count: rest.len(),
                    highlight: Highlight::of(
                        rest.iter().any(|v| v.highlight != Highlight::None),
                        &focus,
                    ),
                });
                GroupBody::Expanded {
                    top: members,
                    others,
                }
            };

            GroupView {
                name: name.to_string(),
                total,
                member_count,
                highlight,
                body,
            }
        })
        .collect();

    let focused_duration = focus
        .title
        .and_then(|v| ledger.duration_of(v))
        .unwrap_or(0.);

    ViewModel {
        totals: Totals {
            total_active,
            total_afk: ledger.afk_time,
            entry_count: ledger.window_times.len(),
            reset_date: ledger.reset_date,
            elapsed_days,
            avg_hours_per_day: total_active / 3600. / elapsed_days,
        },
        groups,
        insignificant: AggregateLine {
            total: insignificant_total,
            count: insignificant_count,
            highlight: Highlight::of(
                focused_duration > 0. && focused_duration < min_display_time,
                &focus,
            ),
        },
    }
}
