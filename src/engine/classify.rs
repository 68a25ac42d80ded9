use serde::{Deserialize, Serialize};

/// Group for titles that are empty.
pub const UNKNOWN_GROUP: &str = "Unknown";
/// Group for titles that match no rule.
pub const UNCATEGORIZED_GROUP: &str = "Uncategorized";

const ELLIPSIS: &str = "...";

/// A named group together with the title suffixes that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRule {
    pub name: String,
    #[serde(default)]
    pub suffixes: Vec<String>,
}

impl GroupRule {
    pub fn new(
        name: impl Into<String>,
        suffixes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered classification rules. The first group (in order) owning a suffix that the title ends
/// with wins, so the order here is the precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupRuleSet(Vec<GroupRule>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<'a> {
    pub group: &'a str,
    pub label: String,
}

impl GroupRuleSet {
    pub fn new(rules: Vec<GroupRule>) -> Self {
        Self(rules)
    }

    pub fn rules(&self) -> &[GroupRule] {
        &self.0
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|v| v.name.as_str())
    }

    fn find_match(&self, canonical_title: &str) -> Option<(&GroupRule, &str)> {
        self.0.iter().find_map(|rule| {
            rule.suffixes
                .iter()
                .find(|suffix| canonical_title.ends_with(suffix.as_str()))
                .map(|suffix| (rule, suffix.as_str()))
        })
    }

    /// Whether `group` can show up in a view, including the fallback groups.
    pub fn is_known_group(&self, group: &str) -> bool {
        group == UNKNOWN_GROUP
            || group == UNCATEGORIZED_GROUP
            || self.group_names().any(|v| v == group)
    }

    /// Returns only the group of a title. Cheaper than [GroupRuleSet::classify] because no label is
    /// built.
    pub fn group_of(&self, canonical_title: &str) -> &str {
        if canonical_title.is_empty() {
            return UNKNOWN_GROUP;
        }
        self.find_match(canonical_title)
            .map_or(UNCATEGORIZED_GROUP, |(rule, _)| rule.name.as_str())
    }

    /// Returns group and display label of a title. The label drops the matched suffix and is
    /// truncated to `truncate_limit` characters.
    pub fn classify(&self, canonical_title: &str, truncate_limit: usize) -> Classification<'_> {
        if canonical_title.is_empty() {
            return Classification {
                group: UNKNOWN_GROUP,
                label: UNKNOWN_GROUP.to_string(),
            };
        }

        match self.find_match(canonical_title) {
            Some((rule, suffix)) => {
                let stripped = canonical_title
                    .strip_suffix(suffix)
                    .unwrap_or(canonical_title)
                    .trim();
                let label = if stripped.is_empty() {
                    canonical_title
                } else {
                    stripped
                };
                Classification {
                    group: &rule.name,
                    label: truncate(label, truncate_limit),
                }
            }
            None => Classification {
                group: UNCATEGORIZED_GROUP,
                label: truncate(canonical_title, truncate_limit),
            },
        }
    }
}

impl Default for GroupRuleSet {
    fn default() -> Self {
        Self(vec![
            GroupRule::new(
                "Office",
                [
                    " - Word",
                    " - PowerPoint",
                    " - Excel",
                    "- Adobe Acrobat Reader (64-bit)",
                    " — LibreOffice Writer",
                    " - Google Docs — Mozilla Firefox",
                    " - Notepad",
                    " - Obsidian",
                ],
            ),
            GroupRule::new(
                "Work",
                [
                    " - Visual Studio Code",
                    ".pdf",
                    " - Arizona State University Mail — Mozilla Firefox",
                ],
            ),
            GroupRule::new(
                "Unimportant",
                [
                    " - YouTube — Mozilla Firefox",
                    "YouTube — Mozilla Firefox",
                    "Bluesky — Mozilla Firefox",
                ],
            ),
            GroupRule::new("Social", [" - Discord", " - Slack"]),
        ])
    }
}

/// Shortens `value` to at most `limit` characters, marking the cut with an ellipsis.
pub fn truncate(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    // Limits too small to fit the marker get a bare cut.
    if limit < ELLIPSIS.len() {
        return value.chars().take(limit).collect();
    }
    let kept = value
        .chars()
        .take(limit - ELLIPSIS.len())
        .collect::<String>();
    format!("{}{ELLIPSIS}", kept.trim_end())
}
