use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Title used for windows without any usable name.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Applications that put their own version right after their name, e.g. `Obsidian v1.11.4`.
pub const DEFAULT_VERSIONED_APPS: &[&str] = &["Obsidian"];

static DEFAULT_CANONICALIZER: LazyLock<Canonicalizer> = LazyLock::new(|| {
    Canonicalizer::new(DEFAULT_VERSIONED_APPS.iter().copied())
        .expect("Default canonicalizer patterns are valid")
});

/// Normalizes a title with the default set of versioned applications.
pub fn normalize(raw_title: &str) -> String {
    DEFAULT_CANONICALIZER.normalize(raw_title)
}

/// Turns raw window titles into stable accounting keys. Removes unsaved markers that editors
/// prepend and version numbers that would otherwise create a new entry on every release.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    leading_markers: Regex,
    app_version: Option<Regex>,
    trailing_version: Regex,
}

impl Canonicalizer {
    pub fn new<'a>(
        versioned_apps: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, regex::Error> {
        let names = versioned_apps
            .into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>();

        let app_version = if names.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&format!(r"\b({})\s*v?\d+(?:\.\d+)*", names.join("|")))
                    .case_insensitive(true)
                    .build()?,
            )
        };

        Ok(Self {
            leading_markers: Regex::new(r"^[\u{25CF}\u{2022}\u{25E6}*\s]+")?,
            app_version,
            trailing_version: Regex::new(r"\s+v?\d+(?:\.\d+)+\S*$")?,
        })
    }

    /// Returns the canonical form of `raw_title`. The result is never empty and normalizing it
    /// again yields the same string.
    pub fn normalize(&self, raw_title: &str) -> String {
        let mut title = raw_title.trim().to_string();
        // Each pass can only shorten the title, so this always terminates.
        loop {
            let next = self.normalize_pass(&title);
            if next == title {
                break;
            }
            title = next;
        }

        if title.is_empty() {
            UNKNOWN_TITLE.to_string()
        } else {
            title
        }
    }

    fn normalize_pass(&self, title: &str) -> String {
        let title = self.leading_markers.replace(title, "");
        let title = match &self.app_version {
            Some(app_version) => app_version.replace_all(&title, "$1").into_owned(),
            None => title.into_owned(),
        };
        let title = self.trailing_version.replace(&title, "");
        title.trim().to_string()
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        DEFAULT_CANONICALIZER.clone()
    }
}
