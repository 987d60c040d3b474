//! Whole-word matcher compiled once from a plain-text word list.
//!
//! One regex fragment per line; blank lines and `#` comments are skipped.
//! Anything that prevents loading (missing file, unreadable file, no valid
//! patterns) yields an inactive filter that matches nothing.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use tracing::{error, info, warn};

/// Immutable disjunction of whole-word patterns.
#[derive(Debug, Clone, Default)]
pub struct WordFilter {
    regex: Option<Regex>,
    pattern_count: usize,
}

impl WordFilter {
    /// A filter that matches nothing.
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Load and compile the word list at `path`.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "word list not found, moderation filter inactive");
                return Self::inactive();
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read word list, moderation filter inactive");
                return Self::inactive();
            }
        };

        let filter = Self::from_patterns(parse_lines(&contents));
        info!(
            path = %path.display(),
            patterns = filter.pattern_count,
            "word list loaded"
        );
        filter
    }

    /// Compile a filter from raw patterns; invalid patterns are skipped.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let valid: Vec<String> = patterns
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref().trim();
                if p.is_empty() {
                    return None;
                }
                match Regex::new(p) {
                    Ok(_) => Some(format!(r"\b(?:{p})\b")),
                    Err(e) => {
                        warn!(pattern = p, error = %e, "skipping invalid word-list pattern");
                        None
                    }
                }
            })
            .collect();

        if valid.is_empty() {
            return Self::inactive();
        }

        match RegexBuilder::new(&valid.join("|"))
            .case_insensitive(true)
            .build()
        {
            Ok(regex) => Self {
                regex: Some(regex),
                pattern_count: valid.len(),
            },
            Err(e) => {
                error!(error = %e, "failed to compile word list, moderation filter inactive");
                Self::inactive()
            }
        }
    }

    /// True when `text` contains any listed word.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }

    /// True when at least one pattern is compiled.
    pub fn is_active(&self) -> bool {
        self.regex.is_some()
    }

    /// Number of compiled patterns.
    pub fn pattern_count(&self) -> usize {
        self.pattern_count
    }
}

/// Extract patterns from word-list text.
pub fn parse_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}
