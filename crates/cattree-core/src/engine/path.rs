//! Slash-separated category paths

use crate::error::{CatTreeError, Result};
use crate::validation::NameRules;

pub const PATH_SEPARATOR: char = '/';

/// A parsed path: trimmed, non-empty segments in top-down order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPath {
    raw: String,
    segments: Vec<String>,
}

impl CategoryPath {
    /// Split on `/`, trim every segment and drop the empty ones
    pub fn parse(raw: &str) -> Result<Self> {
        let segments: Vec<String> = raw
            .split(PATH_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            return Err(CatTreeError::EmptyPath);
        }

        Ok(Self {
            raw: raw.trim().to_string(),
            segments,
        })
    }

    /// The input as given, trimmed
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Segments as typed by the user
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A path written with a separator, as opposed to a bare name
    pub fn is_qualified(&self) -> bool {
        self.raw.contains(PATH_SEPARATOR)
    }

    /// Validate every segment and return them normalized.
    ///
    /// Nothing is returned unless all segments pass.
    pub fn normalized(&self, rules: &NameRules) -> Result<Vec<String>> {
        self.segments.iter().map(|s| rules.validate(s)).collect()
    }
}

/// Join names into a display path (`a/b/c`)
pub fn join<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join("/")
}
