//! Category name validation
//!
//! A name may contain ASCII letters, digits, plain spaces and Cyrillic letters.
//! Slashes are path separators and never part of a name.

use crate::error::{CatTreeError, Result};

/// Default upper bound on name length, in characters.
pub const MAX_NAME_LENGTH: usize = 128;

/// Name rules applied to every segment before it reaches the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRules {
    pub max_length: usize,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            max_length: MAX_NAME_LENGTH,
        }
    }
}

impl NameRules {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn is_valid(&self, name: &str) -> bool {
        let trimmed = name.trim();
        !trimmed.is_empty()
            && trimmed.chars().count() <= self.max_length
            && trimmed.chars().all(is_name_char)
    }

    /// Validate and return the normalized (trimmed, lower-cased) form
    pub fn validate(&self, name: &str) -> Result<String> {
        if !self.is_valid(name) {
            return Err(CatTreeError::InvalidName {
                name: name.to_string(),
                max_length: self.max_length,
            });
        }
        Ok(normalize(name))
    }
}

/// Check a name against the default rules
pub fn is_valid(name: &str) -> bool {
    NameRules::default().is_valid(name)
}

/// Names are stored and compared in this form
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || is_cyrillic_letter(c)
}

fn is_cyrillic_letter(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_letters_digits_spaces() {
        assert!(is_valid("Books"));
        assert!(is_valid("child 1"));
        assert!(is_valid("  padded  "));
        assert!(is_valid("Книги"));
        assert!(is_valid("ёлка 2024"));
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(!is_valid(""));
        assert!(!is_valid("   "));
        assert!(!is_valid("bad/name"));
        assert!(!is_valid("semi;colon"));
        assert!(!is_valid("dash-ed"));
        assert!(!is_valid("ünïcode"));
        assert!(!is_valid("two\nlines"));
        assert!(!is_valid("tab\there"));
        assert!(!is_valid("line\u{2028}break"));
        assert!(!is_valid("no\u{00A0}break"));
    }

    #[test]
    fn enforces_length_limit() {
        let rules = NameRules::new(4);
        assert!(rules.is_valid("abcd"));
        assert!(!rules.is_valid("abcde"));
        // trimmed before counting
        assert!(rules.is_valid("  abcd  "));

        let long = "a".repeat(MAX_NAME_LENGTH + 1);
        assert!(!is_valid(&long));
    }

    #[test]
    fn validate_normalizes() {
        let rules = NameRules::default();
        assert_eq!(rules.validate("  Child One ").unwrap(), "child one");
        assert_eq!(rules.validate("КНИГИ").unwrap(), "книги");

        let err = rules.validate("x/y").unwrap_err();
        assert!(matches!(err, CatTreeError::InvalidName { ref name, .. } if name == "x/y"));
    }
}
