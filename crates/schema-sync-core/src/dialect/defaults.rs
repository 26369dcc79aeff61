//! Default value equivalence.
//!
//! Engines report default values in their own textual form, so a literal
//! comparison would flag columns that are in fact identical. Each dialect
//! carries a [`DefaultEquivalence`] describing which spellings it tolerates.

use std::borrow::Cow;

/// Rules that decide whether two raw default values mean the same thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultEquivalence {
    pairs: Vec<(String, String)>,
    numeric_tolerance: bool,
}

impl Default for DefaultEquivalence {
    fn default() -> Self {
        Self::standard()
    }
}

impl DefaultEquivalence {
    /// Tolerates `0`/`0.0`, `1`/`1.000`, quoted versus unquoted literals and
    /// an empty string literal versus no default.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            pairs: vec![
                ("0".to_string(), "0.0".to_string()),
                ("1".to_string(), "1.000".to_string()),
            ],
            numeric_tolerance: false,
        }
    }

    /// Adds a pair of spellings that should compare equal.
    #[must_use]
    pub fn with_pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.pairs.push((a.into(), b.into()));
        self
    }

    /// Treats numerically equal literals (`0` and `0.00`) as equal.
    #[must_use]
    pub const fn with_numeric_tolerance(mut self, enabled: bool) -> Self {
        self.numeric_tolerance = enabled;
        self
    }

    /// Compares two raw default values. The comparison is symmetric.
    #[must_use]
    pub fn are_equal(&self, a: Option<&str>, b: Option<&str>) -> bool {
        match (a, b) {
            (None, None) => true,
            (None, Some(v)) | (Some(v), None) => is_empty_literal(v),
            (Some(a), Some(b)) => self.literals_equal(a, b),
        }
    }

    fn literals_equal(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        if self
            .pairs
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
        {
            return true;
        }
        if literal_value(a) == literal_value(b) {
            return true;
        }
        if self.numeric_tolerance {
            if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
                return (x - y).abs() < f64::EPSILON;
            }
        }
        false
    }
}

fn is_empty_literal(value: &str) -> bool {
    value.is_empty() || value == "''"
}

/// Strips one pair of surrounding single quotes.
#[must_use]
pub fn unquote(value: &str) -> Option<&str> {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
}

/// The text a default denotes: quoted literals lose their quotes and
/// doubled quotes inside them collapse.
fn literal_value(value: &str) -> Cow<'_, str> {
    match unquote(value) {
        Some(inner) if inner.contains("''") => Cow::Owned(inner.replace("''", "'")),
        Some(inner) => Cow::Borrowed(inner),
        None => Cow::Borrowed(value),
    }
}

/// Wraps `value` in single quotes unless it already is quoted.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    if value.len() >= 2 && unquote(value).is_some() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_pairs() {
        let eq = DefaultEquivalence::standard();
        assert!(eq.are_equal(Some("0"), Some("0.0")));
        assert!(eq.are_equal(Some("0.0"), Some("0")));
        assert!(eq.are_equal(Some("1.000"), Some("1")));
        assert!(!eq.are_equal(Some("0"), Some("0.00")));
        assert!(!eq.are_equal(Some("1"), Some("2")));
    }

    #[test]
    fn test_quoted_literals() {
        let eq = DefaultEquivalence::standard();
        assert!(eq.are_equal(Some("'open'"), Some("open")));
        assert!(eq.are_equal(Some("open"), Some("'open'")));
        assert!(!eq.are_equal(Some("'open'"), Some("closed")));
    }

    #[test]
    fn test_escaped_quotes_in_literals() {
        let eq = DefaultEquivalence::standard();
        assert!(eq.are_equal(Some("it's"), Some("'it''s'")));
        assert!(eq.are_equal(Some("'it''s'"), Some("it's")));
        assert!(eq.are_equal(Some("'it''s'"), Some("'it''s'")));
        assert!(!eq.are_equal(Some("it''s"), Some("'it''s'")));
    }

    #[test]
    fn test_empty_literal_vs_absent() {
        let eq = DefaultEquivalence::standard();
        assert!(eq.are_equal(None, None));
        assert!(eq.are_equal(None, Some("''")));
        assert!(eq.are_equal(Some("''"), None));
        assert!(!eq.are_equal(None, Some("0")));
    }

    #[test]
    fn test_numeric_tolerance() {
        let eq = DefaultEquivalence::standard().with_numeric_tolerance(true);
        assert!(eq.are_equal(Some("0"), Some("0.00")));
        assert!(eq.are_equal(Some("12.5"), Some("12.50")));
        assert!(!eq.are_equal(Some("12.5"), Some("12.6")));
    }

    #[test]
    fn test_custom_pair() {
        let eq = DefaultEquivalence::standard().with_pair("b'0'", "0");
        assert!(eq.are_equal(Some("0"), Some("b'0'")));
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("open"), "'open'");
        assert_eq!(quote_literal("'open'"), "'open'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(""), "''");
    }
}
