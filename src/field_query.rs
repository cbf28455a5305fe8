//! Pattern queries over subfield values.
//!
//! A [`SubfieldPatternQuery`] owns its compiled [`Regex`], so a pipeline
//! builds it once and reuses it for every record it processes.
//!
//! # Examples
//!
//! ```
//! use marcrec::field_query::SubfieldPatternQuery;
//! use marcrec::{Field, Tag};
//!
//! let query = SubfieldPatternQuery::new(Tag::new("020")?, 'a', "^978")?;
//! let isbn = Field::data(Tag::new("020")?, ' ', ' ', [('a', "9783161484100")]);
//! assert!(query.matches(&isbn));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::field::Field;
use crate::subfields::RawSubfields;
use crate::tag::Tag;
use regex::Regex;

/// Query for fields with a subfield value matching a regex pattern.
///
/// A field matches if its tag equals the query tag and any subfield with
/// the query code has a value the pattern matches.
#[derive(Debug, Clone)]
pub struct SubfieldPatternQuery {
    /// Tag to match
    pub tag: Tag,
    /// Subfield code to match
    pub subfield_code: char,
    pattern: Regex,
}

impl SubfieldPatternQuery {
    /// Create a new subfield pattern query.
    ///
    /// # Errors
    ///
    /// Returns a `regex::Error` if the pattern is not a valid regular expression.
    pub fn new(tag: Tag, subfield_code: char, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::with_regex(tag, subfield_code, Regex::new(pattern)?))
    }

    /// Create a query from an already compiled pattern.
    #[must_use]
    pub fn with_regex(tag: Tag, subfield_code: char, pattern: Regex) -> Self {
        SubfieldPatternQuery {
            tag,
            subfield_code,
            pattern,
        }
    }

    /// The compiled pattern.
    #[must_use]
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Check if a field matches this pattern query.
    #[must_use]
    pub fn matches(&self, field: &Field) -> bool {
        if field.tag() != self.tag || field.is_control_field() {
            return false;
        }

        RawSubfields::from_contents(field.contents())
            .any(|(code, value)| code == self.subfield_code && self.pattern.is_match(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    #[test]
    fn test_matches_tag_and_code() {
        let query = SubfieldPatternQuery::new(tag("650"), 'a', r"^[A-Z]").unwrap();
        let field = Field::data(tag("650"), ' ', '0', [('a', "History")]);
        assert!(query.matches(&field));

        let other_tag = Field::data(tag("651"), ' ', '0', [('a', "History")]);
        assert!(!query.matches(&other_tag));

        let other_code = Field::data(tag("650"), ' ', '0', [('x', "History")]);
        assert!(!query.matches(&other_code));
    }

    #[test]
    fn test_any_repeated_subfield_may_match() {
        let query = SubfieldPatternQuery::new(tag("650"), 'x', "Fiction").unwrap();
        let field = Field::data(tag("650"), ' ', '0', [('x', "History"), ('x', "Fiction")]);
        assert!(query.matches(&field));
    }

    #[test]
    fn test_control_fields_never_match() {
        let query = SubfieldPatternQuery::new(tag("008"), 'a', ".*").unwrap();
        assert!(!query.matches(&Field::control(tag("008"), "\x1Fa")));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(SubfieldPatternQuery::new(tag("650"), 'a', "[unclosed").is_err());
    }
}
