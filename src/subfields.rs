//! Subfields of a data field.
//!
//! A data field's content is two indicator characters followed by zero or
//! more subfields, each introduced by the delimiter `0x1F` and a one
//! character code:
//!
//! ```text
//! 10␟aExample title␟cby somebody
//! ```
//!
//! [`Subfields`] is a parsed *copy* of that content. Edits never reach the
//! field until the caller hands the list back with
//! [`Field::set_subfields`](crate::Field::set_subfields):
//!
//! ```
//! use marcrec::{Field, Tag};
//!
//! let mut field = Field::data(Tag::new("245")?, '1', '0', [('a', "Title"), ('c', "Someone")]);
//! let mut subfields = field.subfields();
//! subfields.replace_first('a', "Better title");
//! field.set_subfields(&subfields)?;
//! assert_eq!(field.first_subfield_value('a'), Some("Better title"));
//! # Ok::<(), marcrec::MarcError>(())
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Byte that introduces every subfield.
pub const SUBFIELD_DELIMITER: char = '\x1F';

/// A subfield within a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

impl Subfield {
    /// Create a subfield.
    pub fn new(code: char, value: impl Into<String>) -> Self {
        Subfield {
            code,
            value: value.into(),
        }
    }
}

/// Ordered list of subfields.
///
/// Stored in a `SmallVec` to avoid allocation for typical fields with 4 or
/// fewer subfields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfields {
    subfields: SmallVec<[Subfield; 4]>,
}

impl Subfields {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Subfields::default()
    }

    /// Parse the content of a data field, skipping its two indicators.
    ///
    /// Parsing is lenient: text before the first delimiter and empty
    /// delimiter runs are dropped. Use
    /// [`Record::validate`](crate::Record::validate) to detect them.
    #[must_use]
    pub fn from_contents(contents: &str) -> Self {
        RawSubfields::from_contents(contents)
            .map(|(code, value)| Subfield::new(code, value))
            .collect()
    }

    /// Number of subfields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subfields.len()
    }

    /// True if there are no subfields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subfields.is_empty()
    }

    /// Iterate over the subfields in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Subfield> {
        self.subfields.iter()
    }

    /// True if a subfield with `code` exists.
    #[must_use]
    pub fn has_subfield(&self, code: char) -> bool {
        self.subfields.iter().any(|sf| sf.code == code)
    }

    /// True if a subfield with `code` has exactly `value`.
    #[must_use]
    pub fn has_subfield_with_value(&self, code: char, value: &str) -> bool {
        self.subfields
            .iter()
            .any(|sf| sf.code == code && sf.value == value)
    }

    /// First value for a subfield code.
    #[must_use]
    pub fn first_value(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// All values for a subfield code, in order.
    #[must_use]
    pub fn values(&self, code: char) -> Vec<&str> {
        self.values_for_codes(&[code])
    }

    /// All values whose code is one of `codes`, in field order.
    #[must_use]
    pub fn values_for_codes(&self, codes: &[char]) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| codes.contains(&sf.code))
            .map(|sf| sf.value.as_str())
            .collect()
    }

    /// Insert a subfield in front of the first subfield with a greater code.
    ///
    /// On a list sorted by code this keeps it sorted; equal codes keep
    /// their insertion order.
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        let position = self
            .subfields
            .iter()
            .position(|sf| sf.code > code)
            .unwrap_or(self.subfields.len());
        self.subfields.insert(position, Subfield::new(code, value));
    }

    /// Append a subfield at the end.
    pub fn append_subfield(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield::new(code, value));
    }

    /// Replace the value of the first subfield with `code`.
    ///
    /// Returns `false` if there is no such subfield.
    pub fn replace_first(&mut self, code: char, value: impl Into<String>) -> bool {
        match self.subfields.iter_mut().find(|sf| sf.code == code) {
            Some(subfield) => {
                subfield.value = value.into();
                true
            },
            None => false,
        }
    }

    /// Replace the value of every subfield with `code`; returns the count.
    pub fn replace_all(&mut self, code: char, value: &str) -> usize {
        let mut replaced = 0;
        for subfield in self.subfields.iter_mut().filter(|sf| sf.code == code) {
            subfield.value = value.to_string();
            replaced += 1;
        }
        replaced
    }

    /// Delete the first subfield with `code`.
    pub fn delete_first(&mut self, code: char) -> bool {
        self.delete_first_where(|sf| sf.code == code)
    }

    /// Delete the first subfield with `code` whose value matches `pattern`.
    pub fn delete_first_matching(&mut self, code: char, pattern: &Regex) -> bool {
        self.delete_first_where(|sf| sf.code == code && pattern.is_match(&sf.value))
    }

    /// Delete every subfield with `code`; returns the count.
    pub fn delete_all(&mut self, code: char) -> usize {
        self.delete_all_where(|sf| sf.code == code)
    }

    /// Delete every subfield with `code` whose value matches `pattern`.
    pub fn delete_all_matching(&mut self, code: char, pattern: &Regex) -> usize {
        self.delete_all_where(|sf| sf.code == code && pattern.is_match(&sf.value))
    }

    /// Change the code of every subfield with `from` to `to`; returns the count.
    pub fn rename_code(&mut self, from: char, to: char) -> usize {
        let mut renamed = 0;
        for subfield in self.subfields.iter_mut().filter(|sf| sf.code == from) {
            subfield.code = to;
            renamed += 1;
        }
        renamed
    }

    /// Serialize to the delimited form that follows the indicators.
    #[must_use]
    pub fn to_contents(&self) -> String {
        let capacity = self.subfields.iter().map(|sf| sf.value.len() + 2).sum();
        let mut contents = String::with_capacity(capacity);
        for subfield in &self.subfields {
            contents.push(SUBFIELD_DELIMITER);
            contents.push(subfield.code);
            contents.push_str(&subfield.value);
        }
        contents
    }

    fn delete_first_where<F>(&mut self, predicate: F) -> bool
    where
        F: Fn(&Subfield) -> bool,
    {
        match self.subfields.iter().position(predicate) {
            Some(index) => {
                self.subfields.remove(index);
                true
            },
            None => false,
        }
    }

    fn delete_all_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Subfield) -> bool,
    {
        let before = self.subfields.len();
        self.subfields.retain(|sf| !predicate(sf));
        before - self.subfields.len()
    }
}

impl fmt::Display for Subfields {
    /// Human readable form, e.g. `$aTitle$cSomeone`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for subfield in &self.subfields {
            write!(f, "${}{}", subfield.code, subfield.value)?;
        }
        Ok(())
    }
}

impl FromIterator<Subfield> for Subfields {
    fn from_iter<I: IntoIterator<Item = Subfield>>(iter: I) -> Self {
        Subfields {
            subfields: iter.into_iter().collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<(char, S)> for Subfields {
    fn from_iter<I: IntoIterator<Item = (char, S)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(code, value)| Subfield::new(code, value))
            .collect()
    }
}

impl IntoIterator for Subfields {
    type Item = Subfield;
    type IntoIter = smallvec::IntoIter<[Subfield; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.subfields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Subfields {
    type Item = &'a Subfield;
    type IntoIter = std::slice::Iter<'a, Subfield>;

    fn into_iter(self) -> Self::IntoIter {
        self.subfields.iter()
    }
}

/// Borrowing iterator over `(code, value)` pairs of raw field content.
///
/// Used for lookups that should not allocate a [`Subfields`] copy.
#[derive(Debug, Clone)]
pub(crate) struct RawSubfields<'a> {
    rest: &'a str,
}

impl<'a> RawSubfields<'a> {
    /// Iterate the subfields of `contents`, skipping its two indicators.
    pub(crate) fn from_contents(contents: &'a str) -> Self {
        let area = contents
            .char_indices()
            .nth(2)
            .map_or("", |(index, _)| &contents[index..]);
        let rest = match memchr::memchr(SUBFIELD_DELIMITER as u8, area.as_bytes()) {
            Some(first) => &area[first..],
            None => "",
        };
        RawSubfields { rest }
    }
}

impl<'a> Iterator for RawSubfields<'a> {
    type Item = (char, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // `rest` is empty or starts with a delimiter.
            let body = self.rest.get(1..)?;
            let end =
                memchr::memchr(SUBFIELD_DELIMITER as u8, body.as_bytes()).unwrap_or(body.len());
            let (piece, rest) = body.split_at(end);
            self.rest = rest;
            let mut chars = piece.chars();
            if let Some(code) = chars.next() {
                return Some((code, chars.as_str()));
            }
        }
    }
}
