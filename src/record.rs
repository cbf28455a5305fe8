//! MARC records: a leader plus an ordered list of fields.
//!
//! Fields live in one flat `Vec` in the order they are serialized. Most
//! queries address them through half-open index ranges, so callers can
//! iterate, erase or sort a range without copying.
//!
//! # Examples
//!
//! ```
//! use marcrec::{BibliographicLevel, Field, Record, Tag, TypeOfRecord};
//!
//! let mut record = Record::synthesize(
//!     TypeOfRecord::LanguageMaterial,
//!     BibliographicLevel::MonographOrItem,
//!     "123456789",
//! );
//! record.insert_field(Field::data(Tag::new("245")?, '1', '0', [('a', "Example Title")]))?;
//! record.insert_field(Field::data(Tag::new("020")?, ' ', ' ', [('a', "9783161484100")]))?;
//!
//! assert_eq!(record.control_number(), "123456789");
//! assert_eq!(record.first_subfield_value(Tag::new("245")?, 'a'), Some("Example Title"));
//! let tags: Vec<_> = record.fields().iter().map(|f| f.tag().to_string()).collect();
//! assert_eq!(tags, ["001", "020", "245"]);
//! # Ok::<(), marcrec::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::field::Field;
use crate::field_query::SubfieldPatternQuery;
use crate::leader::{BibliographicLevel, Leader, RecordType, TypeOfRecord, LEADER_LENGTH};
use crate::tag::Tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::{Index, Range};

/// Bytes of one directory entry in the binary format.
pub(crate) const DIRECTORY_ENTRY_LENGTH: usize = 12;

/// A MARC record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    leader: Leader,
    fields: Vec<Field>,
}

impl Record {
    /// Create an empty record with the given leader.
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            fields: Vec::new(),
        }
    }

    /// Create an empty record from a 24-character leader string.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidLeader`] if `leader` is not 24 ASCII characters.
    pub fn from_leader_str(leader: &str) -> Result<Self> {
        Ok(Record::new(leader.parse()?))
    }

    /// Create a record from a leader and a pre-built field list.
    ///
    /// The fields are taken as-is; no ordering or repeatability checks run.
    #[must_use]
    pub fn with_fields(leader: Leader, fields: Vec<Field>) -> Self {
        Record { leader, fields }
    }

    /// Create a brand-new record with a synthesized leader and, unless
    /// `control_number` is empty, a `001` field.
    #[must_use]
    pub fn synthesize(
        type_of_record: TypeOfRecord,
        level: BibliographicLevel,
        control_number: &str,
    ) -> Self {
        let mut record = Record::new(Leader::synthesize(type_of_record, level));
        if !control_number.is_empty() {
            record
                .fields
                .push(Field::control(Tag::CONTROL_NUMBER, control_number));
        }
        record
    }

    /// The record leader.
    #[must_use]
    pub fn leader(&self) -> &Leader {
        &self.leader
    }

    /// Mutable access to the leader.
    pub fn leader_mut(&mut self) -> &mut Leader {
        &mut self.leader
    }

    /// All fields in stored order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Mutable access to one field.
    ///
    /// Changing the tag through this reference may break the tag order;
    /// [`Record::sort_fields_by_tag`] restores it.
    pub fn field_mut(&mut self, index: usize) -> Option<&mut Field> {
        self.fields.get_mut(index)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the fields.
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Split the record into leader and fields.
    #[must_use]
    pub fn into_parts(self) -> (Leader, Vec<Field>) {
        (self.leader, self.fields)
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// Index of the first field with `tag`.
    #[must_use]
    pub fn find_first_field(&self, tag: Tag) -> Option<usize> {
        self.fields.iter().position(|field| field.tag() == tag)
    }

    /// Half-open range of the run of fields tagged `tag`.
    ///
    /// The run starts at the first field with the tag and extends over the
    /// fields directly following it with the same tag. If the tag is absent
    /// the range is empty and sits at the end of the record.
    #[must_use]
    pub fn get_tag_range(&self, tag: Tag) -> Range<usize> {
        match self.find_first_field(tag) {
            Some(start) => {
                let run = self.fields[start..]
                    .iter()
                    .take_while(|field| field.tag() == tag)
                    .count();
                start..start + run
            },
            None => self.fields.len()..self.fields.len(),
        }
    }

    /// The run of fields tagged `tag`, as a slice.
    #[must_use]
    pub fn fields_with_tag(&self, tag: Tag) -> &[Field] {
        &self.fields[self.get_tag_range(tag)]
    }

    /// First field with `tag`.
    #[must_use]
    pub fn get_first_field(&self, tag: Tag) -> Option<&Field> {
        self.fields.iter().find(|field| field.tag() == tag)
    }

    /// True if any field carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.find_first_field(tag).is_some()
    }

    /// First value of subfield `code` over all fields tagged `tag`.
    #[must_use]
    pub fn first_subfield_value(&self, tag: Tag, code: char) -> Option<&str> {
        self.fields
            .iter()
            .filter(|field| field.tag() == tag)
            .find_map(|field| field.first_subfield_value(code))
    }

    /// Values of subfields with any of `codes` over all fields tagged `tag`.
    #[must_use]
    pub fn subfield_values(&self, tag: Tag, codes: &[char]) -> Vec<String> {
        self.fields
            .iter()
            .filter(|field| field.tag() == tag && field.is_data_field())
            .flat_map(|field| {
                field
                    .subfields()
                    .into_iter()
                    .filter(|subfield| codes.contains(&subfield.code))
                    .map(|subfield| subfield.value)
            })
            .collect()
    }

    /// Content of the first field if it is tagged `001`, else `""`.
    #[must_use]
    pub fn control_number(&self) -> &str {
        match self.fields.first() {
            Some(field) if field.tag() == Tag::CONTROL_NUMBER => field.contents(),
            _ => "",
        }
    }

    /// The distinct tags present in the record.
    #[must_use]
    pub fn tags(&self) -> BTreeSet<Tag> {
        self.fields.iter().map(Field::tag).collect()
    }

    /// Size of the record in the binary format.
    ///
    /// Compare against [`crate::writer::MAX_RECORD_LENGTH`] before writing.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        LEADER_LENGTH
            + DIRECTORY_ENTRY_LENGTH * self.fields.len()
            + 1
            + self.fields.iter().map(Field::serialized_len).sum::<usize>()
            + 1
    }

    /// Broad record category from leader/06.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        self.leader.record_type()
    }

    /// True for monographic items (leader/07 `m`).
    #[must_use]
    pub fn is_monograph(&self) -> bool {
        self.leader.bibliographic_level() == Some(BibliographicLevel::MonographOrItem)
    }

    /// True for serials (leader/07 `s`).
    #[must_use]
    pub fn is_serial(&self) -> bool {
        self.leader.bibliographic_level() == Some(BibliographicLevel::Serial)
    }

    /// True for articles and other component parts (leader/07 `a` or `b`).
    #[must_use]
    pub fn is_article(&self) -> bool {
        matches!(
            self.leader.bibliographic_level(),
            Some(
                BibliographicLevel::MonographicComponentPart
                    | BibliographicLevel::SerialComponentPart
            )
        )
    }

    // ============================================================================
    // Insertion
    // ============================================================================

    /// Insert `field` after the existing run of fields with its tag, or at
    /// its tag-ordered position if there is none. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::NonRepeatableTag`] if the tag is non-repeatable
    /// and already present; the record is left unchanged.
    pub fn insert_field(&mut self, field: Field) -> Result<usize> {
        self.check_repeatable(field.tag())?;
        let index = self.back_insertion_point(field.tag());
        self.fields.insert(index, field);
        Ok(index)
    }

    /// Insert `field` before the existing run of fields with its tag, or at
    /// its tag-ordered position if there is none. Returns the new index.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::NonRepeatableTag`] if the tag is non-repeatable
    /// and already present; the record is left unchanged.
    pub fn insert_field_front(&mut self, field: Field) -> Result<usize> {
        self.check_repeatable(field.tag())?;
        let index = self
            .find_first_field(field.tag())
            .unwrap_or_else(|| self.ordered_position(field.tag()));
        self.fields.insert(index, field);
        Ok(index)
    }

    /// Append `field` at the very end, without any checks.
    pub fn append_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Replace the first field with the same tag, or insert `field` if the
    /// tag is absent. Returns the field's index.
    pub fn replace_field(&mut self, field: Field) -> usize {
        if let Some(index) = self.find_first_field(field.tag()) {
            self.fields[index] = field;
            return index;
        }
        let index = self.ordered_position(field.tag());
        self.fields.insert(index, field);
        index
    }

    /// Add subfield `code` to the first field tagged `tag`, keeping the
    /// subfields sorted by code. Returns `false` if there is no such data field.
    pub fn add_subfield(&mut self, tag: Tag, code: char, value: impl Into<String>) -> bool {
        let Some(field) = self
            .fields
            .iter_mut()
            .find(|field| field.tag() == tag && field.is_data_field())
        else {
            return false;
        };
        let mut subfields = field.subfields();
        subfields.add_subfield(code, value);
        field.set_subfields(&subfields).is_ok()
    }

    fn check_repeatable(&self, tag: Tag) -> Result<()> {
        if !tag.is_repeatable() && self.has_tag(tag) {
            return Err(MarcError::NonRepeatableTag(tag));
        }
        Ok(())
    }

    fn back_insertion_point(&self, tag: Tag) -> usize {
        let range = self.get_tag_range(tag);
        if range.is_empty() {
            self.ordered_position(tag)
        } else {
            range.end
        }
    }

    /// Index of the first field whose tag sorts after `tag`.
    fn ordered_position(&self, tag: Tag) -> usize {
        self.fields
            .iter()
            .position(|field| field.tag() > tag)
            .unwrap_or(self.fields.len())
    }

    // ============================================================================
    // Deletion
    // ============================================================================

    /// Remove and return the field at `index`.
    pub fn delete_field(&mut self, index: usize) -> Option<Field> {
        (index < self.fields.len()).then(|| self.fields.remove(index))
    }

    /// Delete every field tagged `tag`. Returns the number removed.
    pub fn delete_fields(&mut self, tag: Tag) -> usize {
        let before = self.fields.len();
        self.fields.retain(|field| field.tag() != tag);
        before - self.fields.len()
    }

    /// Delete every field matched by `query`. Returns the number removed.
    pub fn delete_fields_matching(&mut self, query: &SubfieldPatternQuery) -> usize {
        let before = self.fields.len();
        self.fields.retain(|field| !query.matches(field));
        before - self.fields.len()
    }

    /// Erase the fields in `range`, clamped to the record. Returns the
    /// number removed.
    pub fn erase_fields(&mut self, range: Range<usize>) -> usize {
        let range = self.clamp(range);
        let removed = range.len();
        self.fields.drain(range);
        removed
    }

    // ============================================================================
    // Rewriting
    // ============================================================================

    /// Change the tag of every field tagged `from` to `to`. Returns the
    /// number of fields changed. Field positions are not adjusted.
    pub fn retag(&mut self, from: Tag, to: Tag) -> usize {
        let mut changed = 0;
        for field in self.fields.iter_mut().filter(|field| field.tag() == from) {
            field.set_tag(to);
            changed += 1;
        }
        changed
    }

    /// Stable sort of the fields in `range` by tag, then content.
    pub fn sort_fields(&mut self, range: Range<usize>) {
        let range = self.clamp(range);
        self.fields[range].sort();
    }

    /// Stable sort of the fields in `range` by tag only.
    pub fn sort_fields_by_tag(&mut self, range: Range<usize>) {
        let range = self.clamp(range);
        self.fields[range].sort_by_key(Field::tag);
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let end = range.end.min(self.fields.len());
        range.start.min(end)..end
    }

    // ============================================================================
    // Merging
    // ============================================================================

    /// Copy the fields of `other` that this record lacks.
    ///
    /// A field is skipped if an identical field is already present or if its
    /// tag is non-repeatable and already present. Copied fields go behind
    /// the run of their tag. Returns the number of fields copied; merging
    /// the same record twice copies nothing the second time.
    pub fn merge(&mut self, other: &Record) -> usize {
        let mut copied = 0;
        for field in &other.fields {
            if self.fields.contains(field) || self.check_repeatable(field.tag()).is_err() {
                continue;
            }
            let index = self.back_insertion_point(field.tag());
            self.fields.insert(index, field.clone());
            copied += 1;
        }
        tracing::debug!(
            control_number = self.control_number(),
            copied,
            "merged record"
        );
        copied
    }
}

impl Index<usize> for Record {
    type Output = Field;

    fn index(&self, index: usize) -> &Field {
        &self.fields[index]
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    fn sample() -> Record {
        let mut record = Record::synthesize(
            TypeOfRecord::LanguageMaterial,
            BibliographicLevel::MonographOrItem,
            "123456789",
        );
        record
            .insert_field(Field::data(tag("100"), '1', ' ', [('a', "Author, A.")]))
            .unwrap();
        record
            .insert_field(Field::data(tag("245"), '1', '0', [('a', "Example Title")]))
            .unwrap();
        record
            .insert_field(Field::data(tag("650"), ' ', '0', [('a', "History")]))
            .unwrap();
        record
            .insert_field(Field::data(tag("650"), ' ', '0', [('a', "Fiction")]))
            .unwrap();
        record
    }

    fn tag_list(record: &Record) -> Vec<String> {
        record.iter().map(|f| f.tag().to_string()).collect()
    }

    #[test]
    fn test_from_leader_str() {
        let record = Record::from_leader_str("00128nas a2200049 c 4500").unwrap();
        assert!(record.is_empty());
        assert!(record.is_serial());
        assert!(Record::from_leader_str("00128nas a22000 4500").is_err());
    }

    #[test]
    fn test_control_number() {
        assert_eq!(sample().control_number(), "123456789");

        let mut record = Record::default();
        assert_eq!(record.control_number(), "");
        record.append_field(Field::data(tag("245"), '0', '0', [('a', "x")]));
        record.append_field(Field::control(tag("001"), "late"));
        assert_eq!(record.control_number(), "");
    }

    #[test]
    fn test_tag_range() {
        let record = sample();
        assert_eq!(record.get_tag_range(tag("650")), 3..5);
        assert_eq!(record.get_tag_range(tag("245")), 2..3);
        assert_eq!(record.get_tag_range(tag("700")), 5..5);
        assert_eq!(record.fields_with_tag(tag("650")).len(), 2);
        assert!(record.fields_with_tag(tag("700")).is_empty());
    }

    #[test]
    fn test_first_subfield_value_searches_all_occurrences() {
        let mut record = sample();
        record
            .insert_field(Field::data(tag("500"), ' ', ' ', [('b', "no a")]))
            .unwrap();
        record
            .insert_field(Field::data(tag("500"), ' ', ' ', [('a', "Note")]))
            .unwrap();
        assert_eq!(record.first_subfield_value(tag("500"), 'a'), Some("Note"));
        assert_eq!(record.first_subfield_value(tag("500"), 'z'), None);
    }

    #[test]
    fn test_insert_keeps_tag_order() {
        let record = sample();
        assert_eq!(tag_list(&record), ["001", "100", "245", "650", "650"]);
        assert_eq!(record[3].first_subfield_value('a'), Some("History"));
        assert_eq!(record[4].first_subfield_value('a'), Some("Fiction"));
    }

    #[test]
    fn test_insert_front_of_run() {
        let mut record = sample();
        let index = record
            .insert_field_front(Field::data(tag("650"), ' ', '0', [('a', "Biography")]))
            .unwrap();
        assert_eq!(index, 3);
        assert_eq!(record[3].first_subfield_value('a'), Some("Biography"));
    }

    #[test]
    fn test_duplicate_non_repeatable_rejected() {
        let mut record = sample();
        let before = record.len();
        let result = record.insert_field(Field::data(tag("100"), '1', ' ', [('a', "Other")]));
        assert!(matches!(result, Err(MarcError::NonRepeatableTag(t)) if t == tag("100")));
        assert!(record
            .insert_field_front(Field::data(tag("100"), '1', ' ', [('a', "Other")]))
            .is_err());
        assert_eq!(record.len(), before);
    }

    #[test]
    fn test_replace_field() {
        let mut record = sample();
        let index = record.replace_field(Field::data(tag("245"), '0', '0', [('a', "New")]));
        assert_eq!(index, 2);
        assert_eq!(record.first_subfield_value(tag("245"), 'a'), Some("New"));

        let index = record.replace_field(Field::data(tag("300"), ' ', ' ', [('a', "200 p.")]));
        assert_eq!(index, 3);
        assert_eq!(record.len(), 6);
    }

    #[test]
    fn test_delete_fields() {
        let mut record = sample();
        assert_eq!(record.delete_fields(tag("650")), 2);
        assert_eq!(record.delete_fields(tag("650")), 0);
        assert_eq!(tag_list(&record), ["001", "100", "245"]);
        assert!(record.delete_field(10).is_none());
        assert_eq!(record.delete_field(0).unwrap().contents(), "123456789");
    }

    #[test]
    fn test_delete_fields_matching() {
        let mut record = sample();
        let query =
            SubfieldPatternQuery::with_regex(tag("650"), 'a', Regex::new("^Fic").unwrap());
        assert_eq!(record.delete_fields_matching(&query), 1);
        assert_eq!(record.first_subfield_value(tag("650"), 'a'), Some("History"));
    }

    #[test]
    fn test_erase_range_clamps() {
        let mut record = sample();
        assert_eq!(record.erase_fields(3..100), 2);
        assert_eq!(record.len(), 3);
        assert_eq!(record.erase_fields(5..7), 0);
    }

    #[test]
    fn test_retag_and_sort() {
        let mut record = sample();
        assert_eq!(record.retag(tag("650"), tag("050")), 2);
        assert_eq!(tag_list(&record), ["001", "100", "245", "050", "050"]);
        let len = record.len();
        record.sort_fields_by_tag(0..len);
        assert_eq!(tag_list(&record), ["001", "050", "050", "100", "245"]);
        // stable: History stays ahead of Fiction
        assert_eq!(record[1].first_subfield_value('a'), Some("History"));

        record.sort_fields(0..len);
        assert_eq!(record[1].first_subfield_value('a'), Some("Fiction"));
    }

    #[test]
    fn test_add_subfield_and_values() {
        let mut record = sample();
        assert!(record.add_subfield(tag("245"), 'c', "by someone"));
        assert!(record.add_subfield(tag("245"), 'b', "subtitle"));
        assert!(!record.add_subfield(tag("001"), 'a', "x"));
        assert!(!record.add_subfield(tag("999"), 'a', "x"));
        assert_eq!(
            record.subfield_values(tag("245"), &['a', 'b', 'c']),
            ["Example Title", "subtitle", "by someone"]
        );
        assert_eq!(record.subfield_values(tag("650"), &['a']), ["History", "Fiction"]);
    }

    #[test]
    fn test_tags_and_serialized_len() {
        let record = sample();
        let tags: Vec<String> = record.tags().iter().map(ToString::to_string).collect();
        assert_eq!(tags, ["001", "100", "245", "650"]);

        let empty = Record::default();
        assert_eq!(empty.serialized_len(), 26);
        let one = Record::synthesize(
            TypeOfRecord::LanguageMaterial,
            BibliographicLevel::MonographOrItem,
            "12345",
        );
        assert_eq!(one.serialized_len(), 24 + 12 + 1 + 6 + 1);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut target = sample();
        let mut other = sample();
        other.replace_field(Field::data(tag("245"), '0', '0', [('a', "Other title")]));
        other
            .insert_field(Field::data(tag("650"), ' ', '0', [('a', "Poetry")]))
            .unwrap();
        other
            .insert_field(Field::data(tag("700"), '1', ' ', [('a', "Editor")]))
            .unwrap();

        assert_eq!(target.merge(&other), 2);
        assert_eq!(target.first_subfield_value(tag("245"), 'a'), Some("Example Title"));
        assert_eq!(target.fields_with_tag(tag("650")).len(), 3);
        assert_eq!(target.merge(&other), 0);
        assert_eq!(tag_list(&target), ["001", "100", "245", "650", "650", "650", "700"]);
    }

    #[test]
    fn test_classification() {
        let record = Record::synthesize(
            TypeOfRecord::LanguageMaterial,
            BibliographicLevel::SerialComponentPart,
            "",
        );
        assert!(record.is_empty());
        assert!(record.is_article());
        assert!(!record.is_monograph());
        assert_eq!(record.record_type(), RecordType::Bibliographic);
    }
}
