//! Content checksums for MARC records.
//!
//! [`calc_checksum`] hashes a canonical form of a record so that two copies
//! of the same record from different sources can be compared cheaply. The
//! canonical form ignores the leader, excluded tags (by default the
//! control number) and the relative order of repeated fields with the same
//! tag.
//!
//! # Examples
//!
//! ```
//! use marcrec::checksum::{calc_checksum, ChecksumOptions};
//! use marcrec::{Field, Record, Tag};
//!
//! let isbn = |value: &str| Field::data(Tag::new("020").unwrap(), ' ', ' ', [('a', value)]);
//!
//! let mut a = Record::default();
//! a.append_field(Field::control(Tag::CONTROL_NUMBER, "A-1"));
//! a.append_field(isbn("9780000000001"));
//! a.append_field(isbn("9780000000002"));
//!
//! let mut b = Record::default();
//! b.append_field(Field::control(Tag::CONTROL_NUMBER, "B-7"));
//! b.append_field(isbn("9780000000002"));
//! b.append_field(isbn("9780000000001"));
//!
//! let options = ChecksumOptions::default();
//! assert_eq!(calc_checksum(&a, &options), calc_checksum(&b, &options));
//! assert_eq!(calc_checksum(&a, &options).len(), 64);
//! ```

use crate::field::Field;
use crate::reader::FIELD_TERMINATOR;
use crate::record::Record;
use crate::tag::Tag;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Order in which groups of same-tag fields enter the checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FieldOrder {
    /// Groups appear where their tag first occurs in the record.
    #[default]
    Stored,
    /// Groups are sorted by tag, so any field reordering is ignored.
    ByTag,
}

/// Options for [`calc_checksum`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumOptions {
    /// Tags left out of the checksum.
    pub excluded_tags: BTreeSet<Tag>,
    /// Also leave out `LOK` fields and tags that contain a `9` or are not
    /// purely numeric.
    pub suppress_local_fields: bool,
    /// Group order.
    pub field_order: FieldOrder,
}

impl Default for ChecksumOptions {
    fn default() -> Self {
        ChecksumOptions {
            excluded_tags: BTreeSet::from([Tag::CONTROL_NUMBER]),
            suppress_local_fields: false,
            field_order: FieldOrder::Stored,
        }
    }
}

impl ChecksumOptions {
    /// Replace the set of excluded tags.
    #[must_use]
    pub fn with_excluded_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.excluded_tags = tags.into_iter().collect();
        self
    }

    /// Set whether local fields are left out.
    #[must_use]
    pub fn with_suppress_local_fields(mut self, suppress: bool) -> Self {
        self.suppress_local_fields = suppress;
        self
    }

    /// Set the group order.
    #[must_use]
    pub fn with_field_order(mut self, order: FieldOrder) -> Self {
        self.field_order = order;
        self
    }

    fn keeps(&self, field: &Field) -> bool {
        let tag = field.tag();
        if self.excluded_tags.contains(&tag) {
            return false;
        }
        !(self.suppress_local_fields
            && (field.is_local() || tag.contains_nine() || !tag.is_numeric()))
    }
}

/// SHA-256 of the record's canonical form, as 64 lowercase hex digits.
///
/// Each kept field contributes its tag, its content and a field terminator.
/// Fields sharing a tag are sorted by content within their group.
#[must_use]
pub fn calc_checksum(record: &Record, options: &ChecksumOptions) -> String {
    let mut groups: Vec<(Tag, Vec<&[u8]>)> = Vec::new();
    for field in record.fields().iter().filter(|f| options.keeps(f)) {
        match groups.iter_mut().find(|(tag, _)| *tag == field.tag()) {
            Some((_, contents)) => contents.push(field.as_bytes()),
            None => groups.push((field.tag(), vec![field.as_bytes()])),
        }
    }
    if options.field_order == FieldOrder::ByTag {
        groups.sort_by_key(|(tag, _)| *tag);
    }

    let mut hasher = Sha256::new();
    for (tag, mut contents) in groups {
        contents.sort_unstable();
        for content in contents {
            hasher.update(tag.as_bytes());
            hasher.update(content);
            hasher.update([FIELD_TERMINATOR]);
        }
    }
    format!("{:x}", hasher.finalize())
}
