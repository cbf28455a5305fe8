//! Validation of MARC record structure.
//!
//! Validation is a separate pass over a [`Record`]: readers never run it,
//! so "check a file" and "process a file" stay independent. The pass
//! collects every problem it finds instead of stopping at the first one.
//!
//! # Examples
//!
//! ```
//! use marcrec::record_validation::{FindingKind, RecordStructureValidator, ValidationOptions};
//! use marcrec::{Field, Record, Tag};
//!
//! let mut record = Record::default();
//! record.append_field(Field::new(Tag::new("245")?, "10\u{1f}aTitle\u{1f}"));
//! record.append_field(Field::new(Tag::new("100")?, "1 \u{1f}aAuthor"));
//!
//! let findings = RecordStructureValidator::new(ValidationOptions::default()).validate(&record);
//! let kinds: Vec<_> = findings.iter().map(|f| f.kind).collect();
//! assert_eq!(kinds, [FindingKind::TagOrder, FindingKind::DanglingDelimiter]);
//! # Ok::<(), marcrec::MarcError>(())
//! ```

use crate::field::Field;
use crate::leader::{BibliographicLevel, Leader, RecordType};
use crate::record::Record;
use crate::subfields::SUBFIELD_DELIMITER;
use crate::tag::Tag;
use std::collections::HashSet;
use std::fmt;

/// Knobs for [`RecordStructureValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Accept a delimiter directly followed by another delimiter (a
    /// subfield without code).
    pub allow_empty_subfield_codes: bool,
    /// Accept subfields whose value is empty.
    pub allow_empty_subfield_values: bool,
    /// Check record status, type of record and bibliographic level codes.
    pub check_leader: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            allow_empty_subfield_codes: false,
            allow_empty_subfield_values: true,
            check_leader: true,
        }
    }
}

impl ValidationOptions {
    /// Set whether subfields without a code are tolerated.
    #[must_use]
    pub fn with_empty_subfield_codes(mut self, allow: bool) -> Self {
        self.allow_empty_subfield_codes = allow;
        self
    }

    /// Set whether subfields with an empty value are tolerated.
    #[must_use]
    pub fn with_empty_subfield_values(mut self, allow: bool) -> Self {
        self.allow_empty_subfield_values = allow;
        self
    }

    /// Set whether leader codes are checked.
    #[must_use]
    pub fn with_leader_check(mut self, check: bool) -> Self {
        self.check_leader = check;
        self
    }
}

/// Category of a [`ValidationFinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FindingKind {
    /// A leader position holds an unknown code.
    InvalidLeader,
    /// A field's tag sorts before the tag of the field preceding it.
    TagOrder,
    /// A `001` field exists but is not the first field.
    ControlNumberPosition,
    /// A non-repeatable tag occurs more than once.
    DuplicateNonRepeatable,
    /// A data field is too short to hold two indicators, or an indicator is
    /// the subfield delimiter.
    MissingIndicators,
    /// Text follows the indicators without a subfield delimiter.
    MissingDelimiter,
    /// The content ends with a bare subfield delimiter.
    DanglingDelimiter,
    /// A delimiter is directly followed by another delimiter.
    EmptySubfieldCode,
    /// A subfield has an empty value.
    EmptySubfieldValue,
    /// A `LOK` field has no readable local tag.
    MalformedLocalField,
    /// Local fields appear before any block start, or a block start is not
    /// followed by local tag `001`.
    MalformedLocalBlock,
}

/// One problem found by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFinding {
    /// Problem category.
    pub kind: FindingKind,
    /// Tag of the offending field; `None` for leader findings.
    pub tag: Option<Tag>,
    /// Control number of the record.
    pub control_number: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for ValidationFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag {
            Some(tag) => write!(f, "[{}] {}: {}", self.control_number, tag, self.message),
            None => write!(f, "[{}] leader: {}", self.control_number, self.message),
        }
    }
}

/// Validator for MARC record structure
#[derive(Debug, Clone, Default)]
pub struct RecordStructureValidator {
    options: ValidationOptions,
}

impl RecordStructureValidator {
    /// Create a validator with the given options.
    #[must_use]
    pub fn new(options: ValidationOptions) -> Self {
        RecordStructureValidator { options }
    }

    /// The validator's options.
    #[must_use]
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Walk the record and collect every finding, in field order.
    #[must_use]
    pub fn validate(&self, record: &Record) -> Vec<ValidationFinding> {
        let mut findings = Findings {
            control_number: record.control_number(),
            list: Vec::new(),
        };

        if self.options.check_leader {
            check_leader(record.leader(), &mut findings);
        }
        check_tag_order(record, &mut findings);
        for field in record.iter().filter(|field| field.is_data_field()) {
            self.check_data_field(field, &mut findings);
        }
        check_local_blocks(record, &mut findings);

        findings.list
    }

    /// True if [`RecordStructureValidator::validate`] finds nothing.
    #[must_use]
    pub fn is_valid(&self, record: &Record) -> bool {
        self.validate(record).is_empty()
    }

    fn check_data_field(&self, field: &Field, findings: &mut Findings<'_>) {
        let tag = field.tag();
        let contents = field.contents();
        let mut chars = contents.chars();
        let indicators_ok = matches!(
            (chars.next(), chars.next()),
            (Some(a), Some(b)) if a != SUBFIELD_DELIMITER && b != SUBFIELD_DELIMITER
        );
        if !indicators_ok {
            findings.push(
                FindingKind::MissingIndicators,
                Some(tag),
                format!("content {contents:?} does not start with two indicators"),
            );
            return;
        }

        let area = chars.as_str();
        if area.is_empty() {
            return;
        }
        if !area.starts_with(SUBFIELD_DELIMITER) {
            findings.push(
                FindingKind::MissingDelimiter,
                Some(tag),
                "text follows the indicators without a subfield delimiter".to_string(),
            );
        }
        if area.ends_with(SUBFIELD_DELIMITER) {
            findings.push(
                FindingKind::DanglingDelimiter,
                Some(tag),
                "content ends with a subfield delimiter".to_string(),
            );
        }

        // Pieces between delimiters; the one at the end is covered above.
        let pieces: Vec<&str> = area.split(SUBFIELD_DELIMITER).skip(1).collect();
        let last = pieces.len().saturating_sub(1);
        for (index, piece) in pieces.iter().enumerate() {
            let mut piece_chars = piece.chars();
            match piece_chars.next() {
                None if index != last => {
                    if !self.options.allow_empty_subfield_codes {
                        findings.push(
                            FindingKind::EmptySubfieldCode,
                            Some(tag),
                            format!("subfield {} has no code", index + 1),
                        );
                    }
                },
                Some(code) if piece_chars.as_str().is_empty() => {
                    if !self.options.allow_empty_subfield_values {
                        findings.push(
                            FindingKind::EmptySubfieldValue,
                            Some(tag),
                            format!("subfield ${code} is empty"),
                        );
                    }
                },
                _ => {},
            }
        }
    }
}

impl Record {
    /// Validate the record structure with the given options.
    ///
    /// Shorthand for [`RecordStructureValidator::validate`].
    #[must_use]
    pub fn validate(&self, options: &ValidationOptions) -> Vec<ValidationFinding> {
        RecordStructureValidator::new(*options).validate(self)
    }
}

struct Findings<'a> {
    control_number: &'a str,
    list: Vec<ValidationFinding>,
}

impl Findings<'_> {
    fn push(&mut self, kind: FindingKind, tag: Option<Tag>, message: String) {
        self.list.push(ValidationFinding {
            kind,
            tag,
            control_number: self.control_number.to_string(),
            message,
        });
    }
}

fn check_leader(leader: &Leader, findings: &mut Findings<'_>) {
    match leader.record_status() {
        'a' | 'c' | 'd' | 'n' | 'p' => {},
        c => findings.push(
            FindingKind::InvalidLeader,
            None,
            format!("invalid record status '{c}'"),
        ),
    }

    if leader.type_of_record().is_none() {
        findings.push(
            FindingKind::InvalidLeader,
            None,
            format!("invalid type of record '{}'", leader.type_of_record_code()),
        );
    }

    if leader.record_type() == RecordType::Bibliographic {
        match leader.bibliographic_level() {
            Some(BibliographicLevel::Undefined) | None => findings.push(
                FindingKind::InvalidLeader,
                None,
                format!(
                    "invalid bibliographic level '{}'",
                    leader.bibliographic_level_code()
                ),
            ),
            Some(_) => {},
        }
    }
}

fn check_tag_order(record: &Record, findings: &mut Findings<'_>) {
    if let Some(index) = record.find_first_field(Tag::CONTROL_NUMBER) {
        if index != 0 {
            findings.push(
                FindingKind::ControlNumberPosition,
                Some(Tag::CONTROL_NUMBER),
                format!("control number is field {} instead of the first", index + 1),
            );
        }
    }

    // Local tags inside LOK fields are payload; only outer tags are ordered.
    for pair in record.fields().windows(2) {
        if pair[1].tag() < pair[0].tag() {
            findings.push(
                FindingKind::TagOrder,
                Some(pair[1].tag()),
                format!("tag {} follows tag {}", pair[1].tag(), pair[0].tag()),
            );
        }
    }

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for tag in record.iter().map(Field::tag) {
        if !seen.insert(tag) && !tag.is_repeatable() && reported.insert(tag) {
            findings.push(
                FindingKind::DuplicateNonRepeatable,
                Some(tag),
                format!("non-repeatable tag {tag} occurs more than once"),
            );
        }
    }
}

fn check_local_blocks(record: &Record, findings: &mut Findings<'_>) {
    let mut in_block = false;
    let mut expect_block_control_number = false;
    for field in record.iter() {
        if !field.is_local() {
            in_block = false;
            continue;
        }
        let Some(local_tag) = field.local_tag() else {
            findings.push(
                FindingKind::MalformedLocalField,
                Some(Tag::LOCAL),
                format!("local field {:?} has no local tag", field.contents()),
            );
            continue;
        };

        if expect_block_control_number && local_tag != Tag::LOCAL_BLOCK_CONTROL_NUMBER {
            findings.push(
                FindingKind::MalformedLocalBlock,
                Some(Tag::LOCAL),
                format!("local block start is followed by local tag {local_tag} instead of 001"),
            );
        }
        expect_block_control_number = false;

        if local_tag == Tag::LOCAL_BLOCK_START {
            in_block = true;
            expect_block_control_number = true;
        } else if !in_block {
            findings.push(
                FindingKind::MalformedLocalBlock,
                Some(Tag::LOCAL),
                format!("local tag {local_tag} appears outside a local block"),
            );
            // one report per stray run
            in_block = true;
        }
    }
    if expect_block_control_number {
        findings.push(
            FindingKind::MalformedLocalBlock,
            Some(Tag::LOCAL),
            "last local block has no local tag 001".to_string(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leader::TypeOfRecord;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    fn valid_record() -> Record {
        let mut record = Record::synthesize(
            TypeOfRecord::LanguageMaterial,
            BibliographicLevel::MonographOrItem,
            "123",
        );
        record.append_field(Field::data(tag("245"), '1', '0', [('a', "Title")]));
        record.append_field(Field::local(tag("000"), ' ', ' ', [('a', "x")]));
        record.append_field(Field::local(tag("001"), ' ', ' ', [('a', "123")]));
        record.append_field(Field::local(tag("852"), '9', '9', [('a', "DE-21")]));
        record
    }

    fn kinds(record: &Record, options: ValidationOptions) -> Vec<FindingKind> {
        record.validate(&options).iter().map(|f| f.kind).collect()
    }

    #[test]
    fn test_valid_record_has_no_findings() {
        let validator = RecordStructureValidator::default();
        assert!(validator.is_valid(&valid_record()));
    }

    #[test]
    fn test_local_indicators_are_not_ordered() {
        let mut record = valid_record();
        record.append_field(Field::local(tag("100"), '0', '0', [('a', "earlier tag")]));
        assert!(record.validate(&ValidationOptions::default()).is_empty());
    }

    #[test]
    fn test_tag_order_and_control_number() {
        let mut record = Record::default();
        record.append_field(Field::data(tag("245"), '1', '0', [('a', "Title")]));
        record.append_field(Field::control(tag("001"), "123"));
        let findings = record.validate(&ValidationOptions::default());
        let kinds: Vec<_> = findings.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            [FindingKind::ControlNumberPosition, FindingKind::TagOrder]
        );
        assert_eq!(findings[1].tag, Some(tag("001")));
        assert!(findings[0].to_string().starts_with("[] 001:"));
    }

    #[test]
    fn test_duplicate_non_repeatable_reported_once() {
        let mut record = valid_record();
        for _ in 0..3 {
            record.append_field(Field::data(tag("LOK"), ' ', ' ', [('0', "001  ")]));
        }
        let mut record2 = Record::default();
        for name in ["A", "B", "C"] {
            record2.append_field(Field::data(tag("100"), '1', ' ', [('a', name)]));
        }
        assert_eq!(
            kinds(&record2, ValidationOptions::default()),
            [FindingKind::DuplicateNonRepeatable]
        );
        assert!(kinds(&record, ValidationOptions::default()).is_empty());
    }

    #[test]
    fn test_malformed_data_fields() {
        let mut record = Record::default();
        record.append_field(Field::new(tag("100"), "1"));
        record.append_field(Field::new(tag("245"), "10Title"));
        record.append_field(Field::new(tag("246"), "10\x1Fa\x1F\x1Fbx"));
        record.append_field(Field::new(tag("250"), "  \x1Fa2nd ed.\x1F"));
        assert_eq!(
            kinds(&record, ValidationOptions::default()),
            [
                FindingKind::MissingIndicators,
                FindingKind::MissingDelimiter,
                FindingKind::EmptySubfieldCode,
                FindingKind::DanglingDelimiter,
            ]
        );
    }

    #[test]
    fn test_options_tolerate_empty_codes_flag_empty_values() {
        let mut record = Record::default();
        record.append_field(Field::new(tag("246"), "10\x1Fa\x1F\x1Fbx"));
        let options = ValidationOptions::default()
            .with_empty_subfield_codes(true)
            .with_empty_subfield_values(false);
        assert_eq!(kinds(&record, options), [FindingKind::EmptySubfieldValue]);
    }

    #[test]
    fn test_malformed_local_blocks() {
        let mut record = Record::default();
        record.append_field(Field::local(tag("852"), ' ', ' ', [('a', "stray")]));
        record.append_field(Field::local(tag("000"), ' ', ' ', [('a', "x")]));
        record.append_field(Field::local(tag("852"), ' ', ' ', [('a', "no 001")]));
        record.append_field(Field::new(tag("LOK"), "  \x1Fabroken"));
        record.append_field(Field::local(tag("000"), ' ', ' ', [('a', "last")]));
        assert_eq!(
            kinds(&record, ValidationOptions::default()),
            [
                FindingKind::MalformedLocalBlock,
                FindingKind::MalformedLocalBlock,
                FindingKind::MalformedLocalField,
                FindingKind::MalformedLocalBlock,
            ]
        );
    }

    #[test]
    fn test_leader_codes() {
        let mut record = valid_record();
        record.leader_mut().set(5, 'x').unwrap();
        record.leader_mut().set(7, 'q').unwrap();
        assert_eq!(
            kinds(&record, ValidationOptions::default()),
            [FindingKind::InvalidLeader, FindingKind::InvalidLeader]
        );
        assert!(kinds(&record, ValidationOptions::default().with_leader_check(false)).is_empty());
    }
}
