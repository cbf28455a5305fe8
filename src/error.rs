//! Error types for MARC operations.
//!
//! This module provides the [`MarcError`] type for all library operations
//! and the [`Result`] convenience type.
//!
//! Decoding errors carry the byte offset of the record that failed so a
//! caller can log the failure, skip the record and keep reading.

use crate::tag::Tag;
use thiserror::Error;

/// Error type for all MARC library operations.
#[derive(Error, Debug)]
pub enum MarcError {
    /// A tag was not exactly three printable ASCII characters.
    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    /// A leader was malformed (wrong length or unusable contents).
    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    /// A field could not be built or edited as requested.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Attempt to insert a second occurrence of a non-repeatable tag.
    #[error("Tag {0} is not repeatable and is already present")]
    NonRepeatableTag(Tag),

    /// A record in the input stream carries an unusable leader.
    #[error("Malformed leader at offset {offset}: {reason}")]
    MalformedLeader {
        /// Offset of the record in the input.
        offset: u64,
        /// Why the leader was rejected.
        reason: String,
    },

    /// Fewer than 24 bytes were left for the leader.
    #[error("Truncated leader at offset {offset}: got {available} of 24 bytes")]
    TruncatedLeader {
        /// Offset of the record in the input.
        offset: u64,
        /// Number of leader bytes that could be read.
        available: usize,
    },

    /// The record length in leader positions 0-4 is not five ASCII digits or is too small.
    #[error("Invalid record length {found:?} at offset {offset}")]
    InvalidRecordLength {
        /// Offset of the record in the input.
        offset: u64,
        /// The offending leader bytes.
        found: String,
    },

    /// The input ended before the record length announced by the leader.
    #[error("Truncated record at offset {offset}: expected {expected} bytes, got {available}")]
    TruncatedRecord {
        /// Offset of the record in the input.
        offset: u64,
        /// Record length from the leader.
        expected: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// A directory entry was not made of a tag and two digit groups.
    #[error("Malformed directory entry {index} at offset {offset}: {reason}")]
    InvalidDirectoryEntry {
        /// Offset of the record in the input.
        offset: u64,
        /// Zero-based index of the directory entry.
        index: usize,
        /// Description of the problem.
        reason: String,
    },

    /// The directory ran into the end of the record without a terminator.
    #[error("Missing directory terminator at offset {offset}")]
    MissingDirectoryTerminator {
        /// Offset of the record in the input.
        offset: u64,
    },

    /// A directory entry addressed bytes outside the data area.
    #[error("Field {tag} at offset {offset} exceeds the data area ({start}+{length} > {data_len})")]
    FieldOutOfBounds {
        /// Offset of the record in the input.
        offset: u64,
        /// Tag named by the directory entry.
        tag: String,
        /// Start of the field within the data area.
        start: usize,
        /// Field length from the directory.
        length: usize,
        /// Size of the data area.
        data_len: usize,
    },

    /// A field's bytes did not end with the field terminator.
    #[error("Field {tag} at offset {offset} lacks its field terminator")]
    MissingFieldTerminator {
        /// Offset of the record in the input.
        offset: u64,
        /// Tag of the field.
        tag: String,
    },

    /// The last byte of a record was not the record terminator.
    #[error("Missing record terminator at offset {offset}")]
    MissingRecordTerminator {
        /// Offset of the record in the input.
        offset: u64,
    },

    /// The serialized record would not fit the 5-digit length of the leader.
    #[error("Record {control_number:?} would be {length} bytes long (limit {limit})")]
    RecordTooLong {
        /// Control number of the rejected record.
        control_number: String,
        /// Serialized length that was computed.
        length: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// A field would not fit the 4-digit length of a directory entry.
    #[error("Field {tag} of record {control_number:?} has {length} content bytes (limit {limit})")]
    FieldTooLong {
        /// Tag of the rejected field.
        tag: Tag,
        /// Control number of the record.
        control_number: String,
        /// Content length that was computed.
        length: usize,
        /// Maximum allowed content length.
        limit: usize,
    },

    /// A record holds content that MARCXML cannot carry unchanged.
    #[error("Record {control_number:?} cannot be written as MARCXML: {reason}")]
    NotRepresentableInXml {
        /// Control number of the rejected record.
        control_number: String,
        /// What could not be represented.
        reason: String,
    },

    /// Malformed or unexpected MARCXML input.
    #[error("MARCXML error near byte {position}: {message}")]
    Xml {
        /// Approximate byte position in the XML input.
        position: u64,
        /// Description of the problem.
        message: String,
    },

    /// The input format could not be determined.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// An operation was attempted on a writer that was already finished.
    #[error("Writer already finished")]
    WriterFinished,

    /// IO error from the underlying source/destination.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MarcError {
    /// Byte offset of the failing record, for errors raised while decoding.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        match self {
            MarcError::TruncatedLeader { offset, .. }
            | MarcError::MalformedLeader { offset, .. }
            | MarcError::InvalidRecordLength { offset, .. }
            | MarcError::TruncatedRecord { offset, .. }
            | MarcError::InvalidDirectoryEntry { offset, .. }
            | MarcError::MissingDirectoryTerminator { offset }
            | MarcError::FieldOutOfBounds { offset, .. }
            | MarcError::MissingFieldTerminator { offset, .. }
            | MarcError::MissingRecordTerminator { offset } => Some(*offset),
            MarcError::Xml { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// True for errors that concern a single malformed record in an input stream.
    ///
    /// Readers stay usable after such an error: the next call starts at the
    /// following record whenever its start could be determined.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        self.offset().is_some()
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;
