//! Writing MARC records to binary format.
//!
//! This module provides [`MarcWriter`] for serializing [`Record`] instances
//! to ISO 2709 binary format that can be written to any destination implementing
//! [`std::io::Write`].
//!
//! A record is assembled completely in memory before anything is written,
//! so a record that exceeds the format's length ceilings is rejected
//! without emitting partial output.
//!
//! # Examples
//!
//! ```
//! use marcrec::{BibliographicLevel, Field, MarcReader, MarcWriter, Record, Tag, TypeOfRecord};
//!
//! let mut record = Record::synthesize(
//!     TypeOfRecord::LanguageMaterial,
//!     BibliographicLevel::MonographOrItem,
//!     "123456789",
//! );
//! record.insert_field(Field::data(Tag::new("245")?, '1', '0', [('a', "Example Title")]))?;
//!
//! let mut buffer = Vec::new();
//! let mut writer = MarcWriter::new(&mut buffer);
//! writer.write_record(&record)?;
//! writer.finish()?;
//!
//! let mut reader = MarcReader::new(buffer.as_slice());
//! let decoded = reader.read_record()?.expect("one record");
//! assert_eq!(decoded.fields(), record.fields());
//! # Ok::<(), marcrec::MarcError>(())
//! ```

use crate::error::{MarcError, Result};
use crate::formats::FormatWriter;
use crate::leader::LEADER_LENGTH;
use crate::reader::{FIELD_TERMINATOR, RECORD_TERMINATOR};
use crate::record::{Record, DIRECTORY_ENTRY_LENGTH};
use std::io::Write;

/// Largest record the 5-digit leader length can describe.
pub const MAX_RECORD_LENGTH: usize = 99_999;
/// Largest field content; the directory's 4-digit length also counts the terminator.
pub const MAX_FIELD_LENGTH: usize = 9_998;

/// Writer for ISO 2709 binary MARC format.
///
/// `MarcWriter` serializes [`Record`] instances to ISO 2709 binary format.
/// Records are written one at a time to any destination implementing [`std::io::Write`].
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: W,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new MARC writer.
    pub fn new(writer: W) -> Self {
        MarcWriter {
            writer,
            records_written: 0,
            finished: false,
        }
    }

    /// Write a single record.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::FieldTooLong`] or [`MarcError::RecordTooLong`]
    /// before writing anything if the record exceeds the length ceilings,
    /// [`MarcError::WriterFinished`] after [`MarcWriter::finish`], or an I/O error.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MarcError::WriterFinished);
        }

        let bytes = encode_record(record).map_err(|e| {
            tracing::warn!(
                control_number = record.control_number(),
                error = %e,
                "rejected binary record"
            );
            e
        })?;
        self.writer.write_all(&bytes)?;
        self.records_written += 1;
        tracing::debug!(
            control_number = record.control_number(),
            length = bytes.len(),
            "wrote binary record"
        );
        Ok(())
    }

    /// Flush the writer and mark it as finished.
    ///
    /// After calling `finish`, no more records can be written.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying writer fails.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Returns the number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Consume the writer, returning the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + std::fmt::Debug> FormatWriter for MarcWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MarcWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        MarcWriter::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}

/// Serialize one record to ISO 2709 bytes.
///
/// The leader is copied from the record with the record length (positions
/// 0-4) and base address of data (positions 12-16) recomputed.
///
/// # Errors
///
/// Returns [`MarcError::FieldTooLong`] if a field's content exceeds
/// [`MAX_FIELD_LENGTH`] bytes and [`MarcError::RecordTooLong`] if the whole
/// record would exceed [`MAX_RECORD_LENGTH`] bytes.
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    let mut directory = Vec::with_capacity(DIRECTORY_ENTRY_LENGTH * record.len() + 1);
    let mut data = Vec::new();

    for field in record.fields() {
        let contents = field.as_bytes();
        if contents.len() > MAX_FIELD_LENGTH {
            return Err(MarcError::FieldTooLong {
                tag: field.tag(),
                control_number: record.control_number().to_string(),
                length: contents.len(),
                limit: MAX_FIELD_LENGTH,
            });
        }
        let start = data.len();
        data.extend_from_slice(contents);
        data.push(FIELD_TERMINATOR);

        directory.extend_from_slice(field.tag().as_bytes());
        directory.extend_from_slice(format!("{:04}{start:05}", contents.len() + 1).as_bytes());
    }
    directory.push(FIELD_TERMINATOR);

    let base_address = LEADER_LENGTH + directory.len();
    let record_length = base_address + data.len() + 1;
    if record_length > MAX_RECORD_LENGTH {
        return Err(MarcError::RecordTooLong {
            control_number: record.control_number().to_string(),
            length: record_length,
            limit: MAX_RECORD_LENGTH,
        });
    }

    let leader = record.leader().with_lengths(record_length, base_address)?;
    let mut bytes = Vec::with_capacity(record_length);
    bytes.extend_from_slice(leader.as_bytes());
    bytes.extend_from_slice(&directory);
    bytes.extend_from_slice(&data);
    bytes.push(RECORD_TERMINATOR);
    Ok(bytes)
}
