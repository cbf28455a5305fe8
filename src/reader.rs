//! Reading MARC records from binary streams.
//!
//! This module provides [`MarcReader`] for reading ISO 2709 formatted MARC records
//! from any source that implements [`std::io::Read`].
//!
//! The reader keeps track of the byte offset at which the next record
//! starts. [`MarcReader::tell`] reports it; for seekable sources
//! [`MarcReader::seek`] returns to a previously reported offset, so a
//! second pass can fetch single records without rescanning the file.
//!
//! # Examples
//!
//! Reading records from a file:
//!
//! ```no_run
//! use marcrec::MarcReader;
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = BufReader::new(File::open("records.mrc")?);
//! let mut reader = MarcReader::new(file);
//!
//! loop {
//!     let offset = reader.tell();
//!     match reader.read_record() {
//!         Ok(Some(record)) => println!("{offset}: {}", record.control_number()),
//!         Ok(None) => break,
//!         // decode errors concern one record; the reader can continue
//!         Err(e) if e.is_decode_error() => eprintln!("skipping: {e}"),
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{MarcError, Result};
use crate::field::Field;
use crate::formats::{FormatReader, SeekableFormatReader};
use crate::leader::{Leader, LEADER_LENGTH};
use crate::record::{Record, DIRECTORY_ENTRY_LENGTH};
use crate::tag::{Tag, TAG_LENGTH};
use std::fmt::Debug;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Terminates every field and the directory.
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Terminates every record.
pub const RECORD_TERMINATOR: u8 = 0x1D;

// leader + directory terminator + record terminator
const MIN_RECORD_LENGTH: usize = LEADER_LENGTH + 2;

/// Reader for ISO 2709 binary MARC format.
///
/// `MarcReader` reads one MARC record at a time from any source implementing
/// [`std::io::Read`]. Each call consumes exactly one record's bytes.
///
/// # Examples
///
/// ```
/// use marcrec::MarcReader;
/// use std::io::Cursor;
///
/// let mut reader = MarcReader::new(Cursor::new(Vec::new()));
/// assert!(reader.read_record()?.is_none());
/// assert_eq!(reader.tell(), 0);
/// # Ok::<(), marcrec::MarcError>(())
/// ```
#[derive(Debug)]
pub struct MarcReader<R: Read> {
    reader: R,
    offset: u64,
    records_read: usize,
}

impl<R: Read> MarcReader<R> {
    /// Create a new MARC reader over a source positioned at offset 0.
    pub fn new(reader: R) -> Self {
        MarcReader {
            reader,
            offset: 0,
            records_read: 0,
        }
    }

    /// Byte offset at which the next record starts.
    #[must_use]
    pub fn tell(&self) -> u64 {
        self.offset
    }

    /// Number of records decoded so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read a single MARC record.
    ///
    /// Returns `Ok(Some(record))` if a record was successfully read, `Ok(None)` if the
    /// source ended exactly at a record boundary, or `Err` if the record was malformed.
    ///
    /// # Errors
    ///
    /// Returns a decode error carrying the record's start offset for a
    /// truncated leader or body, a non-numeric record length, a malformed
    /// directory, or a missing terminator. Once the leader's length could be
    /// read, the whole record has been consumed and the next call starts at
    /// the following record. I/O failures are returned as
    /// [`MarcError::IoError`].
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let start = self.offset;

        let mut leader_bytes = [0u8; LEADER_LENGTH];
        let got = read_up_to(&mut self.reader, &mut leader_bytes)?;
        if got == 0 {
            return Ok(None);
        }
        self.offset += got as u64;
        if got < LEADER_LENGTH {
            return Err(MarcError::TruncatedLeader {
                offset: start,
                available: got,
            });
        }

        let record_length = parse_digits(&leader_bytes[..5])
            .filter(|&length| length >= MIN_RECORD_LENGTH)
            .ok_or_else(|| MarcError::InvalidRecordLength {
                offset: start,
                found: String::from_utf8_lossy(&leader_bytes[..5]).into_owned(),
            })?;

        let mut body = vec![0u8; record_length - LEADER_LENGTH];
        let got = read_up_to(&mut self.reader, &mut body)?;
        self.offset += got as u64;
        if got < body.len() {
            return Err(MarcError::TruncatedRecord {
                offset: start,
                expected: record_length,
                available: LEADER_LENGTH + got,
            });
        }

        let record = decode_parts(start, &leader_bytes, &body)?;
        self.records_read += 1;
        tracing::debug!(
            offset = start,
            length = record_length,
            fields = record.len(),
            "decoded binary record"
        );
        Ok(Some(record))
    }
}

impl<R: Read + Seek> MarcReader<R> {
    /// Reposition to `offset`, typically a value obtained from [`MarcReader::tell`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot seek.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Seek back to the start of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot seek.
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(0)
    }
}

impl<R: Read + Debug> FormatReader for MarcReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        MarcReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }

    fn tell(&self) -> u64 {
        self.offset
    }
}

impl<R: Read + Seek + Debug> SeekableFormatReader for MarcReader<R> {
    fn seek(&mut self, offset: u64) -> Result<()> {
        MarcReader::seek(self, offset)
    }
}

/// Decode one complete binary record from `bytes`.
///
/// # Errors
///
/// Returns the same decode errors as [`MarcReader::read_record`], with
/// offset 0, if `bytes` is not exactly one well-formed record.
pub fn decode_record(bytes: &[u8]) -> Result<Record> {
    let mut reader = MarcReader::new(bytes);
    let record = reader.read_record()?.ok_or(MarcError::TruncatedLeader {
        offset: 0,
        available: 0,
    })?;
    if reader.tell() != bytes.len() as u64 {
        return Err(MarcError::InvalidRecordLength {
            offset: 0,
            found: format!("{} of {} bytes", reader.tell(), bytes.len()),
        });
    }
    Ok(record)
}

/// Build a record from its leader bytes and the rest of its bytes.
fn decode_parts(offset: u64, leader_bytes: &[u8], body: &[u8]) -> Result<Record> {
    let leader = Leader::from_bytes(leader_bytes).map_err(|e| MarcError::MalformedLeader {
        offset,
        reason: e.to_string(),
    })?;

    let Some((&RECORD_TERMINATOR, body)) = body.split_last() else {
        return Err(MarcError::MissingRecordTerminator { offset });
    };

    let mut entries = Vec::new();
    let mut pos = 0;
    loop {
        match body.get(pos) {
            None => return Err(MarcError::MissingDirectoryTerminator { offset }),
            Some(&FIELD_TERMINATOR) => break,
            Some(_) => {},
        }
        let Some(entry) = body.get(pos..pos + DIRECTORY_ENTRY_LENGTH) else {
            return Err(MarcError::MissingDirectoryTerminator { offset });
        };
        entries.push(parse_directory_entry(offset, entries.len(), entry)?);
        pos += DIRECTORY_ENTRY_LENGTH;
    }
    let data = &body[pos + 1..];

    let mut fields = Vec::with_capacity(entries.len());
    for (tag, length, start) in entries {
        let Some(raw) = data.get(start..start + length) else {
            return Err(MarcError::FieldOutOfBounds {
                offset,
                tag: tag.to_string(),
                start,
                length,
                data_len: data.len(),
            });
        };
        let Some((&FIELD_TERMINATOR, content)) = raw.split_last() else {
            return Err(MarcError::MissingFieldTerminator {
                offset,
                tag: tag.to_string(),
            });
        };
        let field = Field::from_bytes(tag, content);
        if field.has_undecodable_bytes() {
            tracing::warn!(
                offset,
                tag = %tag,
                "invalid UTF-8 in field, keeping the raw bytes"
            );
        }
        fields.push(field);
    }

    Ok(Record::with_fields(leader, fields))
}

fn parse_directory_entry(offset: u64, index: usize, entry: &[u8]) -> Result<(Tag, usize, usize)> {
    let invalid = |reason: String| MarcError::InvalidDirectoryEntry {
        offset,
        index,
        reason,
    };
    let tag = Tag::from_bytes(&entry[..TAG_LENGTH]).map_err(|e| invalid(e.to_string()))?;
    let length = parse_digits(&entry[TAG_LENGTH..TAG_LENGTH + 4]).ok_or_else(|| {
        invalid(format!(
            "field length {:?} is not numeric",
            String::from_utf8_lossy(&entry[TAG_LENGTH..TAG_LENGTH + 4])
        ))
    })?;
    let start = parse_digits(&entry[TAG_LENGTH + 4..]).ok_or_else(|| {
        invalid(format!(
            "field start {:?} is not numeric",
            String::from_utf8_lossy(&entry[TAG_LENGTH + 4..])
        ))
    })?;
    Ok((tag, length, start))
}

/// Parse ASCII digits without allocating; `None` if any byte is not a digit.
fn parse_digits(bytes: &[u8]) -> Option<usize> {
    bytes.iter().try_fold(0usize, |acc, &byte| {
        byte.is_ascii_digit()
            .then(|| acc * 10 + usize::from(byte - b'0'))
    })
}

/// Fill `buf` as far as the source allows. Returns the number of bytes read,
/// which is less than `buf.len()` only at end of stream.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {},
            Err(e) => return Err(MarcError::IoError(e)),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// One record: 001 "12345", 245 10 $aTitle.
    fn sample_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"00066nam a2200049   4500");
        bytes.extend_from_slice(b"001000600000");
        bytes.extend_from_slice(b"245001000006");
        bytes.push(FIELD_TERMINATOR);
        bytes.extend_from_slice(b"12345\x1E");
        bytes.extend_from_slice(b"10\x1FaTitle\x1E");
        bytes.push(RECORD_TERMINATOR);
        assert_eq!(bytes.len(), 66);
        bytes
    }

    #[test]
    fn test_read_single_record() {
        let mut reader = MarcReader::new(Cursor::new(sample_bytes()));
        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.control_number(), "12345");
        assert_eq!(
            record.first_subfield_value(Tag::new("245").unwrap(), 'a'),
            Some("Title")
        );
        assert_eq!(reader.tell(), 66);
        assert_eq!(reader.records_read(), 1);
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_seek_and_rewind() {
        let mut data = sample_bytes();
        data.extend(sample_bytes());
        let mut reader = MarcReader::new(Cursor::new(data));
        reader.read_record().unwrap().unwrap();
        let second = reader.tell();
        reader.read_record().unwrap().unwrap();
        assert!(reader.read_record().unwrap().is_none());

        reader.seek(second).unwrap();
        assert_eq!(reader.tell(), 66);
        assert!(reader.read_record().unwrap().is_some());
        reader.rewind().unwrap();
        assert_eq!(reader.tell(), 0);
        assert_eq!(reader.read_record().unwrap().unwrap().control_number(), "12345");
    }

    #[test]
    fn test_truncated_leader() {
        let mut reader = MarcReader::new(Cursor::new(b"00069nam".to_vec()));
        let err = reader.read_record().unwrap_err();
        assert!(matches!(
            err,
            MarcError::TruncatedLeader {
                offset: 0,
                available: 8
            }
        ));
    }

    #[test]
    fn test_non_numeric_length() {
        let mut bytes = sample_bytes();
        bytes[2] = b'x';
        let err = MarcReader::new(Cursor::new(bytes)).read_record().unwrap_err();
        assert!(matches!(err, MarcError::InvalidRecordLength { offset: 0, .. }));
    }

    #[test]
    fn test_truncated_body() {
        let mut bytes = sample_bytes();
        bytes.truncate(50);
        let err = MarcReader::new(Cursor::new(bytes)).read_record().unwrap_err();
        assert!(matches!(
            err,
            MarcError::TruncatedRecord {
                expected: 66,
                available: 50,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_record_terminator() {
        let mut bytes = sample_bytes();
        bytes[65] = b'x';
        let err = decode_record(&bytes).unwrap_err();
        assert!(matches!(err, MarcError::MissingRecordTerminator { offset: 0 }));
    }

    #[test]
    fn test_field_out_of_bounds() {
        let mut bytes = sample_bytes();
        // 245 claims 99 bytes
        bytes[24 + 12 + 3..24 + 12 + 7].copy_from_slice(b"0099");
        let err = decode_record(&bytes).unwrap_err();
        assert!(
            matches!(err, MarcError::FieldOutOfBounds { ref tag, length: 99, .. } if tag == "245")
        );
    }

    #[test]
    fn test_missing_field_terminator() {
        let mut bytes = sample_bytes();
        // 001 claims 5 bytes, cutting off its terminator
        bytes[24 + 3..24 + 7].copy_from_slice(b"0005");
        let err = decode_record(&bytes).unwrap_err();
        assert!(matches!(err, MarcError::MissingFieldTerminator { ref tag, .. } if tag == "001"));
    }

    #[test]
    fn test_malformed_directory_entry() {
        let mut bytes = sample_bytes();
        bytes[24 + 12 + 8] = b'?';
        let err = decode_record(&bytes).unwrap_err();
        assert!(matches!(
            err,
            MarcError::InvalidDirectoryEntry { index: 1, .. }
        ));
    }

    #[test]
    fn test_missing_directory_terminator() {
        let mut bytes = b"00030nam a2200025   4500".to_vec();
        bytes.extend_from_slice(b"00100");
        bytes.push(RECORD_TERMINATOR);
        let err = decode_record(&bytes).unwrap_err();
        assert!(matches!(err, MarcError::MissingDirectoryTerminator { offset: 0 }));
    }

    #[test]
    fn test_error_offset_and_recovery() {
        let mut broken = sample_bytes();
        broken[65] = b'x';
        let mut data = sample_bytes();
        data.extend(broken);
        data.extend(sample_bytes());

        let mut reader = MarcReader::new(Cursor::new(data));
        assert!(reader.read_record().unwrap().is_some());
        let err = reader.read_record().unwrap_err();
        assert_eq!(err.offset(), Some(66));
        assert_eq!(reader.tell(), 132);
        assert!(reader.read_record().unwrap().is_some());
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut bytes = sample_bytes();
        // replace a byte of "Title"
        let pos = bytes.len() - 4;
        bytes[pos] = 0xFF;
        let record = decode_record(&bytes).unwrap();
        let value = record.first_subfield_value(Tag::new("245").unwrap(), 'a');
        assert_eq!(value, Some("Tit\u{FFFD}e"));
    }

    #[test]
    fn test_invalid_utf8_reencodes_unchanged() {
        let mut bytes = sample_bytes();
        let pos = bytes.len() - 6;
        bytes[pos] = 0xE2;
        let record = decode_record(&bytes).unwrap();
        let field = record.get_first_field(Tag::new("245").unwrap()).unwrap();
        assert!(field.has_undecodable_bytes());
        assert_eq!(record.serialized_len(), bytes.len());
        assert_eq!(crate::writer::encode_record(&record).unwrap(), bytes);
    }

    #[test]
    fn test_malformed_leader_is_skipped() {
        let mut broken = sample_bytes();
        broken[6] = 0xC3;
        let mut data = broken;
        data.extend(sample_bytes());

        let mut reader = MarcReader::new(Cursor::new(data));
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, MarcError::MalformedLeader { offset: 0, .. }));
        assert!(err.is_decode_error());
        assert_eq!(reader.tell(), 66);
        assert_eq!(reader.read_record().unwrap().unwrap().control_number(), "12345");
    }
}
