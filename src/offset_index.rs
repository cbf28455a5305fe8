//! Control-number index over a record file.
//!
//! One pass records where each record starts, so that later lookups can
//! [`seek`](crate::formats::SeekableFormatReader::seek) straight to a record
//! instead of rescanning the file.
//!
//! ```
//! use marcrec::offset_index::collect_record_offsets;
//! use marcrec::{Field, MarcReader, MarcWriter, Record, Tag};
//! use std::io::Cursor;
//!
//! let mut buffer = Vec::new();
//! let mut writer = MarcWriter::new(&mut buffer);
//! for id in ["a", "b", "c"] {
//!     let mut record = Record::default();
//!     record.append_field(Field::control(Tag::CONTROL_NUMBER, id));
//!     writer.write_record(&record)?;
//! }
//! writer.finish()?;
//!
//! let mut reader = MarcReader::new(Cursor::new(buffer));
//! let index = collect_record_offsets(&mut reader)?;
//! reader.seek(index["b"])?;
//! assert_eq!(reader.read_record()?.unwrap().control_number(), "b");
//! # Ok::<(), marcrec::MarcError>(())
//! ```

use crate::error::Result;
use crate::formats::FormatReader;
use std::collections::HashMap;

/// Read every remaining record and map its control number to its offset.
///
/// Records without a control number are skipped. When a control number
/// occurs more than once, the first offset wins.
///
/// # Errors
///
/// Stops at the first error the reader returns.
pub fn collect_record_offsets<R: FormatReader + ?Sized>(
    reader: &mut R,
) -> Result<HashMap<String, u64>> {
    let mut offsets = HashMap::new();
    loop {
        let offset = reader.tell();
        let Some(record) = reader.read_record()? else {
            break;
        };
        let control_number = record.control_number();
        if control_number.is_empty() {
            tracing::debug!(offset, "skipping record without control number");
            continue;
        }
        if offsets.contains_key(control_number) {
            tracing::warn!(control_number, offset, "duplicate control number");
            continue;
        }
        offsets.insert(control_number.to_string(), offset);
    }
    tracing::debug!(records = offsets.len(), "collected record offsets");
    Ok(offsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::formats::SeekableFormatReader;
    use crate::marcxml::{MarcXmlReader, MarcXmlWriter};
    use crate::record::Record;
    use crate::tag::Tag;
    use std::io::Cursor;

    fn records(ids: &[&str]) -> Vec<Record> {
        ids.iter()
            .map(|id| {
                let mut record = Record::default();
                if !id.is_empty() {
                    record.append_field(Field::control(Tag::CONTROL_NUMBER, *id));
                }
                record.append_field(Field::data(Tag::new("245").unwrap(), '0', '0', [('a', *id)]));
                record
            })
            .collect()
    }

    #[test]
    fn test_xml_offsets_and_duplicates() {
        let mut xml = Vec::new();
        let mut writer = MarcXmlWriter::new(&mut xml);
        for record in records(&["x1", "", "x2", "x1"]) {
            writer.write_record(&record).unwrap();
        }
        writer.finish().unwrap();
        drop(writer);

        let mut reader = MarcXmlReader::new(Cursor::new(xml));
        let index = collect_record_offsets(&mut reader).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index["x1"] < index["x2"]);

        reader.seek(index["x2"]).unwrap();
        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.control_number(), "x2");

        reader.seek(index["x1"]).unwrap();
        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.control_number(), "x1");
    }

    #[test]
    fn test_empty_source() {
        let mut reader = MarcXmlReader::new(Cursor::new(Vec::new()));
        assert!(collect_record_offsets(&mut reader).unwrap().is_empty());
    }
}
