#![warn(missing_docs)]

//! # marcrec
//!
//! Reading, writing and editing MARC 21 records in ISO 2709 binary and
//! MARCXML form, including the `LOK` local data blocks that union
//! catalogues attach per holding library.
//!
//! ## Quick Start
//!
//! ### Reading MARC Records
//!
//! ```no_run
//! use marcrec::MarcReader;
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = MarcReader::new(BufReader::new(File::open("records.mrc")?));
//!
//! while let Some(record) = reader.read_record()? {
//!     if let Some(title) = record.first_subfield_value("245".parse()?, 'a') {
//!         println!("{}: {title}", record.control_number());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Creating and Writing MARC Records
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
//! // a second 100 would be rejected, 650 may repeat
//! record.insert_field(Field::data(Tag::new("100")?, '1', ' ', [('a', "Doe, Jane")]))?;
//! assert!(record
//!     .insert_field(Field::data(Tag::new("100")?, '1', ' ', [('a', "Roe, Rick")]))
//!     .is_err());
//!
//! let mut buffer = Vec::new();
//! let mut writer = MarcWriter::new(&mut buffer);
//! writer.write_record(&record)?;
//! writer.finish()?;
//!
//! let decoded = MarcReader::new(buffer.as_slice()).read_record()?.expect("one record");
//! assert_eq!(decoded.control_number(), "123456789");
//! assert_eq!(decoded.first_subfield_value(Tag::new("245")?, 'a'), Some("Example Title"));
//! # Ok::<(), marcrec::MarcError>(())
//! ```
//!
//! ## Modules
//!
//! - [`tag`]: three-character field tags
//! - [`leader`]: the 24-byte record header
//! - [`subfields`], [`field`], [`record`]: the record model
//! - [`local_data`]: addressing `LOK` blocks inside a record
//! - [`field_query`]: regex-based field selection
//! - [`record_validation`]: structural checks returning findings
//! - [`reader`], [`writer`]: ISO 2709 binary codec
//! - [`marcxml`]: streaming MARCXML codec
//! - [`checksum`]: order-tolerant content hashes
//! - [`formats`]: format detection and the reader/writer traits
//! - [`offset_index`]: control number to file offset maps
//! - [`error`]: error types and result type

pub mod checksum;
pub mod error;
pub mod field;
pub mod field_query;
/// Multi-format support with unified Reader/Writer traits.
///
/// See the [`formats`] module documentation for details on supported formats
/// and how to use format-agnostic code.
pub mod formats;
pub mod leader;
pub mod local_data;
pub mod marcxml;
pub mod offset_index;
pub mod reader;
/// Core MARC record structure and its editing operations.
pub mod record;
pub mod record_validation;
pub mod subfields;
pub mod tag;
pub mod writer;

pub use checksum::{calc_checksum, ChecksumOptions, FieldOrder};
pub use error::{MarcError, Result};
pub use field::Field;
pub use field_query::SubfieldPatternQuery;
pub use formats::{Format, FormatReader, FormatWriter, SeekableFormatReader};
pub use leader::{BibliographicLevel, Leader, RecordType, TypeOfRecord};
pub use marcxml::{MarcXmlReader, MarcXmlWriter, TextConversion, XmlWriterOptions};
pub use reader::MarcReader;
pub use record::Record;
pub use record_validation::{
    FindingKind, RecordStructureValidator, ValidationFinding, ValidationOptions,
};
pub use subfields::{Subfield, Subfields};
pub use tag::Tag;
pub use writer::MarcWriter;
