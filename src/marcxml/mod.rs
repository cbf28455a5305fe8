//! MARCXML support.
//!
//! Records are read and written one at a time as a stream of XML events,
//! so arbitrarily large collections never have to fit in memory. The
//! element vocabulary is the one defined by the Library of Congress
//! (<https://www.loc.gov/standards/marcxml/>):
//!
//! ```xml
//! <collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <leader>00000nam a2200000   4500</leader>
//!     <controlfield tag="001">12345</controlfield>
//!     <datafield tag="245" ind1="1" ind2="0">
//!       <subfield code="a">Title</subfield>
//!     </datafield>
//!   </record>
//! </collection>
//! ```
//!
//! Namespace prefixes (`<marc:record>`) are accepted when reading.
//!
//! # Examples
//!
//! ```
//! use marcrec::marcxml::{MarcXmlReader, MarcXmlWriter};
//! use marcrec::{Field, Record, Tag};
//!
//! let mut record = Record::default();
//! record.insert_field(Field::control(Tag::CONTROL_NUMBER, "12345"))?;
//! record.insert_field(Field::data(Tag::new("245")?, '1', '0', [('a', "Title")]))?;
//!
//! let mut xml = Vec::new();
//! let mut writer = MarcXmlWriter::new(&mut xml);
//! writer.write_record(&record)?;
//! writer.finish()?;
//! drop(writer);
//!
//! let mut reader = MarcXmlReader::new(xml.as_slice());
//! let decoded = reader.read_record()?.expect("one record");
//! assert_eq!(decoded, record);
//! assert!(reader.read_record()?.is_none());
//! # Ok::<(), marcrec::MarcError>(())
//! ```

mod reader;
mod writer;

pub use reader::MarcXmlReader;
pub use writer::{MarcXmlWriter, TextConversion, XmlWriterOptions};

/// The MARCXML namespace URI.
pub const MARCXML_NAMESPACE: &str = "http://www.loc.gov/MARC21/slim";

pub(crate) const COLLECTION: &[u8] = b"collection";
pub(crate) const RECORD: &[u8] = b"record";
pub(crate) const LEADER: &[u8] = b"leader";
pub(crate) const CONTROL_FIELD: &[u8] = b"controlfield";
pub(crate) const DATA_FIELD: &[u8] = b"datafield";
pub(crate) const SUBFIELD: &[u8] = b"subfield";
