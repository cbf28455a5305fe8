use super::{COLLECTION, CONTROL_FIELD, DATA_FIELD, LEADER, RECORD, SUBFIELD};
use crate::error::{MarcError, Result};
use crate::field::Field;
use crate::formats::{FormatReader, SeekableFormatReader};
use crate::leader::Leader;
use crate::record::Record;
use crate::subfields::Subfields;
use crate::tag::Tag;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Debug;
use std::io::{BufRead, Seek, SeekFrom};

/// Streaming reader for MARCXML documents.
///
/// Accepts a `<collection>` of records as well as a bare `<record>` or a
/// sequence of them. Each call to [`MarcXmlReader::read_record`] pulls XML
/// events until the closing `</record>` and leaves the source right behind
/// it, so [`MarcXmlReader::tell`] can be handed back to
/// [`MarcXmlReader::seek`] later.
///
/// Elements and attributes outside the MARCXML vocabulary are errors.
/// Namespace declarations and other prefixed attributes are ignored.
#[derive(Debug)]
pub struct MarcXmlReader<R: BufRead> {
    source: R,
    offset: u64,
    records_read: usize,
    buf: Vec<u8>,
}

#[derive(Debug)]
enum TextTarget {
    Leader,
    ControlField(Tag),
    Subfield(char),
}

#[derive(Debug)]
struct OpenDataField {
    tag: Tag,
    indicator1: char,
    indicator2: char,
    subfields: Subfields,
}

#[derive(Debug, Default)]
struct PartialRecord {
    leader: Option<Leader>,
    fields: Vec<Field>,
    datafield: Option<OpenDataField>,
    target: Option<TextTarget>,
    text: String,
}

impl<R: BufRead> MarcXmlReader<R> {
    /// Create a reader over a source positioned at offset 0.
    pub fn new(source: R) -> Self {
        MarcXmlReader {
            source,
            offset: 0,
            records_read: 0,
            buf: Vec::new(),
        }
    }

    /// Byte offset right after the last consumed `</record>`.
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
        self.source
    }

    /// Read the next record.
    ///
    /// Returns `Ok(None)` once the document ends outside of a record.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::Xml`] with the approximate byte position for
    /// malformed XML, unknown elements or attributes, a record without a
    /// leader, or a document that ends inside a record.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let start = self.offset;
        let mut xml = Reader::from_reader(&mut self.source);
        xml.trim_text(false);
        xml.check_end_names(false);
        xml.expand_empty_elements(false);

        let mut partial: Option<PartialRecord> = None;
        let result = loop {
            self.buf.clear();
            let position = start + xml.buffer_position() as u64;
            let event = match xml.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(e) => break Err(xml_error(position, e)),
            };
            let step = match event {
                Event::Start(e) => open_element(&mut partial, &e, position),
                Event::Empty(e) => open_element(&mut partial, &e, position)
                    .and_then(|_| close_element(&mut partial, e.local_name().as_ref(), position)),
                Event::End(e) => close_element(&mut partial, e.local_name().as_ref(), position),
                Event::Text(e) => e
                    .unescape()
                    .map_err(|err| xml_error(position, err))
                    .and_then(|text| push_text(partial.as_mut(), &text, position)),
                Event::CData(e) => std::str::from_utf8(&e)
                    .map_err(|err| xml_error(position, err))
                    .and_then(|text| push_text(partial.as_mut(), text, position)),
                Event::Eof => match partial {
                    Some(_) => Err(xml_error(position, "document ends inside a record")),
                    None => break Ok(None),
                },
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => Ok(None),
            };
            match step {
                Ok(Some(record)) => break Ok(Some(record)),
                Ok(None) => {},
                Err(e) => break Err(e),
            }
        };
        self.offset = start + xml.buffer_position() as u64;

        if let Ok(Some(record)) = &result {
            self.records_read += 1;
            tracing::trace!(
                control_number = record.control_number(),
                offset = start,
                "read MARCXML record"
            );
        }
        result
    }
}

impl<R: BufRead + Seek> MarcXmlReader<R> {
    /// Reposition to `offset`, a value previously returned by [`MarcXmlReader::tell`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the source cannot seek.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.source.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Seek back to the start of the document.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the source cannot seek.
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(0)
    }
}

impl<R: BufRead + Debug> FormatReader for MarcXmlReader<R> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        MarcXmlReader::read_record(self)
    }

    fn records_read(&self) -> Option<usize> {
        Some(self.records_read)
    }

    fn tell(&self) -> u64 {
        self.offset
    }
}

impl<R: BufRead + Seek + Debug> SeekableFormatReader for MarcXmlReader<R> {
    fn seek(&mut self, offset: u64) -> Result<()> {
        MarcXmlReader::seek(self, offset)
    }
}

// The helpers below return `Ok(Some(record))` when `</record>` completes one.

fn open_element(
    partial: &mut Option<PartialRecord>,
    element: &BytesStart<'_>,
    position: u64,
) -> Result<Option<Record>> {
    let name = element.local_name();
    let name = name.as_ref();

    if name == COLLECTION && partial.is_none() {
        check_attributes(element, &[], position)?;
        return Ok(None);
    }
    if name == RECORD {
        if partial.is_some() {
            return Err(xml_error(position, "nested <record>"));
        }
        check_attributes(element, &["type", "id"], position)?;
        *partial = Some(PartialRecord::default());
        return Ok(None);
    }

    let Some(record) = partial.as_mut() else {
        return Err(xml_error(
            position,
            format!("unexpected <{}> outside of a record", lossy(name)),
        ));
    };
    if record.target.is_some() {
        return Err(xml_error(
            position,
            format!("unexpected <{}> inside a text element", lossy(name)),
        ));
    }

    match (name, record.datafield.is_some()) {
        (LEADER, false) => {
            check_attributes(element, &["id"], position)?;
            record.target = Some(TextTarget::Leader);
        },
        (CONTROL_FIELD, false) => {
            check_attributes(element, &["tag", "id"], position)?;
            let tag = tag_attribute(element, position)?;
            record.target = Some(TextTarget::ControlField(tag));
        },
        (DATA_FIELD, false) => {
            check_attributes(element, &["tag", "ind1", "ind2", "id"], position)?;
            record.datafield = Some(OpenDataField {
                tag: tag_attribute(element, position)?,
                indicator1: char_attribute(element, b"ind1", position)?.unwrap_or(' '),
                indicator2: char_attribute(element, b"ind2", position)?.unwrap_or(' '),
                subfields: Subfields::new(),
            });
        },
        (SUBFIELD, true) => {
            check_attributes(element, &["code"], position)?;
            let code = char_attribute(element, b"code", position)?
                .ok_or_else(|| xml_error(position, "<subfield> without code attribute"))?;
            record.target = Some(TextTarget::Subfield(code));
        },
        _ => {
            return Err(xml_error(
                position,
                format!("unexpected element <{}>", lossy(name)),
            ));
        },
    }
    record.text.clear();
    Ok(None)
}

fn close_element(
    partial: &mut Option<PartialRecord>,
    name: &[u8],
    position: u64,
) -> Result<Option<Record>> {
    let Some(record) = partial.as_mut() else {
        return Ok(None);
    };
    let text = std::mem::take(&mut record.text);

    match (name, record.target.take()) {
        (LEADER, Some(TextTarget::Leader)) => {
            let leader: Leader = text.parse().map_err(|e| xml_error(position, e))?;
            record.leader = Some(leader);
        },
        (CONTROL_FIELD, Some(TextTarget::ControlField(tag))) => {
            record.fields.push(Field::control(tag, text));
        },
        (SUBFIELD, Some(TextTarget::Subfield(code))) => {
            if let Some(datafield) = record.datafield.as_mut() {
                datafield.subfields.append_subfield(code, text);
            }
        },
        (DATA_FIELD, None) => {
            if let Some(datafield) = record.datafield.take() {
                record.fields.push(Field::with_subfields(
                    datafield.tag,
                    datafield.indicator1,
                    datafield.indicator2,
                    &datafield.subfields,
                ));
            }
        },
        (RECORD, None) if record.datafield.is_none() => {
            if let Some(finished) = partial.take() {
                let leader = finished
                    .leader
                    .ok_or_else(|| xml_error(position, "record without <leader>"))?;
                return Ok(Some(Record::with_fields(leader, finished.fields)));
            }
        },
        (name, _) => {
            return Err(xml_error(
                position,
                format!("unexpected </{}>", lossy(name)),
            ));
        },
    }
    Ok(None)
}

fn push_text(
    partial: Option<&mut PartialRecord>,
    text: &str,
    position: u64,
) -> Result<Option<Record>> {
    match partial {
        Some(record) if record.target.is_some() => record.text.push_str(text),
        _ if text.trim().is_empty() => {},
        _ => {
            return Err(xml_error(
                position,
                format!("unexpected text {:?}", text.trim()),
            ));
        },
    }
    Ok(None)
}

fn check_attributes(element: &BytesStart<'_>, allowed: &[&str], position: u64) -> Result<()> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| xml_error(position, e))?;
        let key = attribute.key.as_ref();
        if key.starts_with(b"xmlns") || key.contains(&b':') {
            continue;
        }
        if !allowed.iter().any(|name| name.as_bytes() == key) {
            return Err(xml_error(
                position,
                format!(
                    "unexpected attribute {:?} on <{}>",
                    lossy(key),
                    lossy(element.local_name().as_ref())
                ),
            ));
        }
    }
    Ok(())
}

fn attribute_value(element: &BytesStart<'_>, key: &[u8], position: u64) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| xml_error(position, e))?;
        if attribute.key.as_ref() == key {
            let value = attribute
                .unescape_value()
                .map_err(|e| xml_error(position, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn tag_attribute(element: &BytesStart<'_>, position: u64) -> Result<Tag> {
    let value = attribute_value(element, b"tag", position)?
        .ok_or_else(|| xml_error(position, "field without tag attribute"))?;
    Tag::new(&value).map_err(|e| xml_error(position, e))
}

fn char_attribute(element: &BytesStart<'_>, key: &[u8], position: u64) -> Result<Option<char>> {
    let Some(value) = attribute_value(element, key, position)? else {
        return Ok(None);
    };
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Some(c)),
        _ => Err(xml_error(
            position,
            format!("attribute {} must be one character, got {value:?}", lossy(key)),
        )),
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn xml_error(position: u64, message: impl std::fmt::Display) -> MarcError {
    MarcError::Xml {
        position,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const COLLECTION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <marc:record type="Bibliographic">
    <marc:leader>00000nam a2200000   4500</marc:leader>
    <marc:controlfield tag="001">rec-1</marc:controlfield>
    <marc:datafield tag="245" ind1="1" ind2="0">
      <marc:subfield code="a">First &amp; only</marc:subfield>
      <marc:subfield code="c"><![CDATA[<raw>]]></marc:subfield>
    </marc:datafield>
  </marc:record>
  <!-- second record -->
  <marc:record>
    <marc:leader>00000nam a2200000   4500</marc:leader>
    <marc:controlfield tag="001">rec-2</marc:controlfield>
    <marc:datafield tag="500" ind1=" " ind2=" ">
      <marc:subfield code="a"/>
    </marc:datafield>
  </marc:record>
</marc:collection>
"#;

    const LEADER_XML: &str = "<leader>00000nam a2200000   4500</leader>";

    fn reader(xml: &str) -> MarcXmlReader<Cursor<Vec<u8>>> {
        MarcXmlReader::new(Cursor::new(xml.as_bytes().to_vec()))
    }

    #[test]
    fn test_reads_prefixed_collection() {
        let mut reader = reader(COLLECTION_XML);

        let first = reader.read_record().unwrap().unwrap();
        assert_eq!(first.control_number(), "rec-1");
        let title = &first.fields()[1];
        assert_eq!(title.indicator1(), Some('1'));
        assert_eq!(title.first_subfield_value('a'), Some("First & only"));
        assert_eq!(title.first_subfield_value('c'), Some("<raw>"));

        let second = reader.read_record().unwrap().unwrap();
        assert_eq!(second.control_number(), "rec-2");
        assert_eq!(second.fields()[1].first_subfield_value('a'), Some(""));

        assert!(reader.read_record().unwrap().is_none());
        assert!(reader.read_record().unwrap().is_none());
        assert_eq!(reader.records_read(), 2);
    }

    #[test]
    fn test_tell_and_seek_return_to_record() {
        let mut reader = reader(COLLECTION_XML);
        assert_eq!(reader.tell(), 0);
        reader.read_record().unwrap().unwrap();
        let after_first = reader.tell();
        assert!(COLLECTION_XML[..after_first as usize].ends_with("</marc:record>"));

        let second = reader.read_record().unwrap().unwrap();
        reader.seek(after_first).unwrap();
        assert_eq!(reader.read_record().unwrap().unwrap(), second);

        reader.rewind().unwrap();
        assert_eq!(reader.read_record().unwrap().unwrap().control_number(), "rec-1");
    }

    #[test]
    fn test_bare_record() {
        let xml = format!(
            r#"<record>{LEADER_XML}<controlfield tag="001">x</controlfield></record>"#
        );
        let mut reader = reader(&xml);
        assert_eq!(reader.read_record().unwrap().unwrap().control_number(), "x");
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn test_unknown_element_is_rejected() {
        let xml = format!("<collection><record>{LEADER_XML}<note>x</note></record></collection>");
        let err = reader(&xml).read_record().unwrap_err();
        assert!(matches!(err, MarcError::Xml { ref message, .. } if message.contains("note")));
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let xml = format!(
            r#"<record>{LEADER_XML}<controlfield tag="001" color="red">x</controlfield></record>"#
        );
        let err = reader(&xml).read_record().unwrap_err();
        assert!(matches!(err, MarcError::Xml { ref message, .. } if message.contains("color")));
    }

    #[test]
    fn test_record_without_leader() {
        let xml = r#"<record><controlfield tag="001">x</controlfield></record>"#;
        let err = reader(xml).read_record().unwrap_err();
        assert!(err.to_string().contains("leader"));
    }

    #[test]
    fn test_truncated_document() {
        let xml = r#"<collection><record><leader>00000nam a2200000   4500</leader>"#;
        let err = reader(xml).read_record().unwrap_err();
        assert!(err.is_decode_error());
        assert!(err.to_string().contains("inside a record"));
    }

    #[test]
    fn test_bad_indicator_and_tag() {
        let xml = format!(
            r#"<record>{LEADER_XML}<datafield tag="245" ind1="10" ind2=" "></datafield></record>"#
        );
        assert!(reader(&xml).read_record().is_err());

        let xml = format!(r#"<record>{LEADER_XML}<controlfield tag="1">x</controlfield></record>"#);
        assert!(reader(&xml).read_record().is_err());
    }

    #[test]
    fn test_stray_text_is_rejected() {
        let xml = r#"<record>loose<leader>00000nam a2200000   4500</leader></record>"#;
        assert!(reader(xml).read_record().is_err());
    }
}
