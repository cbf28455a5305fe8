use super::MARCXML_NAMESPACE;
use crate::error::{MarcError, Result};
use crate::field::Field;
use crate::formats::FormatWriter;
use crate::record::Record;
use crate::subfields::SUBFIELD_DELIMITER;
use crate::tag::Tag;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::fmt::Debug;
use std::io::Write;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// How subfield text is transformed on the way out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextConversion {
    /// Write values exactly as stored.
    #[default]
    Unconverted,
    /// Normalize to Unicode NFC.
    ComposeUnicode,
    /// Decompose and drop combining marks, so `Müller` becomes `Muller`.
    AsciiTransliterate,
}

impl TextConversion {
    /// Apply the conversion to one value.
    ///
    /// ```
    /// use marcrec::marcxml::TextConversion;
    ///
    /// let decomposed = "Mu\u{308}ller";
    /// assert_eq!(TextConversion::ComposeUnicode.apply(decomposed), "Müller");
    /// assert_eq!(TextConversion::AsciiTransliterate.apply("Müller"), "Muller");
    /// assert_eq!(TextConversion::Unconverted.apply(decomposed), decomposed);
    /// ```
    #[must_use]
    pub fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            TextConversion::Unconverted => Cow::Borrowed(value),
            TextConversion::ComposeUnicode => Cow::Owned(value.nfc().collect()),
            TextConversion::AsciiTransliterate => {
                Cow::Owned(value.nfd().filter(|c| !is_combining_mark(*c)).collect())
            },
        }
    }
}

/// Output options for [`MarcXmlWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmlWriterOptions {
    /// Spaces per nesting level; 0 writes everything on one line.
    pub indent: usize,
    /// Conversion applied to subfield values.
    pub text_conversion: TextConversion,
}

impl XmlWriterOptions {
    /// Set the indentation width.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Set the subfield text conversion.
    #[must_use]
    pub fn with_text_conversion(mut self, text_conversion: TextConversion) -> Self {
        self.text_conversion = text_conversion;
        self
    }
}

/// Streaming MARCXML writer.
///
/// The XML declaration and the opening `<collection>` are written together
/// with the first record; [`MarcXmlWriter::finish`] closes the collection.
/// A writer dropped without `finish` closes the collection on a best-effort
/// basis, ignoring errors.
pub struct MarcXmlWriter<W: Write> {
    writer: Writer<W>,
    options: XmlWriterOptions,
    started: bool,
    finished: bool,
    records_written: usize,
}

impl<W: Write> MarcXmlWriter<W> {
    /// Create a writer with default options.
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, XmlWriterOptions::default())
    }

    /// Create a writer with the given options.
    pub fn with_options(sink: W, options: XmlWriterOptions) -> Self {
        let writer = if options.indent > 0 {
            Writer::new_with_indent(sink, b' ', options.indent)
        } else {
            Writer::new(sink)
        };
        MarcXmlWriter {
            writer,
            options,
            started: false,
            finished: false,
            records_written: 0,
        }
    }

    /// The options this writer was created with.
    #[must_use]
    pub fn options(&self) -> &XmlWriterOptions {
        &self.options
    }

    /// Returns the number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Write one `<record>` element.
    ///
    /// Field content is written exactly as stored. Data fields must consist
    /// of two indicators followed by delimited subfields, each with a code.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::NotRepresentableInXml`] before writing anything
    /// if a field does not have that shape, holds characters XML 1.0 does not
    /// allow, or carries bytes that are not valid UTF-8.
    /// Returns [`MarcError::WriterFinished`] after [`MarcXmlWriter::finish`],
    /// or an error if the sink fails.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MarcError::WriterFinished);
        }
        let layout = xml_layout(record).map_err(|reason| {
            tracing::warn!(
                control_number = record.control_number(),
                reason = %reason,
                "rejected MARCXML record"
            );
            MarcError::NotRepresentableInXml {
                control_number: record.control_number().to_string(),
                reason,
            }
        })?;
        if !self.started {
            self.start_collection()?;
        }

        self.event(Event::Start(BytesStart::new("record")))?;
        self.text_element(BytesStart::new("leader"), record.leader().as_str())?;
        for field in layout {
            self.write_field(field)?;
        }
        self.event(Event::End(BytesEnd::new("record")))?;

        self.records_written += 1;
        tracing::trace!(control_number = record.control_number(), "wrote MARCXML record");
        Ok(())
    }

    /// Close the collection and flush the sink.
    ///
    /// An empty collection is written if no record was. Calling `finish`
    /// again has no effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        if !self.started {
            self.start_collection()?;
        }
        self.finished = true;
        self.close_collection()?;
        tracing::debug!(records = self.records_written, "finished MARCXML collection");
        Ok(())
    }

    fn start_collection(&mut self) -> Result<()> {
        self.started = true;
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut collection = BytesStart::new("collection");
        collection.push_attribute(("xmlns", MARCXML_NAMESPACE));
        self.event(Event::Start(collection))
    }

    fn close_collection(&mut self) -> Result<()> {
        self.event(Event::End(BytesEnd::new("collection")))?;
        if self.options.indent > 0 {
            self.writer.get_mut().write_all(b"\n")?;
        }
        self.writer.get_mut().flush()?;
        Ok(())
    }

    fn write_field(&mut self, field: XmlField<'_>) -> Result<()> {
        let (tag, indicators, subfields) = match field {
            XmlField::Control { tag, value } => {
                let mut element = BytesStart::new("controlfield");
                element.push_attribute(("tag", tag.as_str()));
                return self.text_element(element, value);
            },
            XmlField::Data {
                tag,
                indicators,
                subfields,
            } => (tag, indicators, subfields),
        };

        let indicator1 = indicators.0.to_string();
        let indicator2 = indicators.1.to_string();
        let mut element = BytesStart::new("datafield");
        element.push_attribute(("tag", tag.as_str()));
        element.push_attribute(("ind1", indicator1.as_str()));
        element.push_attribute(("ind2", indicator2.as_str()));
        self.event(Event::Start(element))?;

        let conversion = self.options.text_conversion;
        for (code, value) in subfields {
            let code = code.to_string();
            let mut element = BytesStart::new("subfield");
            element.push_attribute(("code", code.as_str()));
            self.text_element(element, &conversion.apply(value))?;
        }
        self.event(Event::End(BytesEnd::new("datafield")))
    }

    fn text_element(&mut self, element: BytesStart<'_>, text: &str) -> Result<()> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        self.event(Event::Start(element))?;
        // a text event, even an empty one, keeps the end tag on the same line
        self.event(Event::Text(BytesText::new(text)))?;
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(|e| {
            MarcError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })
    }
}

/// A field split into the parts MARCXML has elements and attributes for.
enum XmlField<'a> {
    Control {
        tag: Tag,
        value: &'a str,
    },
    Data {
        tag: Tag,
        indicators: (char, char),
        subfields: Vec<(char, &'a str)>,
    },
}

fn xml_layout(record: &Record) -> std::result::Result<Vec<XmlField<'_>>, String> {
    check_xml_text("leader", record.leader().as_str())?;
    record.fields().iter().map(split_field).collect()
}

/// Split a field without normalizing anything; an error names what MARCXML
/// cannot express.
fn split_field(field: &Field) -> std::result::Result<XmlField<'_>, String> {
    let tag = field.tag();
    if field.has_undecodable_bytes() {
        return Err(format!("field {tag} holds bytes that are not valid UTF-8"));
    }
    let contents = field.contents();
    if field.is_control_field() {
        check_xml_text(&format!("field {tag}"), contents)?;
        return Ok(XmlField::Control {
            tag,
            value: contents,
        });
    }

    let mut chars = contents.chars();
    let indicators = match (chars.next(), chars.next()) {
        (Some(i1), Some(i2)) if i1 != SUBFIELD_DELIMITER && i2 != SUBFIELD_DELIMITER => (i1, i2),
        _ => return Err(format!("field {tag} lacks its two indicators: {contents:?}")),
    };
    if let Some(c) = [indicators.0, indicators.1].into_iter().find(|&c| !is_xml_char(c)) {
        return Err(format!("indicator {c:?} of field {tag} is not allowed in XML 1.0"));
    }

    let rest = chars.as_str();
    let mut subfields = Vec::new();
    if !rest.is_empty() {
        let Some(rest) = rest.strip_prefix(SUBFIELD_DELIMITER) else {
            return Err(format!("field {tag} has text before its first subfield: {contents:?}"));
        };
        for chunk in rest.split(SUBFIELD_DELIMITER) {
            let mut chunk_chars = chunk.chars();
            let Some(code) = chunk_chars.next() else {
                return Err(format!("field {tag} has a delimiter without a subfield code"));
            };
            let value = chunk_chars.as_str();
            let context = format!("subfield {code:?} of field {tag}");
            check_xml_text(&context, &format!("{code}{value}"))?;
            subfields.push((code, value));
        }
    }
    Ok(XmlField::Data {
        tag,
        indicators,
        subfields,
    })
}

fn check_xml_text(context: &str, text: &str) -> std::result::Result<(), String> {
    match text.chars().find(|&c| !is_xml_char(c)) {
        Some(c) => Err(format!("{context} contains {c:?}, which XML 1.0 does not allow")),
        None => Ok(()),
    }
}

/// The XML 1.0 `Char` production; surrogates cannot occur in a `char`.
fn is_xml_char(c: char) -> bool {
    !matches!(
        c,
        '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}'
    )
}

impl<W: Write> Debug for MarcXmlWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarcXmlWriter")
            .field("options", &self.options)
            .field("started", &self.started)
            .field("finished", &self.finished)
            .field("records_written", &self.records_written)
            .finish_non_exhaustive()
    }
}

impl<W: Write> Drop for MarcXmlWriter<W> {
    fn drop(&mut self) {
        if self.started && !self.finished {
            self.finished = true;
            if let Err(e) = self.close_collection() {
                tracing::warn!(error = %e, "could not close MARCXML collection on drop");
            }
        }
    }
}

impl<W: Write> FormatWriter for MarcXmlWriter<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        MarcXmlWriter::write_record(self, record)
    }

    fn finish(&mut self) -> Result<()> {
        MarcXmlWriter::finish(self)
    }

    fn records_written(&self) -> Option<usize> {
        Some(self.records_written)
    }
}
