//! Fields: a tag plus raw content.
//!
//! A [`Field`] stores its content exactly as it appears in the binary
//! format, minus the field terminator:
//!
//! - control fields (`001`-`009`) hold opaque text,
//! - data fields hold two indicators followed by delimited subfields,
//! - local fields (`LOK`) are data fields whose first subfield, code `0`,
//!   carries a local tag and two local indicators, e.g. `␟0852 1␟aXY`.
//!
//! Content read from binary input that is not valid UTF-8 is exposed as
//! lossily decoded text, while the original bytes are kept and written back
//! unchanged until the content is edited.

use crate::error::{MarcError, Result};
use crate::subfields::{RawSubfields, Subfields, SUBFIELD_DELIMITER};
use crate::tag::{Tag, TAG_LENGTH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tags of fields that link to other records through subfield `w`.
pub const CROSS_LINK_FIELD_TAGS: [&str; 10] = [
    "765", "767", "770", "772", "773", "775", "776", "780", "785", "787",
];

/// Subfield code that carries the local tag of a `LOK` field.
pub const LOCAL_TAG_SUBFIELD_CODE: char = '0';

// indicators + delimiter + code
const LOCAL_TAG_START: usize = 4;

/// A field in a MARC record.
///
/// Equality and ordering look at the tag first and then at the raw content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field {
    tag: Tag,
    contents: String,
    // undecoded content when `contents` is a lossy decoding of it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw: Option<Box<[u8]>>,
}

impl Field {
    /// Create a field from a tag and raw content.
    pub fn new(tag: Tag, contents: impl Into<String>) -> Self {
        Field {
            tag,
            contents: contents.into(),
            raw: None,
        }
    }

    /// Create a field from content bytes as found in the binary format.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD in [`Field::contents`]; the
    /// bytes themselves are kept for [`Field::as_bytes`].
    ///
    /// # Examples
    ///
    /// ```
    /// use marcrec::{Field, Tag};
    ///
    /// let field = Field::from_bytes(Tag::new("245")?, b"10\x1faCaf\xe9");
    /// assert_eq!(field.contents(), "10\u{1f}aCaf\u{fffd}");
    /// assert_eq!(field.as_bytes(), b"10\x1faCaf\xe9");
    /// assert!(field.has_undecodable_bytes());
    /// # Ok::<(), marcrec::MarcError>(())
    /// ```
    #[must_use]
    pub fn from_bytes(tag: Tag, bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Field::new(tag, text),
            Err(_) => Field {
                tag,
                contents: String::from_utf8_lossy(bytes).into_owned(),
                raw: Some(bytes.into()),
            },
        }
    }

    /// Create a control field.
    pub fn control(tag: Tag, value: impl Into<String>) -> Self {
        Field::new(tag, value)
    }

    /// Create a data field from indicators and `(code, value)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use marcrec::{Field, Tag};
    ///
    /// let field = Field::data(Tag::new("245")?, '1', '0', [('a', "Example Title")]);
    /// assert_eq!(field.contents(), "10\u{1f}aExample Title");
    /// # Ok::<(), marcrec::MarcError>(())
    /// ```
    pub fn data<I, S>(tag: Tag, indicator1: char, indicator2: char, subfields: I) -> Self
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        let subfields: Subfields = subfields.into_iter().collect();
        Field::with_subfields(tag, indicator1, indicator2, &subfields)
    }

    /// Create a data field from indicators and a [`Subfields`] list.
    #[must_use]
    pub fn with_subfields(
        tag: Tag,
        indicator1: char,
        indicator2: char,
        subfields: &Subfields,
    ) -> Self {
        let mut contents = String::new();
        contents.push(indicator1);
        contents.push(indicator2);
        contents.push_str(&subfields.to_contents());
        Field {
            tag,
            contents,
            raw: None,
        }
    }

    /// Create a `LOK` field carrying `local_tag` and two local indicators.
    ///
    /// # Examples
    ///
    /// ```
    /// use marcrec::{Field, Tag};
    ///
    /// let field = Field::local(Tag::new("852")?, '1', ' ', [('a', "DE-21")]);
    /// assert!(field.is_local());
    /// assert_eq!(field.local_tag(), Some(Tag::new("852")?));
    /// assert_eq!(field.local_indicator1(), Some('1'));
    /// # Ok::<(), marcrec::MarcError>(())
    /// ```
    pub fn local<I, S>(local_tag: Tag, indicator1: char, indicator2: char, payload: I) -> Self
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        let mut subfields = Subfields::new();
        subfields.append_subfield(
            LOCAL_TAG_SUBFIELD_CODE,
            format!("{local_tag}{indicator1}{indicator2}"),
        );
        for (code, value) in payload {
            subfields.append_subfield(code, value);
        }
        Field::with_subfields(Tag::LOCAL, ' ', ' ', &subfields)
    }

    /// The field's tag.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Change the field's tag.
    pub fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }

    /// Raw content without the field terminator.
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Content bytes as written in the binary format.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_deref().unwrap_or(self.contents.as_bytes())
    }

    /// True if the content was read from bytes that are not valid UTF-8.
    #[must_use]
    pub fn has_undecodable_bytes(&self) -> bool {
        self.raw.is_some()
    }

    /// Replace the raw content.
    pub fn set_contents(&mut self, contents: impl Into<String>) {
        self.contents = contents.into();
        self.raw = None;
    }

    /// Consume the field, returning its raw content.
    #[must_use]
    pub fn into_contents(self) -> String {
        self.contents
    }

    /// Bytes the field occupies in the binary format, terminator included.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        self.as_bytes().len() + 1
    }

    /// True for tags `001`-`009`.
    #[must_use]
    pub fn is_control_field(&self) -> bool {
        self.tag.is_control_tag()
    }

    /// True for fields with indicators and subfields.
    #[must_use]
    pub fn is_data_field(&self) -> bool {
        !self.is_control_field()
    }

    /// True for `LOK` fields.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.tag.is_local_tag()
    }

    /// True if the tag is one of [`CROSS_LINK_FIELD_TAGS`].
    #[must_use]
    pub fn is_cross_link_field(&self) -> bool {
        CROSS_LINK_FIELD_TAGS.contains(&self.tag.as_str())
    }

    /// Control numbers referenced by a cross-link field.
    ///
    /// These are the `w` subfields with any leading `(ISIL)` prefix removed.
    /// Empty for every other field.
    #[must_use]
    pub fn cross_link_targets(&self) -> Vec<&str> {
        if !self.is_cross_link_field() {
            return Vec::new();
        }
        RawSubfields::from_contents(&self.contents)
            .filter(|(code, _)| *code == 'w')
            .map(|(_, value)| strip_isil_prefix(value))
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// First indicator; `None` for control fields.
    #[must_use]
    pub fn indicator1(&self) -> Option<char> {
        self.indicator(0)
    }

    /// Second indicator; `None` for control fields.
    #[must_use]
    pub fn indicator2(&self) -> Option<char> {
        self.indicator(1)
    }

    fn indicator(&self, index: usize) -> Option<char> {
        if self.is_control_field() {
            return None;
        }
        self.contents
            .chars()
            .nth(index)
            .filter(|&c| c != SUBFIELD_DELIMITER)
    }

    /// Set the first indicator.
    ///
    /// # Errors
    ///
    /// Returns an error for control fields.
    pub fn set_indicator1(&mut self, indicator: char) -> Result<()> {
        let indicator2 = self.indicator2().unwrap_or(' ');
        self.set_indicators(indicator, indicator2)
    }

    /// Set the second indicator.
    ///
    /// # Errors
    ///
    /// Returns an error for control fields.
    pub fn set_indicator2(&mut self, indicator: char) -> Result<()> {
        let indicator1 = self.indicator1().unwrap_or(' ');
        self.set_indicators(indicator1, indicator)
    }

    /// Set both indicators, keeping the subfields.
    ///
    /// # Errors
    ///
    /// Returns an error for control fields.
    pub fn set_indicators(&mut self, indicator1: char, indicator2: char) -> Result<()> {
        self.ensure_data_field("set indicators")?;
        let mut contents = String::with_capacity(self.contents.len() + 2);
        contents.push(indicator1);
        contents.push(indicator2);
        contents.push_str(self.subfield_area());
        self.contents = contents;
        Ok(())
    }

    /// A parsed copy of the subfields; empty for control fields.
    #[must_use]
    pub fn subfields(&self) -> Subfields {
        if self.is_control_field() {
            return Subfields::new();
        }
        Subfields::from_contents(&self.contents)
    }

    /// Replace the subfields, keeping the indicators.
    ///
    /// # Errors
    ///
    /// Returns an error for control fields.
    pub fn set_subfields(&mut self, subfields: &Subfields) -> Result<()> {
        self.ensure_data_field("set subfields")?;
        let indicator1 = self.indicator1().unwrap_or(' ');
        let indicator2 = self.indicator2().unwrap_or(' ');
        *self = Field::with_subfields(self.tag, indicator1, indicator2, subfields);
        Ok(())
    }

    /// First value of subfield `code` without copying the subfield list.
    #[must_use]
    pub fn first_subfield_value(&self, code: char) -> Option<&str> {
        if self.is_control_field() {
            return None;
        }
        RawSubfields::from_contents(&self.contents)
            .find(|(c, _)| *c == code)
            .map(|(_, value)| value)
    }

    /// True if the field has a subfield with `code`.
    #[must_use]
    pub fn has_subfield(&self, code: char) -> bool {
        self.first_subfield_value(code).is_some()
    }

    /// Local tag of a `LOK` field, read from its first subfield.
    #[must_use]
    pub fn local_tag(&self) -> Option<Tag> {
        let bytes = self.local_header()?;
        Tag::from_bytes(&bytes[LOCAL_TAG_START..LOCAL_TAG_START + TAG_LENGTH]).ok()
    }

    /// First local indicator of a `LOK` field.
    #[must_use]
    pub fn local_indicator1(&self) -> Option<char> {
        self.local_header()
            .map(|bytes| char::from(bytes[LOCAL_TAG_START + TAG_LENGTH]))
    }

    /// Second local indicator of a `LOK` field.
    #[must_use]
    pub fn local_indicator2(&self) -> Option<char> {
        self.local_header()
            .map(|bytes| char::from(bytes[LOCAL_TAG_START + TAG_LENGTH + 1]))
    }

    /// The `LOK` header bytes (indicators, `␟0`, local tag, local indicators).
    fn local_header(&self) -> Option<&[u8]> {
        if !self.is_local() {
            return None;
        }
        let bytes = self.contents.as_bytes();
        let header_len = LOCAL_TAG_START + TAG_LENGTH + 2;
        let well_formed = bytes.len() >= header_len
            && bytes[2] == SUBFIELD_DELIMITER as u8
            && bytes[3] == LOCAL_TAG_SUBFIELD_CODE as u8
            && bytes[LOCAL_TAG_START..header_len].is_ascii();
        well_formed.then(|| &bytes[..header_len])
    }

    /// Content after the indicators that are present, which may be fewer
    /// than two when the content starts with a delimiter.
    fn subfield_area(&self) -> &str {
        let start = self
            .contents
            .char_indices()
            .take(2)
            .take_while(|&(_, c)| c != SUBFIELD_DELIMITER)
            .last()
            .map_or(0, |(index, c)| index + c.len_utf8());
        &self.contents[start..]
    }

    fn ensure_data_field(&self, operation: &str) -> Result<()> {
        if self.is_control_field() {
            return Err(MarcError::InvalidField(format!(
                "Cannot {operation} on control field {}",
                self.tag
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Field {
    /// Line-oriented form: `245 10$aTitle` or `001 12345`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_control_field() {
            return write!(f, "{} {}", self.tag, self.contents);
        }
        write!(
            f,
            "{} {}{}{}",
            self.tag,
            self.indicator1().unwrap_or(' '),
            self.indicator2().unwrap_or(' '),
            self.subfields()
        )
    }
}

fn strip_isil_prefix(value: &str) -> &str {
    match (value.starts_with('('), value.find(')')) {
        (true, Some(close)) => &value[close + 1..],
        _ => value,
    }
}
