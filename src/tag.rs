//! Three-character field tags.
//!
//! A [`Tag`] identifies a field inside a record. Tags order like their
//! string form; internally the three bytes are packed into the high bytes
//! of a big-endian `u32`, which makes sorting and range scans cheap.

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Length of every tag in bytes.
pub const TAG_LENGTH: usize = 3;

/// Tags that may occur at most once per record. Sorted.
const NON_REPEATABLE_TAGS: [&str; 33] = [
    "001", "003", "005", "008", "010", "018", "036", "038", "040", "042", "043", "044", "045",
    "066", "100", "110", "111", "130", "240", "243", "245", "254", "256", "263", "306", "357",
    "384", "507", "514", "841", "842", "844", "882",
];

/// A field tag such as `001`, `245` or `LOK`.
///
/// # Examples
///
/// ```
/// use marcrec::Tag;
///
/// let title = Tag::new("245")?;
/// assert!(!title.is_control_tag());
/// assert!(Tag::new("008")? < title);
/// assert!(Tag::new("24").is_err());
/// # Ok::<(), marcrec::MarcError>(())
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag {
    bytes: [u8; TAG_LENGTH],
}

impl Tag {
    /// Tag of the control number field.
    pub const CONTROL_NUMBER: Tag = Tag::literal(*b"001");
    /// Outer tag of local (per-holding) fields.
    pub const LOCAL: Tag = Tag::literal(*b"LOK");
    /// Local tag that opens a local data block.
    pub const LOCAL_BLOCK_START: Tag = Tag::literal(*b"000");
    /// Local tag that must follow the block start.
    pub const LOCAL_BLOCK_CONTROL_NUMBER: Tag = Tag::literal(*b"001");
    /// Highest control-field tag.
    pub const LAST_CONTROL_TAG: Tag = Tag::literal(*b"009");

    const fn literal(bytes: [u8; TAG_LENGTH]) -> Self {
        Tag { bytes }
    }

    /// Create a tag from a three-character string.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidTag`] unless `tag` is exactly three
    /// printable ASCII characters.
    pub fn new(tag: &str) -> Result<Self> {
        Self::from_bytes(tag.as_bytes()).map_err(|_| MarcError::InvalidTag(tag.to_string()))
    }

    /// Create a tag from raw bytes, e.g. a directory entry.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::InvalidTag`] unless `bytes` holds exactly three
    /// printable ASCII characters.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [a, b, c] if bytes.iter().all(u8::is_ascii_graphic) => Ok(Tag {
                bytes: [*a, *b, *c],
            }),
            _ => Err(MarcError::InvalidTag(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }

    #[inline]
    fn packed(self) -> u32 {
        u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], 0])
    }

    /// The tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    /// The raw tag bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True for tags up to and including `009`.
    #[must_use]
    pub fn is_control_tag(&self) -> bool {
        *self <= Self::LAST_CONTROL_TAG
    }

    /// True for the reserved local field tag `LOK`.
    #[must_use]
    pub fn is_local_tag(&self) -> bool {
        *self == Self::LOCAL
    }

    /// True if all three characters are ASCII digits.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.bytes.iter().all(u8::is_ascii_digit)
    }

    /// True if the tag contains the digit `9`.
    ///
    /// Such tags are reserved for locally defined data.
    #[must_use]
    pub fn contains_nine(&self) -> bool {
        self.bytes.contains(&b'9')
    }

    /// False for tags that may occur at most once per record.
    ///
    /// ```
    /// use marcrec::Tag;
    ///
    /// assert!(!Tag::new("245")?.is_repeatable());
    /// assert!(Tag::new("650")?.is_repeatable());
    /// # Ok::<(), marcrec::MarcError>(())
    /// ```
    #[must_use]
    pub fn is_repeatable(&self) -> bool {
        NON_REPEATABLE_TAGS.binary_search(&self.as_str()).is_err()
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.packed().cmp(&other.packed())
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.as_str())
    }
}

impl FromStr for Tag {
    type Err = MarcError;

    fn from_str(s: &str) -> Result<Self> {
        Tag::new(s)
    }
}

impl TryFrom<&str> for Tag {
    type Error = MarcError;

    fn try_from(value: &str) -> Result<Self> {
        Tag::new(value)
    }
}

impl TryFrom<String> for Tag {
    type Error = MarcError;

    fn try_from(value: String) -> Result<Self> {
        Tag::new(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.as_str().to_string()
    }
}

impl PartialEq<str> for Tag {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for Tag {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(Tag::new("").is_err());
        assert!(Tag::new("24").is_err());
        assert!(Tag::new("2450").is_err());
        assert!(matches!(Tag::new("24"), Err(MarcError::InvalidTag(t)) if t == "24"));
    }

    #[test]
    fn test_rejects_non_printable() {
        assert!(Tag::new("2 5").is_err());
        assert!(Tag::new("24\u{1f}").is_err());
        assert!(Tag::new("2é").is_err());
    }

    #[test]
    fn test_ordering_matches_strings() {
        let mut tags: Vec<Tag> = ["LOK", "245", "001", "00A", "009", "100", "035"]
            .iter()
            .map(|s| tag(s))
            .collect();
        tags.sort();
        let as_strings: Vec<&str> = tags.iter().map(Tag::as_str).collect();
        assert_eq!(
            as_strings,
            vec!["001", "009", "00A", "035", "100", "245", "LOK"]
        );
    }

    #[test]
    fn test_control_tag_threshold() {
        assert!(tag("001").is_control_tag());
        assert!(tag("009").is_control_tag());
        assert!(!tag("00A").is_control_tag());
        assert!(!tag("010").is_control_tag());
        assert!(!tag("LOK").is_control_tag());
    }

    #[test]
    fn test_local_and_numeric_predicates() {
        assert!(tag("LOK").is_local_tag());
        assert!(!tag("852").is_local_tag());
        assert!(tag("852").is_numeric());
        assert!(!tag("LOK").is_numeric());
        assert!(tag("590").contains_nine());
        assert!(!tag("245").contains_nine());
    }

    #[test]
    fn test_repeatability() {
        assert!(!tag("001").is_repeatable());
        assert!(!tag("100").is_repeatable());
        assert!(!tag("882").is_repeatable());
        assert!(tag("020").is_repeatable());
        assert!(tag("700").is_repeatable());
        assert!(tag("LOK").is_repeatable());
        assert!(NON_REPEATABLE_TAGS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_string_roundtrip() {
        let t = tag("650");
        assert_eq!(t.to_string(), "650");
        assert_eq!(t, "650");
        assert_eq!("650".parse::<Tag>().unwrap(), t);
        assert_eq!(String::from(t), "650");
        assert_eq!(format!("{t:?}"), "Tag(650)");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&tag("245")).unwrap();
        assert_eq!(json, "\"245\"");
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag("245"));
        assert!(serde_json::from_str::<Tag>("\"24\"").is_err());
    }
}
