//! MARC record leader parsing and manipulation.
//!
//! The MARC leader is a 24-byte fixed-length field at the start of every MARC record.
//! It contains metadata describing the record's structure, content type, and encoding.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Type of record (a = language material, z = authority data, etc.)
//! - Position 7: Bibliographic level (m = monograph, s = serial, etc.)
//! - Position 8: Type of control
//! - Position 9: Character coding scheme (space = MARC-8, a = UTF-8)
//! - Position 10: Indicator count (usually 2)
//! - Position 11: Subfield code count (usually 2)
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Entry map (usually "4500")
//!
//! [`Leader`] keeps the 24 bytes verbatim so that a record read from one
//! source is written back byte for byte.

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a leader in bytes.
pub const LEADER_LENGTH: usize = 24;

/// MARC Leader - 24 bytes at the start of every MARC record.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Leader {
    bytes: [u8; LEADER_LENGTH],
}

/// Type of record (leader position 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeOfRecord {
    /// `a`
    LanguageMaterial,
    /// `c`
    NotatedMusic,
    /// `d`
    ManuscriptNotatedMusic,
    /// `e`
    CartographicMaterial,
    /// `f`
    ManuscriptCartographicMaterial,
    /// `g`
    ProjectedMedium,
    /// `i`
    NonmusicalSoundRecording,
    /// `j`
    MusicalSoundRecording,
    /// `k`
    TwoDimensionalNonprojectableGraphic,
    /// `m`
    ComputerFile,
    /// `o`
    Kit,
    /// `p`
    MixedMaterials,
    /// `q`
    Community,
    /// `r`
    ThreeDimensionalArtifact,
    /// `t`
    ManuscriptLanguageMaterial,
    /// `u`
    UnknownHoldings,
    /// `v`
    MultipartItemHoldings,
    /// `w`
    Classification,
    /// `x`
    SinglePartItemHoldings,
    /// `y`
    SerialItemHoldings,
    /// `z`
    Authority,
}

impl TypeOfRecord {
    /// Decode leader position 6.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'a' => Self::LanguageMaterial,
            'c' => Self::NotatedMusic,
            'd' => Self::ManuscriptNotatedMusic,
            'e' => Self::CartographicMaterial,
            'f' => Self::ManuscriptCartographicMaterial,
            'g' => Self::ProjectedMedium,
            'i' => Self::NonmusicalSoundRecording,
            'j' => Self::MusicalSoundRecording,
            'k' => Self::TwoDimensionalNonprojectableGraphic,
            'm' => Self::ComputerFile,
            'o' => Self::Kit,
            'p' => Self::MixedMaterials,
            'q' => Self::Community,
            'r' => Self::ThreeDimensionalArtifact,
            't' => Self::ManuscriptLanguageMaterial,
            'u' => Self::UnknownHoldings,
            'v' => Self::MultipartItemHoldings,
            'w' => Self::Classification,
            'x' => Self::SinglePartItemHoldings,
            'y' => Self::SerialItemHoldings,
            'z' => Self::Authority,
            _ => return None,
        })
    }

    /// The leader character for this type.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::LanguageMaterial => 'a',
            Self::NotatedMusic => 'c',
            Self::ManuscriptNotatedMusic => 'd',
            Self::CartographicMaterial => 'e',
            Self::ManuscriptCartographicMaterial => 'f',
            Self::ProjectedMedium => 'g',
            Self::NonmusicalSoundRecording => 'i',
            Self::MusicalSoundRecording => 'j',
            Self::TwoDimensionalNonprojectableGraphic => 'k',
            Self::ComputerFile => 'm',
            Self::Kit => 'o',
            Self::MixedMaterials => 'p',
            Self::Community => 'q',
            Self::ThreeDimensionalArtifact => 'r',
            Self::ManuscriptLanguageMaterial => 't',
            Self::UnknownHoldings => 'u',
            Self::MultipartItemHoldings => 'v',
            Self::Classification => 'w',
            Self::SinglePartItemHoldings => 'x',
            Self::SerialItemHoldings => 'y',
            Self::Authority => 'z',
        }
    }
}

/// Bibliographic level (leader position 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BibliographicLevel {
    /// `a`
    MonographicComponentPart,
    /// `b`
    SerialComponentPart,
    /// `c`
    Collection,
    /// `d`
    Subunit,
    /// `i`
    IntegratingResource,
    /// `m`
    MonographOrItem,
    /// `s`
    Serial,
    /// blank, used by authority and holdings records
    Undefined,
}

impl BibliographicLevel {
    /// Decode leader position 7.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'a' => Self::MonographicComponentPart,
            'b' => Self::SerialComponentPart,
            'c' => Self::Collection,
            'd' => Self::Subunit,
            'i' => Self::IntegratingResource,
            'm' => Self::MonographOrItem,
            's' => Self::Serial,
            ' ' => Self::Undefined,
            _ => return None,
        })
    }

    /// The leader character for this level.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::MonographicComponentPart => 'a',
            Self::SerialComponentPart => 'b',
            Self::Collection => 'c',
            Self::Subunit => 'd',
            Self::IntegratingResource => 'i',
            Self::MonographOrItem => 'm',
            Self::Serial => 's',
            Self::Undefined => ' ',
        }
    }
}

/// Broad record category derived from the type of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// Bibliographic description of a resource.
    Bibliographic,
    /// Authority record (names, subjects, ...).
    Authority,
    /// Holdings record.
    Holdings,
    /// Classification record.
    Classification,
    /// Community information record.
    Community,
    /// Leader position 6 holds an unknown code.
    Undefined,
}

impl Leader {
    /// Parse a leader from exactly 24 bytes.
    ///
    /// No position is interpreted here; use [`Leader::record_length`] and
    /// friends to decode individual positions.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not 24 bytes long or holds non-ASCII data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; LEADER_LENGTH] = bytes.try_into().map_err(|_| {
            MarcError::InvalidLeader(format!(
                "Leader must be exactly {LEADER_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        if !bytes.is_ascii() {
            return Err(MarcError::InvalidLeader(format!(
                "Leader contains non-ASCII bytes: {:?}",
                String::from_utf8_lossy(&bytes)
            )));
        }
        Ok(Leader { bytes })
    }

    /// Build the leader of a new, empty record of the given type and level.
    ///
    /// Record length and base address are zero until a writer fills them in;
    /// the coding scheme is UTF-8.
    #[must_use]
    pub fn synthesize(type_of_record: TypeOfRecord, level: BibliographicLevel) -> Self {
        let mut leader = Leader::default();
        leader.bytes[6] = ascii_byte(type_of_record.as_char());
        leader.bytes[7] = ascii_byte(level.as_char());
        leader
    }

    /// The leader as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }

    /// The raw 24 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; LEADER_LENGTH] {
        &self.bytes
    }

    /// Character at `position`, if the position exists.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<char> {
        self.bytes.get(position).map(|&b| char::from(b))
    }

    /// Overwrite one position.
    ///
    /// # Errors
    ///
    /// Returns an error if `position` is out of range or `value` is not a
    /// printable ASCII character or space.
    pub fn set(&mut self, position: usize, value: char) -> Result<()> {
        if !(value.is_ascii_graphic() || value == ' ') {
            return Err(MarcError::InvalidLeader(format!(
                "Leader value {value:?} at position {position} is not printable ASCII"
            )));
        }
        let slot = self.bytes.get_mut(position).ok_or_else(|| {
            MarcError::InvalidLeader(format!("Leader position {position} out of range"))
        })?;
        *slot = ascii_byte(value);
        Ok(())
    }

    /// Record length from positions 0-4, if they are all digits.
    #[must_use]
    pub fn record_length(&self) -> Option<u32> {
        parse_digits(&self.bytes[0..5])
    }

    /// Base address of data from positions 12-16, if they are all digits.
    #[must_use]
    pub fn base_address(&self) -> Option<u32> {
        parse_digits(&self.bytes[12..17])
    }

    /// Record status (position 5).
    #[must_use]
    pub fn record_status(&self) -> char {
        char::from(self.bytes[5])
    }

    /// Type of record code (position 6).
    #[must_use]
    pub fn type_of_record_code(&self) -> char {
        char::from(self.bytes[6])
    }

    /// Decoded type of record.
    #[must_use]
    pub fn type_of_record(&self) -> Option<TypeOfRecord> {
        TypeOfRecord::from_char(self.type_of_record_code())
    }

    /// Bibliographic level code (position 7).
    #[must_use]
    pub fn bibliographic_level_code(&self) -> char {
        char::from(self.bytes[7])
    }

    /// Decoded bibliographic level.
    #[must_use]
    pub fn bibliographic_level(&self) -> Option<BibliographicLevel> {
        BibliographicLevel::from_char(self.bibliographic_level_code())
    }

    /// Character coding scheme (position 9).
    #[must_use]
    pub fn character_coding(&self) -> char {
        char::from(self.bytes[9])
    }

    /// True when position 9 declares UTF-8.
    #[must_use]
    pub fn is_utf8(&self) -> bool {
        self.bytes[9] == b'a'
    }

    /// Broad record category.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self.type_of_record() {
            Some(TypeOfRecord::Authority) => RecordType::Authority,
            Some(TypeOfRecord::Classification) => RecordType::Classification,
            Some(TypeOfRecord::Community) => RecordType::Community,
            Some(
                TypeOfRecord::UnknownHoldings
                | TypeOfRecord::MultipartItemHoldings
                | TypeOfRecord::SinglePartItemHoldings
                | TypeOfRecord::SerialItemHoldings,
            ) => RecordType::Holdings,
            Some(_) => RecordType::Bibliographic,
            None => RecordType::Undefined,
        }
    }

    /// Set the record status (position 5).
    ///
    /// # Errors
    ///
    /// Returns an error if `status` is not printable ASCII.
    pub fn set_record_status(&mut self, status: char) -> Result<()> {
        self.set(5, status)
    }

    /// Set the type of record (position 6).
    pub fn set_type_of_record(&mut self, type_of_record: TypeOfRecord) {
        self.bytes[6] = ascii_byte(type_of_record.as_char());
    }

    /// Set the bibliographic level (position 7).
    pub fn set_bibliographic_level(&mut self, level: BibliographicLevel) {
        self.bytes[7] = ascii_byte(level.as_char());
    }

    /// Copy of this leader with positions 0-4 and 12-16 replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if either number needs more than five digits.
    pub fn with_lengths(&self, record_length: usize, base_address: usize) -> Result<Leader> {
        if record_length > 99_999 || base_address > 99_999 {
            return Err(MarcError::InvalidLeader(format!(
                "Lengths {record_length}/{base_address} do not fit in five digits"
            )));
        }
        let mut leader = self.clone();
        leader.bytes[0..5].copy_from_slice(format!("{record_length:05}").as_bytes());
        leader.bytes[12..17].copy_from_slice(format!("{base_address:05}").as_bytes());
        Ok(leader)
    }
}

impl Default for Leader {
    /// A new UTF-8 language-material monograph leader with zero lengths.
    fn default() -> Self {
        Leader {
            bytes: *b"00000nam a2200000   4500",
        }
    }
}

impl fmt::Debug for Leader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Leader({:?})", self.as_str())
    }
}

impl fmt::Display for Leader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Leader {
    type Err = MarcError;

    fn from_str(s: &str) -> Result<Self> {
        Leader::from_bytes(s.as_bytes())
    }
}

impl TryFrom<String> for Leader {
    type Error = MarcError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Leader> for String {
    fn from(leader: Leader) -> Self {
        leader.as_str().to_string()
    }
}

fn ascii_byte(c: char) -> u8 {
    u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(b' ')
}

fn parse_digits(bytes: &[u8]) -> Option<u32> {
    bytes.iter().try_fold(0u32, |acc, &b| {
        b.is_ascii_digit().then(|| acc * 10 + u32::from(b - b'0'))
    })
}
