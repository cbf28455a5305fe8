//! Multi-format support for MARC records.
//!
//! Binary ISO 2709 and MARCXML readers and writers implement the same
//! traits, allowing format-agnostic code.
//!
//! # Supported Formats
//!
//! | Format | Extensions | Reader / Writer |
//! |--------|------------|-----------------|
//! | ISO 2709 | `mrc`, `marc`, `raw` | [`MarcReader`] / [`MarcWriter`] |
//! | MARCXML | `xml` | [`MarcXmlReader`] / [`MarcXmlWriter`] |
//!
//! # Usage
//!
//! ```no_run
//! use marcrec::formats::{open_reader, open_writer, FormatReader, FormatWriter};
//!
//! let mut reader = open_reader("input.mrc", None)?;
//! let mut writer = open_writer("output.xml", None)?;
//! while let Some(record) = reader.read_record()? {
//!     writer.write_record(&record)?;
//! }
//! writer.finish()?;
//! # Ok::<(), marcrec::MarcError>(())
//! ```

mod traits;

pub use traits::{
    FormatReader, FormatReaderExt, FormatWriter, RecordIterator, SeekableFormatReader,
};

use crate::error::{MarcError, Result};
use crate::marcxml::{MarcXmlReader, MarcXmlWriter, XmlWriterOptions};
use crate::reader::MarcReader;
use crate::writer::MarcWriter;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

/// ISO 2709 binary format support (MARC standard interchange format).
pub mod iso2709 {
    pub use crate::reader::MarcReader as Iso2709Reader;
    pub use crate::writer::MarcWriter as Iso2709Writer;
}

// ============================================================================
// Format Detection and Convenience Functions
// ============================================================================

/// Supported format types for format detection and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// ISO 2709 binary MARC format (`.mrc`, `.marc`, `.raw`)
    Iso2709,
    /// MARCXML (`.xml`)
    MarcXml,
}

impl Format {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    ///
    /// # Example
    ///
    /// ```
    /// use marcrec::formats::Format;
    ///
    /// assert_eq!(Format::from_extension("mrc"), Some(Format::Iso2709));
    /// assert_eq!(Format::from_extension("XML"), Some(Format::MarcXml));
    /// assert_eq!(Format::from_extension("unknown"), None);
    /// ```
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mrc" | "marc" | "raw" => Some(Self::Iso2709),
            "xml" => Some(Self::MarcXml),
            _ => None,
        }
    }

    /// Detect format from the extension of `path`.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Guess the format from the first bytes of a file.
    ///
    /// XML starts with `<` after optional whitespace and byte order mark;
    /// a binary record starts with its five-digit length.
    ///
    /// ```
    /// use marcrec::formats::Format;
    ///
    /// assert_eq!(Format::sniff(b"  <?xml version=\"1.0\"?>"), Some(Format::MarcXml));
    /// assert_eq!(Format::sniff(b"00714cam a2200205 a 4500"), Some(Format::Iso2709));
    /// assert_eq!(Format::sniff(b"%PDF"), None);
    /// ```
    #[must_use]
    pub fn sniff(head: &[u8]) -> Option<Self> {
        let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
        let start = head.iter().position(|b| !b.is_ascii_whitespace())?;
        let head = &head[start..];
        if head.starts_with(b"<") {
            Some(Self::MarcXml)
        } else if head.len() >= 5 && head[..5].iter().all(u8::is_ascii_digit) {
            Some(Self::Iso2709)
        } else {
            None
        }
    }

    /// Determine the format of an existing file, by extension first and
    /// by content otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`MarcError::UnknownFormat`] if neither works, or an I/O
    /// error if the file cannot be read.
    pub fn detect(path: &Path) -> Result<Self> {
        if let Some(format) = Self::from_path(path) {
            return Ok(format);
        }
        let mut head = Vec::with_capacity(64);
        File::open(path)?.take(64).read_to_end(&mut head)?;
        let format = Self::sniff(&head)
            .ok_or_else(|| MarcError::UnknownFormat(path.display().to_string()))?;
        tracing::debug!(path = %path.display(), %format, "detected format from content");
        Ok(format)
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Iso2709 => "mrc",
            Self::MarcXml => "xml",
        }
    }

    /// Get the human-readable name for this format.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Iso2709 => "ISO 2709",
            Self::MarcXml => "MARCXML",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Open a file for reading in the given format, or the detected one.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its format cannot be
/// determined.
pub fn open_reader(
    path: impl AsRef<Path>,
    format: Option<Format>,
) -> Result<Box<dyn SeekableFormatReader>> {
    let path = path.as_ref();
    let format = match format {
        Some(format) => format,
        None => Format::detect(path)?,
    };
    let source = BufReader::new(File::open(path)?);
    tracing::debug!(path = %path.display(), %format, "opened reader");
    let reader: Box<dyn SeekableFormatReader> = match format {
        Format::Iso2709 => Box::new(MarcReader::new(source)),
        Format::MarcXml => Box::new(MarcXmlReader::new(source)),
    };
    Ok(reader)
}

/// Create a file for writing in the given format, or the one implied by
/// its extension.
///
/// # Errors
///
/// Returns an error if the format cannot be determined from the extension
/// or the file cannot be created.
pub fn open_writer(
    path: impl AsRef<Path>,
    format: Option<Format>,
) -> Result<Box<dyn FormatWriter>> {
    let path = path.as_ref();
    let format = format
        .or_else(|| Format::from_path(path))
        .ok_or_else(|| MarcError::UnknownFormat(path.display().to_string()))?;
    let sink = BufWriter::new(File::create(path)?);
    tracing::debug!(path = %path.display(), %format, "opened writer");
    let writer: Box<dyn FormatWriter> = match format {
        Format::Iso2709 => Box::new(MarcWriter::new(sink)),
        Format::MarcXml => Box::new(MarcXmlWriter::with_options(sink, XmlWriterOptions::default())),
    };
    Ok(writer)
}
