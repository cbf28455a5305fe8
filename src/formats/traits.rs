//! Format reader and writer traits for MARC records.
//!
//! Both codecs implement these traits, so pipelines can be written once
//! against `dyn FormatReader` / `dyn FormatWriter` and work on binary and
//! MARCXML files alike.
//!
//! # Example
//!
//! ```
//! use marcrec::formats::{FormatReader, FormatWriter};
//!
//! fn copy_records(
//!     reader: &mut dyn FormatReader,
//!     writer: &mut dyn FormatWriter,
//! ) -> marcrec::Result<usize> {
//!     let mut count = 0;
//!     while let Some(record) = reader.read_record()? {
//!         writer.write_record(&record)?;
//!         count += 1;
//!     }
//!     writer.finish()?;
//!     Ok(count)
//! }
//! ```

use crate::error::Result;
use crate::record::Record;

/// Trait for readers that can produce MARC records from a source.
///
/// Implementations return `Ok(None)` when the source is exhausted and
/// preserve field order, indicators and subfield order exactly.
pub trait FormatReader: std::fmt::Debug {
    /// Read the next record from the source.
    ///
    /// Returns:
    /// - `Ok(Some(record))` if a record was read successfully
    /// - `Ok(None)` if the end of the source was reached
    /// - `Err(_)` if reading failed due to malformed data or I/O errors
    ///
    /// # Errors
    ///
    /// Returns an error if the source contains malformed data or I/O fails.
    fn read_record(&mut self) -> Result<Option<Record>>;

    /// Read all remaining records into a vector.
    ///
    /// For large files, prefer streaming with `read_record` to avoid memory pressure.
    ///
    /// # Errors
    ///
    /// Returns an error if any record fails to read. On error, previously
    /// read records are discarded.
    fn read_all(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Returns the number of records read so far.
    ///
    /// The default implementation returns `None` if tracking is not supported.
    fn records_read(&self) -> Option<usize> {
        None
    }

    /// Byte offset of the next record in the source.
    fn tell(&self) -> u64;
}

/// Readers over seekable sources that can jump back to a reported offset.
pub trait SeekableFormatReader: FormatReader {
    /// Reposition to `offset`, a value previously returned by
    /// [`FormatReader::tell`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot seek.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Seek back to the start of the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying source cannot seek.
    fn rewind(&mut self) -> Result<()> {
        self.seek(0)
    }
}

/// Trait for writers that can serialize MARC records to a format.
///
/// Writers follow a standard pattern:
/// 1. Create the writer with format-specific configuration
/// 2. Write records using [`write_record`](Self::write_record) or
///    [`write_batch`](Self::write_batch)
/// 3. Call [`finish`](Self::finish) to flush and finalize output
pub trait FormatWriter: std::fmt::Debug {
    /// Write a single record to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized (e.g. it exceeds
    /// a length ceiling) or if writing to the underlying output fails.
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Write multiple records to the output.
    ///
    /// The default implementation calls `write_record` for each record.
    ///
    /// # Errors
    ///
    /// Returns an error if any record cannot be written.
    fn write_batch(&mut self, records: &[Record]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Finish writing and flush any buffered data.
    ///
    /// After calling `finish`, the writer rejects further writes.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails or the output cannot be finalized.
    fn finish(&mut self) -> Result<()>;

    /// Returns the number of records written so far.
    ///
    /// The default implementation returns `None` if tracking is not supported.
    fn records_written(&self) -> Option<usize> {
        None
    }
}

impl<T: FormatReader + ?Sized> FormatReader for Box<T> {
    fn read_record(&mut self) -> Result<Option<Record>> {
        (**self).read_record()
    }

    fn records_read(&self) -> Option<usize> {
        (**self).records_read()
    }

    fn tell(&self) -> u64 {
        (**self).tell()
    }
}

impl<T: SeekableFormatReader + ?Sized> SeekableFormatReader for Box<T> {
    fn seek(&mut self, offset: u64) -> Result<()> {
        (**self).seek(offset)
    }
}

impl<T: FormatWriter + ?Sized> FormatWriter for Box<T> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        (**self).write_record(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }

    fn records_written(&self) -> Option<usize> {
        (**self).records_written()
    }
}

/// Extension trait providing iterator-style access for format readers.
///
/// This trait is automatically implemented for all types implementing [`FormatReader`].
pub trait FormatReaderExt: FormatReader {
    /// Create an iterator over records from this reader.
    ///
    /// The iterator yields `Result<Record>` for each record, allowing
    /// error handling during iteration.
    fn records(&mut self) -> RecordIterator<'_, Self>
    where
        Self: Sized,
    {
        RecordIterator { reader: self }
    }
}

impl<T: FormatReader> FormatReaderExt for T {}

/// Iterator adapter for [`FormatReader`].
///
/// Created by the [`records`](FormatReaderExt::records) method.
#[derive(Debug)]
pub struct RecordIterator<'a, R: FormatReader> {
    reader: &'a mut R,
}

impl<R: FormatReader> Iterator for RecordIterator<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}
