//! Addressing of local data blocks.
//!
//! Local (per-holding) data is stored as a run of `LOK` fields at the end of
//! a record. Each field names a local tag in its first subfield; a field
//! with local tag `000` opens a block, which runs until the next block start
//! or the first non-`LOK` field. Blocks are never materialised as a tree:
//! the methods here compute block starts and half-open ranges on demand.
//!
//! # Examples
//!
//! ```
//! use marcrec::{Field, Record, Tag};
//!
//! let mut record = Record::default();
//! for library in ["DE-21", "DE-15"] {
//!     record.append_field(Field::local(Tag::new("000")?, ' ', ' ', [('a', "block")]));
//!     record.append_field(Field::local(Tag::new("001")?, ' ', ' ', [('a', "123")]));
//!     record.append_field(Field::local(Tag::new("852")?, ' ', ' ', [('a', library)]));
//! }
//!
//! let starts = record.find_start_of_all_local_data_blocks();
//! assert_eq!(starts, [0, 3]);
//! let range = record.get_local_tag_range(Tag::new("852")?, starts[1]);
//! assert_eq!(record[range.start].subfields().first_value('a'), Some("DE-15"));
//! # Ok::<(), marcrec::MarcError>(())
//! ```

use crate::record::Record;
use crate::tag::Tag;
use std::ops::Range;

impl Record {
    /// Indices of every field whose local tag is `000`.
    #[must_use]
    pub fn find_start_of_all_local_data_blocks(&self) -> Vec<usize> {
        self.iter()
            .enumerate()
            .filter(|(_, field)| field.local_tag() == Some(Tag::LOCAL_BLOCK_START))
            .map(|(index, _)| index)
            .collect()
    }

    /// Half-open range of the block that starts at `block_start`.
    ///
    /// The range ends at the next block start or at the first field that is
    /// not a `LOK` field, whichever comes first. It is empty if `block_start`
    /// is out of bounds.
    #[must_use]
    pub fn local_block_range(&self, block_start: usize) -> Range<usize> {
        if block_start >= self.len() {
            return self.len()..self.len();
        }
        let end = self.fields()[block_start + 1..]
            .iter()
            .position(|field| {
                !field.is_local() || field.local_tag() == Some(Tag::LOCAL_BLOCK_START)
            })
            .map_or(self.len(), |offset| block_start + 1 + offset);
        block_start..end
    }

    /// Ranges of all local blocks, in record order.
    #[must_use]
    pub fn local_block_ranges(&self) -> Vec<Range<usize>> {
        self.find_start_of_all_local_data_blocks()
            .into_iter()
            .map(|start| self.local_block_range(start))
            .collect()
    }

    /// Half-open range of the run of fields with `local_tag` inside the
    /// block starting at `block_start`.
    ///
    /// If the block has no such field the range is empty and sits at the
    /// end of the block.
    #[must_use]
    pub fn get_local_tag_range(&self, local_tag: Tag, block_start: usize) -> Range<usize> {
        let block = self.local_block_range(block_start);
        let fields = &self.fields()[block.clone()];
        let Some(first) = fields
            .iter()
            .position(|field| field.local_tag() == Some(local_tag))
        else {
            return block.end..block.end;
        };
        let run = fields[first..]
            .iter()
            .take_while(|field| field.local_tag() == Some(local_tag))
            .count();
        block.start + first..block.start + first + run
    }

    /// Indices of the fields in the block starting at `block_start` that
    /// carry `local_tag` and the given local indicators. `None` matches any
    /// indicator.
    #[must_use]
    pub fn find_fields_in_local_block(
        &self,
        local_tag: Tag,
        block_start: usize,
        indicator1: Option<char>,
        indicator2: Option<char>,
    ) -> Vec<usize> {
        let wildcard = |wanted: Option<char>, actual: Option<char>| {
            wanted.map_or(true, |wanted| actual == Some(wanted))
        };
        self.local_block_range(block_start)
            .filter(|&index| {
                let field = &self[index];
                field.local_tag() == Some(local_tag)
                    && wildcard(indicator1, field.local_indicator1())
                    && wildcard(indicator2, field.local_indicator2())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::field::Field;
    use crate::record::Record;
    use crate::tag::Tag;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    fn local(local_tag: &str, ind1: char, value: &str) -> Field {
        Field::local(tag(local_tag), ind1, ' ', [('a', value)])
    }

    fn two_blocks() -> Record {
        let mut record = Record::default();
        record.append_field(Field::control(tag("001"), "42"));
        record.append_field(Field::data(tag("245"), '0', '0', [('a', "Title")]));
        for isil in ["DE-21", "DE-15"] {
            record.append_field(local("000", ' ', isil));
            record.append_field(local("001", ' ', "42"));
            record.append_field(local("852", '1', isil));
            record.append_field(local("852", '2', isil));
            record.append_field(local("935", ' ', isil));
        }
        record
    }

    #[test]
    fn test_block_starts() {
        let record = two_blocks();
        let starts = record.find_start_of_all_local_data_blocks();
        assert_eq!(starts, [2, 7]);
        for start in starts {
            assert_eq!(record[start].local_tag(), Some(tag("000")));
        }
        assert!(Record::default()
            .find_start_of_all_local_data_blocks()
            .is_empty());
    }

    #[test]
    fn test_block_ranges() {
        let record = two_blocks();
        assert_eq!(record.local_block_ranges(), [2..7, 7..12]);
        assert_eq!(record.local_block_range(99), 12..12);
    }

    #[test]
    fn test_block_ends_at_non_local_field() {
        let mut record = two_blocks();
        record.append_field(Field::data(tag("999"), ' ', ' ', [('a', "trailer")]));
        assert_eq!(record.local_block_range(7), 7..12);
    }

    #[test]
    fn test_local_tag_range_stays_in_block() {
        let record = two_blocks();
        assert_eq!(record.get_local_tag_range(tag("852"), 2), 4..6);
        assert_eq!(record.get_local_tag_range(tag("852"), 7), 9..11);
        for index in record.get_local_tag_range(tag("852"), 7) {
            assert_eq!(record[index].subfields().first_value('a'), Some("DE-15"));
        }
        assert_eq!(record.get_local_tag_range(tag("999"), 2), 7..7);
    }

    #[test]
    fn test_find_with_indicator_wildcards() {
        let record = two_blocks();
        assert_eq!(
            record.find_fields_in_local_block(tag("852"), 2, None, None),
            [4, 5]
        );
        assert_eq!(
            record.find_fields_in_local_block(tag("852"), 7, Some('2'), None),
            [10]
        );
        assert_eq!(
            record.find_fields_in_local_block(tag("852"), 7, Some('2'), Some('x')),
            Vec::<usize>::new()
        );
    }
}
