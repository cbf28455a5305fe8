//! Local data block addressing on decoded records.

mod common;

use common::{create_realistic_record, encode_all, tag};
use marcrec::record_validation::{FindingKind, ValidationOptions};
use marcrec::{Field, MarcReader};

#[test]
fn test_two_blocks_two_starts() {
    let record = create_realistic_record();
    let starts = record.find_start_of_all_local_data_blocks();
    assert_eq!(starts.len(), 2);
    for &start in &starts {
        assert_eq!(record[start].local_tag(), Some(tag("000")));
    }
    assert_eq!(record.local_block_ranges(), [11..14, 14..18]);
}

#[test]
fn test_ranges_never_leak_across_blocks() {
    let record = create_realistic_record();
    let starts = record.find_start_of_all_local_data_blocks();
    let blocks = record.local_block_ranges();

    for (start, block) in starts.iter().zip(&blocks) {
        for local_tag in ["000", "001", "852", "935"] {
            let range = record.get_local_tag_range(tag(local_tag), *start);
            assert!(range.start >= block.start && range.end <= block.end);
        }
    }

    let first_holding = record.get_local_tag_range(tag("852"), starts[0]);
    assert_eq!(record[first_holding.start].first_subfield_value('a'), Some("DE-21"));
    let second_holding = record.get_local_tag_range(tag("852"), starts[1]);
    assert_eq!(record[second_holding.start].first_subfield_value('a'), Some("DE-24"));

    // 935 only exists in the second block
    assert!(record.get_local_tag_range(tag("935"), starts[0]).is_empty());
    assert_eq!(record.get_local_tag_range(tag("935"), starts[1]).len(), 1);
}

#[test]
fn test_blocks_survive_binary_roundtrip() {
    let record = create_realistic_record();
    let decoded = MarcReader::new(encode_all(&[record.clone()]).as_slice())
        .read_record()
        .unwrap()
        .unwrap();
    assert_eq!(
        decoded.find_start_of_all_local_data_blocks(),
        record.find_start_of_all_local_data_blocks()
    );
    let start = decoded.find_start_of_all_local_data_blocks()[1];
    let control = decoded.get_local_tag_range(tag("001"), start);
    assert_eq!(decoded[control.start].first_subfield_value('a'), Some("LOCAL-B"));
    assert_eq!(decoded[control.start].local_indicator1(), Some(' '));
}

#[test]
fn test_block_without_local_control_number_is_reported() {
    let mut record = create_realistic_record();
    let starts = record.find_start_of_all_local_data_blocks();
    record.delete_field(starts[1] + 1);

    let findings = record.validate(&ValidationOptions::default());
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::MalformedLocalBlock);
}

#[test]
fn test_stray_local_field_is_reported() {
    let mut record = common::create_test_record("1");
    record.append_field(Field::local(tag("852"), ' ', ' ', [('a', "DE-21")]));
    let findings = record.validate(&ValidationOptions::default());
    assert!(findings
        .iter()
        .any(|finding| finding.kind == FindingKind::MalformedLocalBlock));
}
