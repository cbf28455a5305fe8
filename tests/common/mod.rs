//! Common test helpers and utilities shared across test suite.

#![allow(dead_code)]

use marcrec::{Field, MarcWriter, Record, Tag};
use tracing_subscriber::EnvFilter;

/// Route library logs to the test output; `RUST_LOG=marcrec=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Parse a tag literal.
pub fn tag(s: &str) -> Tag {
    Tag::new(s).expect("valid tag literal")
}

/// Creates a simple test record: control number plus a title.
pub fn create_test_record(control_number: &str) -> Record {
    let mut record = Record::from_leader_str("00000nam a2200000 c 4500").expect("valid leader");
    record.append_field(Field::control(tag("001"), control_number));
    record.append_field(Field::data(tag("245"), '1', '0', [('a', "Example Title")]));
    record
}

/// Creates a realistic bibliographic record with repeated and non-repeatable
/// tags, a cross-link field and two local blocks.
pub fn create_realistic_record() -> Record {
    let mut record = Record::from_leader_str("01142cam a2200301 c 4500").expect("valid leader");
    record.append_field(Field::control(tag("001"), "1234567890"));
    record.append_field(Field::control(tag("003"), "DE-627"));
    record.append_field(Field::control(tag("008"), "200101s2020    gw            000 0 ger d"));
    record.append_field(Field::data(tag("020"), ' ', ' ', [('a', "9783161484100")]));
    record.append_field(Field::data(tag("041"), ' ', ' ', [('a', "ger"), ('a', "eng")]));
    record.append_field(Field::data(
        tag("100"),
        '1',
        ' ',
        [('a', "Schmidt, Maria"), ('e', "Verfasser"), ('4', "aut")],
    ));
    record.append_field(Field::data(
        tag("245"),
        '1',
        '0',
        [('a', "Über Bibliotheken :"), ('b', "eine Einführung"), ('c', "Maria Schmidt")],
    ));
    record.append_field(Field::data(
        tag("264"),
        ' ',
        '1',
        [('a', "Tübingen"), ('b', "Mohr Siebeck"), ('c', "2020")],
    ));
    record.append_field(Field::data(tag("650"), ' ', '0', [('a', "Libraries")]));
    record.append_field(Field::data(tag("650"), ' ', '0', [('a', "Cataloging")]));
    record.append_field(Field::data(
        tag("776"),
        '0',
        '8',
        [('i', "Online-Ausg."), ('w', "(DE-627)987654321")],
    ));
    record.append_field(Field::local(tag("000"), ' ', ' ', [('a', "")]));
    record.append_field(Field::local(tag("001"), ' ', ' ', [('a', "LOCAL-A")]));
    record.append_field(Field::local(tag("852"), ' ', ' ', [('a', "DE-21")]));
    record.append_field(Field::local(tag("000"), ' ', ' ', [('a', "")]));
    record.append_field(Field::local(tag("001"), ' ', ' ', [('a', "LOCAL-B")]));
    record.append_field(Field::local(tag("852"), ' ', ' ', [('a', "DE-24")]));
    record.append_field(Field::local(tag("935"), ' ', ' ', [('a', "lsf")]));
    record
}

/// Encode records into one binary buffer.
pub fn encode_all(records: &[Record]) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut writer = MarcWriter::new(&mut buffer);
    for record in records {
        writer.write_record(record).expect("record fits the format");
    }
    writer.finish().expect("flush to Vec");
    buffer
}
