#![no_main]

use libfuzzer_sys::fuzz_target;
use marcrec::reader::decode_record;
use marcrec::writer::encode_record;

// Whatever decodes must re-encode and decode to the same fields.
fuzz_target!(|data: &[u8]| {
    let Ok(record) = decode_record(data) else {
        return;
    };
    let Ok(bytes) = encode_record(&record) else {
        return;
    };
    let again = decode_record(&bytes).expect("re-encoded record decodes");
    assert_eq!(again.fields(), record.fields());
});
