#![no_main]

use libfuzzer_sys::fuzz_target;
use marcrec::MarcXmlReader;

fuzz_target!(|data: &[u8]| {
    let mut reader = MarcXmlReader::new(data);
    for _ in 0..64 {
        match reader.read_record() {
            Ok(Some(_)) => {},
            Ok(None) | Err(_) => break,
        }
    }
});
