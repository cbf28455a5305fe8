#![no_main]

use libfuzzer_sys::fuzz_target;
use marcrec::MarcReader;

// Decoding arbitrary bytes must never panic, and every error must leave the
// reader positioned further along than before.
fuzz_target!(|data: &[u8]| {
    let mut reader = MarcReader::new(data);
    loop {
        let before = reader.tell();
        match reader.read_record() {
            Ok(Some(record)) => {
                let _ = record.validate(&Default::default());
                let _ = record.find_start_of_all_local_data_blocks();
            },
            Ok(None) => break,
            Err(_) => {
                if reader.tell() == before {
                    break;
                }
            },
        }
    }
});
