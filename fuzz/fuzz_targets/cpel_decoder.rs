#![no_main]

use cpel::decoder::CpelFile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must fail cleanly, never panic
    if let Ok(file) = CpelFile::parse(data) {
        let _ = file.to_string();
    }
});
