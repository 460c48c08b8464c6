#![no_main]

use libfuzzer_sys::fuzz_target;
use waitlist::storage::secure::decode;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = std::str::from_utf8(data) {
        let _ = decode::<serde_json::Value>(raw);
    }
});
