#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(url) = std::str::from_utf8(data) {
        if let Some(code) = mediabridge::oauth::extract_code(url) {
            assert!(!code.is_empty());
        }
        let _ = mediabridge::oauth::encode_host_component(url);
    }
});
