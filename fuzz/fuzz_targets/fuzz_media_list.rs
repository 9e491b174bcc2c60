#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if let Ok(assets) = mediabridge::providers::instagram::parse_media_list(&body) {
        assert!(assets.iter().all(|a| a.source_url.is_some()));
    }
    if let Ok(assets) = mediabridge::providers::facebook::parse_media_list(&body) {
        assert!(assets.iter().all(|a| a.thumbnail_url.is_some()));
    }
    let _ = mediabridge::oauth::parse_token_response(&body.to_string());
});
