//! Fuzz target for media type parsing and content negotiation.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use keystone_core::media::{choose_decode_format, choose_encode_media, negotiate_media_type};
use keystone_core::{Accept, MediaType};

#[derive(Debug, Arbitrary)]
struct FuzzNegotiation {
    accept: String,
    content_type: Option<String>,
    declared: Vec<String>,
}

fuzz_target!(|data: FuzzNegotiation| {
    let declared: Vec<MediaType> = data
        .declared
        .iter()
        .take(16)
        .filter_map(|raw| MediaType::parse(raw))
        .collect();

    let accept = Accept::parse(&data.accept);
    if let Some(chosen) = negotiate_media_type(&accept, &declared) {
        assert!(declared.contains(chosen));
    }

    let encoded = choose_encode_media(Some(&declared), Some(&data.accept));
    if !declared.is_empty() {
        assert!(declared.contains(&encoded));
    }

    let _ = choose_decode_format(Some(&declared), data.content_type.as_deref());
});
