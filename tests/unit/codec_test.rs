//! Tests for item codecs

use prometheus_drain::core::{ItemCodec, JsonCodec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Thumbnail {
    image_id: u64,
    width: u32,
    tags: Vec<String>,
}

#[test]
fn test_structured_item_round_trips() {
    let codec = JsonCodec::<Thumbnail>::new();
    let item = Thumbnail {
        image_id: 9_001,
        width: 320,
        tags: vec!["cover".to_string()],
    };
    let payload = codec.encode(&item).unwrap();
    assert_eq!(codec.decode(&payload).unwrap(), Some(item));
}

#[test]
fn test_null_and_empty_payloads_decode_to_none() {
    let codec = JsonCodec::<Thumbnail>::new();
    assert_eq!(codec.decode(b"null").unwrap(), None);
    assert_eq!(codec.decode(b"  null\n").unwrap(), None);
    assert_eq!(codec.decode(b"").unwrap(), None);
}

#[test]
fn test_garbage_payload_is_an_error() {
    let codec = JsonCodec::<Thumbnail>::new();
    assert!(codec.decode(b"{not json").is_err());
    assert!(codec.decode(br#"{"image_id": "x"}"#).is_err());
}
