//! Item codecs converting items to and from opaque byte payloads.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use crate::core::CodecError;

/// Converts items to byte payloads and back.
///
/// An empty payload (and any payload the codec treats as null) must decode to
/// `Ok(None)`, never to a default item, so that "collection empty" stays
/// unambiguous for durable collections.
pub trait ItemCodec<T>: Send + Sync {
    /// Encode an item into a payload.
    fn encode(&self, item: &T) -> Result<Vec<u8>, CodecError>;
    /// Decode a payload; `Ok(None)` means absent.
    fn decode(&self, payload: &[u8]) -> Result<Option<T>, CodecError>;
}

/// JSON codec backed by `serde_json`. `null` and empty payloads are absent.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Create a JSON codec.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> ItemCodec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, item: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(item).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Option<T>, CodecError> {
        let trimmed = payload.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            return Ok(None);
        }
        serde_json::from_slice(trimmed)
            .map(Some)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}
