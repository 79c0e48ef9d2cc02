//! Persistence codec for entity collections.
//!
//! Collections are written as a postcard-encoded [`PersistedCollection`]
//! carrying a format version. Decoding never panics: malformed input or
//! an unknown version is returned as a [`CodecError`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Current on-disk format version.
pub const FORMAT_VERSION: u8 = 1;

/// Error type for collection encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// The payload was written by an unknown format version.
    #[error("unsupported format version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion {
        /// Version byte found in the payload.
        found: u8,
    },
}

/// A versioned collection of records as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCollection<T> {
    /// Format version the payload was written with.
    pub version: u8,
    /// Records in insertion order.
    pub records: Vec<T>,
}

/// Borrowed view used for encoding without cloning records.
#[derive(Serialize)]
struct PersistedRef<'a, T> {
    version: u8,
    records: &'a [T],
}

/// Encodes a slice of records into bytes.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if a record cannot be serialized.
pub fn encode_collection<T: Serialize>(records: &[T]) -> Result<Vec<u8>, CodecError> {
    let payload = PersistedRef {
        version: FORMAT_VERSION,
        records,
    };
    postcard::to_allocvec(&payload).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes records previously written by [`encode_collection`].
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] for malformed bytes or
/// [`CodecError::UnsupportedVersion`] for a foreign format version.
pub fn decode_collection<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>, CodecError> {
    let collection: PersistedCollection<T> =
        postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))?;
    if collection.version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: collection.version,
        });
    }
    Ok(collection.records)
}
