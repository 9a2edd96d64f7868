//! Short, URL-safe identifiers for articles and comments.
//!
//! An identifier is 9 random bytes encoded as unpadded base64url, giving a
//! 12-character token such as `Vd3x_k2Q9aLm`. The bytes come from a UUIDv4
//! with its fixed version and variant bytes skipped, so all 72 bits are
//! random.
//!
//! Uniqueness is the store's job: it checks each candidate from
//! [`candidates`] against its collection and gives up with
//! [`Error::Conflict`] once they run out. Stores draw candidates from an
//! [`IdSource`], which tests replace to force collisions.
//!
//! ```rust
//! use threadline_core::id::{generate_id, is_valid_id};
//!
//! let id = generate_id();
//! assert_eq!(id.len(), 12);
//! assert!(is_valid_id(&id));
//! ```

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Generator of identifier candidates.
pub type IdSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Random bytes per identifier.
const ID_BYTES: usize = 9;

/// Longest identifier accepted from callers (seeded article ids).
pub const MAX_ID_LEN: usize = 64;

/// How many fresh candidates a store tries before reporting a conflict.
pub const MAX_ID_ATTEMPTS: usize = 8;

/// Generate a fresh 12-character URL-safe identifier.
pub fn generate_id() -> String {
    let raw = Uuid::new_v4().into_bytes();
    let mut bytes = [0u8; ID_BYTES];
    // raw[6] carries the version nibble and raw[8] the variant bits.
    bytes[..6].copy_from_slice(&raw[..6]);
    bytes[6] = raw[7];
    bytes[7..].copy_from_slice(&raw[9..11]);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The random source every store starts with.
pub fn default_source() -> IdSource {
    Arc::new(generate_id)
}

/// A bounded sequence of [`MAX_ID_ATTEMPTS`] candidates from `source`.
pub fn candidates(source: &IdSource) -> impl Iterator<Item = String> + '_ {
    (0..MAX_ID_ATTEMPTS).map(move |_| source())
}

/// The first candidate for which `taken` is false.
///
/// Fails with [`Error::Conflict`] when every candidate is taken.
pub fn allocate<I, F>(kind: &str, candidates: I, mut taken: F) -> Result<String>
where
    I: IntoIterator<Item = String>,
    F: FnMut(&str) -> bool,
{
    candidates
        .into_iter()
        .find(|candidate| !taken(candidate.as_str()))
        .ok_or_else(|| exhausted(kind))
}

/// The error reported once id candidates run out.
pub fn exhausted(kind: &str) -> Error {
    Error::Conflict(format!("could not allocate a unique {} id", kind))
}

/// Whether `id` is a non-empty URL-safe token of acceptable length.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
