//! # Fingerprints — Content Digests of Serializable State
//!
//! A `Fingerprint` is the SHA-256 digest of a value's canonical JSON form.
//! Canonical here means: serialized through `serde_json::Value`, whose maps
//! are key-sorted, with no insignificant whitespace. Two values with equal
//! fingerprints serialized to identical bytes.
//!
//! Taxonomy snapshots are fingerprinted to prove that history is never
//! rewritten: the fingerprint of the snapshot at `k` must be the same
//! whenever it is computed.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SecflowError;

/// A SHA-256 digest over canonical JSON bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute the fingerprint of any serializable value.
///
/// # Errors
///
/// Returns [`SecflowError::Serialization`] if the value cannot be
/// represented as JSON (e.g., a map with non-string keys).
pub fn fingerprint_of<T: Serialize + ?Sized>(value: &T) -> Result<Fingerprint, SecflowError> {
    let canonical = serde_json::to_value(value)?;
    let bytes = serde_json::to_vec(&canonical)?;
    let hash = Sha256::digest(&bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    Ok(Fingerprint(out))
}
