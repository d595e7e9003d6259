/*!
Content fingerprints: short version ids and full SHA-256 digests.
*/

use crate::{Result, ShadowError};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Number of digest bytes kept in a short id.
pub const SHORT_ID_BYTES: usize = 4;

/// Length of a short id in hex characters.
pub const SHORT_ID_LEN: usize = SHORT_ID_BYTES * 2;

/// Derive the short version id of `content`
///
/// The id is the hex encoding of the first four bytes of the SHA-256 digest.
/// Two different contents can share an id; nothing here detects that.
///
/// # Example
/// ```rust
/// use shadow_core::fingerprint::short_id;
///
/// assert_eq!(short_id(b"hello"), "2cf24dba");
/// ```
pub fn short_id(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest[..SHORT_ID_BYTES]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Compute the full SHA-256 hex digest of an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Stream the file at `path` through SHA-256 and return its hex digest
///
/// # Errors
/// * `ShadowError::Storage` - If the file cannot be opened or read
pub fn full_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| {
        ShadowError::storage(format!("Failed to open {} for hashing: {e}", path.display()))
    })?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| {
        ShadowError::storage(format!("Failed to hash {}: {e}", path.display()))
    })?;

    Ok(format!("{:x}", hasher.finalize()))
}

/// True when `id` has the shape of a short id (8 lowercase hex characters).
pub fn is_short_id(id: &str) -> bool {
    id.len() == SHORT_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
