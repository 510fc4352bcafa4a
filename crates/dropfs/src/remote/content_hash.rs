//! Provider content hash.
//!
//! The hash is computed over 4 MiB blocks: each block is SHA-256 hashed, the
//! block digests are concatenated, and the concatenation is hashed again.
//! The result is hex-encoded.

use sha2::{Digest, Sha256};

/// Block size the hash is defined over.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Compute the content hash of `data`.
pub fn content_hash(data: &[u8]) -> String {
    let mut overall = Sha256::new();
    for block in data.chunks(BLOCK_SIZE) {
        overall.update(Sha256::digest(block));
    }
    hex::encode(overall.finalize())
}
