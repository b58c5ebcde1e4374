//! Merkle root over transaction hashes
//!
//! - Leaves are the hex transaction hashes, in block order
//! - Parent: `SHA-256(left_hex || right_hex)`, hex encoded
//! - Odd node count: the last node is paired with itself
//! - Empty set: `SHA-256("")`

use sha2::{Digest, Sha256};

/// Hex SHA-256 of arbitrary bytes
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Root of an empty transaction set
pub fn empty_root() -> String {
    sha256_hex(b"")
}

#[must_use]
pub fn merkle_root<S: AsRef<str>>(hashes: &[S]) -> String {
    if hashes.is_empty() {
        return empty_root();
    }

    let mut level: Vec<String> = hashes.iter().map(|h| h.as_ref().to_string()).collect();
    while level.len() > 1 {
        if level.len() % 2 != 0 {
            let last = level[level.len() - 1].clone();
            level.push(last);
        }
        level = level
            .chunks_exact(2)
            .map(|pair| {
                let mut hasher = Sha256::new();
                hasher.update(pair[0].as_bytes());
                hasher.update(pair[1].as_bytes());
                hex::encode(hasher.finalize())
            })
            .collect();
    }
    level.remove(0)
}
