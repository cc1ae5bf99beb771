// src/chunk.rs

//! Blake3 content hashing and the rolling-hasher feed for sequence chunks.

use crate::common::{Hash, HASH_SIZE};
use crate::error::Result;
use crate::sequence::{MetaTuple, Sequence};

/// Computes the 20-byte content digest of a slice of bytes.
pub fn hash_bytes(bytes: &[u8]) -> Hash {
    let digest = blake3::hash(bytes);
    let mut h: Hash = [0u8; HASH_SIZE];
    h.copy_from_slice(&digest.as_bytes()[..HASH_SIZE]);
    h
}

/// Encodes a sequence and computes its content hash, one chunk per node.
pub fn chunk_sequence(seq: &Sequence) -> Result<(Hash, Vec<u8>)> {
    let bytes = seq.encode()?;
    let hash = hash_bytes(&bytes);
    Ok((hash, bytes))
}

/// Byte sink of the external rolling hasher that decides node boundaries
/// while new trees are built. The boundary policy itself lives outside this
/// crate; sequences only feed it bytes.
pub trait RollingByteHasher {
    fn hash_bytes(&mut self, bytes: &[u8]);
}

/// Feeds one meta tuple to the rolling hasher. The input is the tuple's
/// buffer exactly, so the hasher sees uniform input at every tree level.
pub fn meta_hash_value_bytes<H: RollingByteHasher>(tuple: &MetaTuple, hasher: &mut H) {
    hasher.hash_bytes(tuple.bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_twenty_bytes_and_stable() {
        let a = hash_bytes(b"prolly");
        let b = hash_bytes(b"prolly");
        assert_eq!(a, b);
        assert_eq!(a.len(), HASH_SIZE);
        assert_ne!(a, hash_bytes(b"probably"));
    }
}
