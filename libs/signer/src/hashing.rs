//! Incremental Blake2b-256 hashing over a bounded staging buffer.
//!
//! Sign commands arrive in packets but must be hashed as one message. The
//! hasher consumes whole 128-byte compression blocks from the front of the
//! staging buffer as they become available and leaves the partial tail in
//! place, so the buffer only ever needs to hold one packet plus one block
//! of slack. The finished digest depends only on the concatenated bytes,
//! not on how they were split across packets.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use thiserror::Error;

type Blake2b256 = Blake2b<U32>;

/// Size of one Blake2b compression block.
pub const BLOCK_BYTES: usize = 128;

/// Size of the produced digest.
pub const DIGEST_SIZE: usize = 32;

/// Hashing errors
#[derive(Error, Debug)]
pub enum HashError {
    /// The staging buffer holds more bytes than its declared capacity.
    /// This indicates a bug in the caller, not bad input.
    #[error("Staging buffer holds {length} bytes, capacity is {capacity}")]
    StagingOverflow {
        /// Bytes currently staged
        length: usize,
        /// Declared staging capacity
        capacity: usize,
    },
}

/// Result type for hashing operations
pub type Result<T> = std::result::Result<T, HashError>;

/// Streaming hasher with lazily initialized state.
///
/// A hasher that is finished without ever being fed produces the digest of
/// the empty message.
pub struct IncrementalHasher {
    state: Option<Blake2b256>,
    capacity: usize,
}

impl IncrementalHasher {
    /// Create a hasher for a staging buffer of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: None,
            capacity,
        }
    }

    /// Consume every complete block available at the front of `staging`,
    /// compacting the leftover tail (always shorter than one block) to the
    /// front of the buffer.
    pub fn feed(&mut self, staging: &mut Vec<u8>) -> Result<()> {
        if staging.len() > self.capacity {
            return Err(HashError::StagingOverflow {
                length: staging.len(),
                capacity: self.capacity,
            });
        }
        let consumed = staging.len() - staging.len() % BLOCK_BYTES;
        if consumed > 0 {
            self.state
                .get_or_insert_with(Blake2b256::new)
                .update(&staging[..consumed]);
            staging.drain(..consumed);
        }
        Ok(())
    }

    /// Hash whatever remains in `staging` (possibly nothing) and close the
    /// digest. The staging buffer is emptied and the hasher reverts to its
    /// uninitialized state.
    pub fn finish(&mut self, staging: &mut Vec<u8>) -> Result<[u8; DIGEST_SIZE]> {
        self.feed(staging)?;
        let mut state = self.state.take().unwrap_or_else(Blake2b256::new);
        state.update(staging.as_slice());
        staging.clear();
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&state.finalize());
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CAPACITY: usize = 230 + BLOCK_BYTES;

    fn one_shot(message: &[u8]) -> [u8; DIGEST_SIZE] {
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&Blake2b256::digest(message));
        digest
    }

    fn hash_in_chunks(message: &[u8], chunk_size: usize) -> [u8; DIGEST_SIZE] {
        let mut hasher = IncrementalHasher::new(TEST_CAPACITY);
        let mut staging = Vec::new();
        for chunk in message.chunks(chunk_size.max(1)) {
            staging.extend_from_slice(chunk);
            hasher.feed(&mut staging).unwrap();
            assert!(staging.len() < BLOCK_BYTES, "tail must stay under a block");
        }
        hasher.finish(&mut staging).unwrap()
    }

    #[test]
    fn test_empty_message() {
        let mut hasher = IncrementalHasher::new(TEST_CAPACITY);
        let mut staging = Vec::new();
        assert_eq!(hasher.finish(&mut staging).unwrap(), one_shot(b""));
    }

    #[test]
    fn test_chunking_invariance() {
        let message: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let expected = one_shot(&message);
        for chunk_size in [1, 7, 127, 128, 129, 200, 230] {
            assert_eq!(
                hash_in_chunks(&message, chunk_size),
                expected,
                "chunk size {chunk_size}"
            );
        }
    }

    #[test]
    fn test_exact_block_boundary() {
        for length in [128, 256, 384] {
            let message = vec![0xABu8; length];
            assert_eq!(hash_in_chunks(&message, 128), one_shot(&message));
        }
    }

    #[test]
    fn test_feed_compacts_tail() {
        let mut hasher = IncrementalHasher::new(TEST_CAPACITY);
        let mut staging = vec![0x42u8; BLOCK_BYTES + 5];
        hasher.feed(&mut staging).unwrap();
        assert_eq!(staging.len(), 5);
        assert_eq!(staging, vec![0x42u8; 5]);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut hasher = IncrementalHasher::new(TEST_CAPACITY);
        let mut staging = vec![0u8; TEST_CAPACITY + 1];
        assert!(matches!(
            hasher.feed(&mut staging),
            Err(HashError::StagingOverflow { .. })
        ));
    }

    #[test]
    fn test_digest_differs_for_different_messages() {
        assert_ne!(one_shot(b"one"), one_shot(b"two"));
        assert_eq!(hash_in_chunks(b"one", 1), one_shot(b"one"));
    }
}
