//! Deterministic content hashing for proof records.
//!
//! Proof records carry a content hash of the snapshot they were generated from,
//! plus a chain-link hash referencing the previous record, informally linking
//! history into a sequence. `std::collections::hash_map::DefaultHasher` seeds
//! itself randomly per process, so two runs would disagree on every hash; this
//! module uses FNV-1a with fixed constants instead, which is stable across
//! processes, platforms, and runs.
//!
//! FNV-1a is not cryptographically secure. The chain link is an integrity aid
//! for inspection and testing, not a tamper-proof commitment, which matches the
//! demo scope of the proofs themselves.

use std::hash::{Hash, Hasher};

/// FNV-1a 64-bit offset basis constant.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime constant.
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// A deterministic FNV-1a hasher with fixed constants.
///
/// Produces identical results for identical inputs across processes and
/// platforms, unlike the randomly seeded std hasher.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    state: u64,
}

impl ContentHasher {
    /// Creates a hasher initialized with the standard FNV-1a offset basis.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for ContentHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }
}

/// Computes the deterministic content hash of any hashable value.
///
/// Used for the snapshot content hash stored on every [`ProofRecord`].
///
/// [`ProofRecord`]: crate::record::ProofRecord
#[inline]
pub fn content_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = ContentHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Derives the chain-link hash for a record from the previous record's content
/// hash.
///
/// The link is a hash *of* the previous content hash rather than the raw value,
/// so a chain link is never equal to the content hash it references.
#[inline]
#[must_use]
pub fn chain_link(prev_content_hash: u64) -> u64 {
    let mut hasher = ContentHasher::new();
    hasher.write(&prev_content_hash.to_le_bytes());
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_hash() {
        assert_eq!(content_hash(&"e2e4"), content_hash(&"e2e4"));
        assert_ne!(content_hash(&"e2e4"), content_hash(&"e7e5"));
    }

    #[test]
    fn known_fnv1a_values() {
        // FNV-1a("") = offset basis
        let hasher = ContentHasher::new();
        assert_eq!(hasher.finish(), 0xcbf2_9ce4_8422_2325);

        // FNV-1a("a") = 0xaf63dc4c8601ec8c
        let mut hasher = ContentHasher::new();
        hasher.write(b"a");
        assert_eq!(hasher.finish(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn chain_link_differs_from_content() {
        let content = content_hash(&42u32);
        assert_ne!(chain_link(content), content);
    }

    #[test]
    fn chain_link_is_deterministic() {
        assert_eq!(chain_link(7), chain_link(7));
        assert_ne!(chain_link(7), chain_link(8));
    }

    #[test]
    fn struct_hashing_is_stable() {
        #[derive(Hash)]
        struct Snapshotish {
            fen: String,
            move_number: u32,
        }

        let a = Snapshotish {
            fen: "startpos".to_owned(),
            move_number: 1,
        };
        let b = Snapshotish {
            fen: "startpos".to_owned(),
            move_number: 1,
        };
        assert_eq!(content_hash(&a), content_hash(&b));
    }
}
