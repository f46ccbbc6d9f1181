//! Anti-equivocation guard over the persisted authorized-baking-key record.
//!
//! Signing two blocks, or two endorsements, for the same or a lower level
//! than already signed is equivocation — a slashable offense. The guard
//! owns the persisted record pairing the one authorized signing key with
//! the high-water mark (highest level signed, endorsement-seen flag) and
//! answers a single question: is it safe to sign this candidate?
//!
//! The record is mutated by exactly two operations: re-authorization (new
//! key, caller-supplied starting level) and the watermark advance after a
//! signature has actually been produced. Each is one atomic durable write.

use crate::baking::{ParsedBakingData, is_valid_level};
use crate::keys::KeySelector;
use thiserror::Error;
use verrou_storage::{BakingRecord, RecordStore, StorageError};

/// Authorization refusal. Deliberately carries no detail: the caller
/// learns that signing was refused, not which check failed.
#[derive(Error, Debug)]
#[error("Not authorized")]
pub struct SecurityError;

/// Watermark persistence errors
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// Underlying store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for watermark operations
pub type Result<T> = std::result::Result<T, WatermarkError>;

/// The persisted authorized baking key and its high-water mark.
pub struct AuthorizedBakingKey<S: RecordStore> {
    store: S,
    record: BakingRecord,
}

impl<S: RecordStore> AuthorizedBakingKey<S> {
    /// Open the guard over a store, loading the current record.
    pub fn open(store: S) -> Result<Self> {
        let record = store.load()?;
        Ok(Self { store, record })
    }

    /// The current record.
    #[must_use]
    pub fn record(&self) -> &BakingRecord {
        &self.record
    }

    /// Whether `key` is the authorized baking key.
    #[must_use]
    pub fn is_key_authorized(&self, key: &KeySelector) -> bool {
        key.matches_record(&self.record)
    }

    /// Whether signing at `level` is safe.
    ///
    /// A strictly higher level is always safe. At the recorded level,
    /// exactly one endorsement may still be signed if none has been; a
    /// block proposal at the recorded level, or anything below it, never
    /// is.
    #[must_use]
    pub fn is_level_authorized(&self, level: u32, is_endorsement: bool) -> bool {
        if !is_valid_level(level) {
            return false;
        }
        if level > self.record.highest_level {
            return true;
        }
        level == self.record.highest_level && is_endorsement && !self.record.had_endorsement
    }

    /// Refuse unless `key` is the authorized key and the candidate's level
    /// passes the equivocation check. Must run before any baking
    /// signature is produced.
    pub fn guard_baking_authorized(
        &self,
        key: &KeySelector,
        candidate: &ParsedBakingData,
    ) -> std::result::Result<(), SecurityError> {
        if !self.is_key_authorized(key) {
            log::debug!("Refusing baking signature: key is not the authorized key");
            return Err(SecurityError);
        }
        if !self.is_level_authorized(candidate.level, candidate.is_endorsement) {
            log::debug!(
                "Refusing baking signature: level {} (endorsement: {}) below watermark {} (endorsement seen: {})",
                candidate.level,
                candidate.is_endorsement,
                self.record.highest_level,
                self.record.had_endorsement
            );
            return Err(SecurityError);
        }
        Ok(())
    }

    /// Record that a signature was produced at `level`. Called only after
    /// the signature exists; never speculatively.
    pub fn advance_watermark(&mut self, level: u32, is_endorsement: bool) -> Result<()> {
        if !is_valid_level(level) {
            log::warn!("Ignoring watermark advance to reserved level 0x{level:08X}");
            return Ok(());
        }
        let mut record = self.record;
        record.highest_level = level;
        record.had_endorsement = is_endorsement;
        self.store.persist(&record)?;
        self.record = record;
        log::info!("Watermark advanced to level {level} (endorsement: {is_endorsement})");
        Ok(())
    }

    /// Replace the authorized key, restarting the watermark at
    /// `starting_level` with no endorsement recorded.
    pub fn authorize(&mut self, key: &KeySelector, starting_level: u32) -> Result<()> {
        let record = key.to_record(starting_level, false);
        self.store.persist(&record)?;
        self.record = record;
        log::info!("Baking key re-authorized, watermark restarted at level {starting_level}");
        Ok(())
    }

    /// Set the watermark level directly, keeping the authorized key.
    pub fn reset_level(&mut self, level: u32) -> Result<()> {
        let mut record = self.record;
        record.highest_level = level;
        record.had_endorsement = false;
        self.store.persist(&record)?;
        self.record = record;
        log::info!("Watermark reset to level {level}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Bip32Path, Curve};
    use verrou_storage::{FileStore, MemoryStore};

    fn test_key() -> KeySelector {
        KeySelector {
            curve: Curve::Ed25519,
            path: Bip32Path::new(&[0x8000_002C, 0x8000_06C1]).unwrap(),
        }
    }

    fn guard_at(level: u32, had_endorsement: bool) -> AuthorizedBakingKey<MemoryStore> {
        let record = test_key().to_record(level, had_endorsement);
        AuthorizedBakingKey::open(MemoryStore::with_record(record)).unwrap()
    }

    #[test]
    fn test_higher_level_is_authorized() {
        let guard = guard_at(100, false);
        assert!(guard.is_level_authorized(101, false));
        assert!(guard.is_level_authorized(101, true));
        assert!(guard.is_level_authorized(u32::MAX >> 1, false));
    }

    #[test]
    fn test_lower_level_is_rejected() {
        let guard = guard_at(100, false);
        assert!(!guard.is_level_authorized(99, false));
        assert!(!guard.is_level_authorized(99, true));
        assert!(!guard.is_level_authorized(0, true));
    }

    #[test]
    fn test_equal_level_allows_one_endorsement() {
        let mut guard = guard_at(100, false);

        // Endorsement at the watermark level is the one permitted case
        assert!(guard.is_level_authorized(100, true));
        guard.advance_watermark(100, true).unwrap();

        // A second endorsement at the same level is equivocation
        assert!(!guard.is_level_authorized(100, true));

        // A block at the next level remains fine
        assert!(guard.is_level_authorized(101, false));
    }

    #[test]
    fn test_equal_level_block_is_rejected() {
        let guard = guard_at(100, false);
        assert!(!guard.is_level_authorized(100, false));
    }

    #[test]
    fn test_reserved_level_is_never_authorized() {
        let guard = guard_at(100, false);
        assert!(!guard.is_level_authorized(0x8000_0000, false));
        assert!(!guard.is_level_authorized(u32::MAX, true));
    }

    #[test]
    fn test_monotonic_acceptance_sequence() {
        // No accepted pair may have a strictly decreasing level, and each
        // level admits at most one block and one endorsement.
        let mut guard = guard_at(10, false);
        let submissions = [
            (11u32, false, true),
            (11, true, true),
            (11, true, false),
            (11, false, false),
            (10, false, false),
            (12, false, true),
            (12, false, false),
        ];
        for (level, is_endorsement, expect) in submissions {
            let ok = guard.is_level_authorized(level, is_endorsement);
            assert_eq!(
                ok, expect,
                "level {level}, endorsement {is_endorsement}"
            );
            if ok {
                guard.advance_watermark(level, is_endorsement).unwrap();
            }
        }
    }

    #[test]
    fn test_guard_requires_matching_key() {
        let guard = guard_at(100, false);
        let candidate = ParsedBakingData {
            level: 101,
            is_endorsement: false,
        };
        assert!(guard.guard_baking_authorized(&test_key(), &candidate).is_ok());

        let other_key = KeySelector {
            curve: Curve::P256,
            path: test_key().path,
        };
        assert!(guard.guard_baking_authorized(&other_key, &candidate).is_err());
    }

    #[test]
    fn test_guard_requires_authorized_level() {
        let guard = guard_at(100, false);
        let candidate = ParsedBakingData {
            level: 100,
            is_endorsement: false,
        };
        assert!(guard.guard_baking_authorized(&test_key(), &candidate).is_err());
    }

    #[test]
    fn test_guard_with_no_authorized_key() {
        let guard = AuthorizedBakingKey::open(MemoryStore::new()).unwrap();
        let candidate = ParsedBakingData {
            level: 1,
            is_endorsement: false,
        };
        assert!(guard.guard_baking_authorized(&test_key(), &candidate).is_err());
    }

    #[test]
    fn test_authorize_replaces_key_and_level() {
        let mut guard = guard_at(100, true);
        let new_key = KeySelector {
            curve: Curve::Secp256k1,
            path: Bip32Path::new(&[0x8000_002C]).unwrap(),
        };
        guard.authorize(&new_key, 50).unwrap();

        assert!(guard.is_key_authorized(&new_key));
        assert!(!guard.is_key_authorized(&test_key()));
        assert_eq!(guard.record().highest_level, 50);
        assert!(!guard.record().had_endorsement);
        assert!(guard.is_level_authorized(50, true));
    }

    #[test]
    fn test_reset_level_keeps_key() {
        let mut guard = guard_at(100, true);
        guard.reset_level(500).unwrap();
        assert!(guard.is_key_authorized(&test_key()));
        assert_eq!(guard.record().highest_level, 500);
        assert!(!guard.record().had_endorsement);
    }

    #[test]
    fn test_watermark_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("baking_record");

        {
            let store = FileStore::new(&path).unwrap();
            let mut guard = AuthorizedBakingKey::open(store).unwrap();
            guard.authorize(&test_key(), 100).unwrap();
            guard.advance_watermark(200, true).unwrap();
        }

        let store = FileStore::new(&path).unwrap();
        let guard = AuthorizedBakingKey::open(store).unwrap();
        assert!(guard.is_key_authorized(&test_key()));
        assert_eq!(guard.record().highest_level, 200);
        assert!(guard.record().had_endorsement);
        assert!(!guard.is_level_authorized(200, true));
        assert!(guard.is_level_authorized(201, false));
    }
}
