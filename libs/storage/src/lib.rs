//! Persisted baking-key record for the Verrou signing core.
//!
//! The record holds the one piece of state that must survive power loss:
//! which key is authorized to bake, and the high-water mark (highest level
//! signed, plus whether an endorsement was already produced at that level).
//! It is mutated rarely and always as a whole, so the on-disk format is a
//! single fixed-size block written atomically.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Maximum number of BIP32 path segments stored in the record.
pub const MAX_PATH_SEGMENTS: usize = 10;

/// Size in bytes of the encoded record.
///
/// curve id (1) + path length (1) + segments (10 * 4) + highest level (4)
/// + endorsement flag (1).
pub const RECORD_SIZE: usize = 1 + 1 + MAX_PATH_SEGMENTS * 4 + 4 + 1;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Record bytes have the wrong length or an out-of-range field
    #[error("Malformed record: {0}")]
    Malformed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// The persisted authorized-baking-key record.
///
/// `path_len` counts the meaningful prefix of `path`; unused segments are
/// zero. A `path_len` of 0 means no key has been authorized yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BakingRecord {
    /// Signature curve identifier (0 = Ed25519, 1 = Secp256k1, 2 = P256)
    pub curve_id: u8,
    /// Number of meaningful segments in `path`
    pub path_len: u8,
    /// BIP32 derivation path segments, fixed capacity
    pub path: [u32; MAX_PATH_SEGMENTS],
    /// Highest level a signature was produced for
    pub highest_level: u32,
    /// Whether an endorsement was signed at `highest_level`
    pub had_endorsement: bool,
}

impl BakingRecord {
    /// Encode the record into its fixed binary layout.
    #[must_use]
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0] = self.curve_id;
        out[1] = self.path_len;
        for (i, segment) in self.path.iter().enumerate() {
            out[2 + i * 4..2 + i * 4 + 4].copy_from_slice(&segment.to_be_bytes());
        }
        let level_offset = 2 + MAX_PATH_SEGMENTS * 4;
        out[level_offset..level_offset + 4].copy_from_slice(&self.highest_level.to_be_bytes());
        out[level_offset + 4] = u8::from(self.had_endorsement);
        out
    }

    /// Decode a record from its fixed binary layout.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(StorageError::Malformed(format!(
                "expected {RECORD_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let path_len = bytes[1];
        if path_len as usize > MAX_PATH_SEGMENTS {
            return Err(StorageError::Malformed(format!(
                "path length {path_len} exceeds {MAX_PATH_SEGMENTS}"
            )));
        }
        let mut path = [0u32; MAX_PATH_SEGMENTS];
        for (i, segment) in path.iter_mut().enumerate() {
            let off = 2 + i * 4;
            *segment = u32::from_be_bytes([
                bytes[off],
                bytes[off + 1],
                bytes[off + 2],
                bytes[off + 3],
            ]);
        }
        let level_offset = 2 + MAX_PATH_SEGMENTS * 4;
        let highest_level = u32::from_be_bytes([
            bytes[level_offset],
            bytes[level_offset + 1],
            bytes[level_offset + 2],
            bytes[level_offset + 3],
        ]);
        Ok(Self {
            curve_id: bytes[0],
            path_len,
            path,
            highest_level,
            had_endorsement: bytes[level_offset + 4] != 0,
        })
    }
}

/// Backing store for the baking record.
///
/// `persist` must be atomic: after a crash at any point, `load` returns
/// either the previous record or the new one, never a torn mix.
pub trait RecordStore {
    /// Durably replace the stored record.
    fn persist(&mut self, record: &BakingRecord) -> Result<()>;

    /// Load the stored record, or the default record if none exists.
    fn load(&self) -> Result<BakingRecord>;
}

/// File-backed store: write-temp, fsync, rename.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a store at `path`, creating parent directories as needed.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl RecordStore for FileStore {
    fn persist(&mut self, record: &BakingRecord) -> Result<()> {
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&record.encode())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        log::debug!(
            "Persisted baking record: level {}, endorsement {}",
            record.highest_level,
            record.had_endorsement
        );
        Ok(())
    }

    fn load(&self) -> Result<BakingRecord> {
        match fs::read(&self.path) {
            Ok(bytes) => BakingRecord::decode(&bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BakingRecord::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and the simulator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: BakingRecord,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with `record`.
    #[must_use]
    pub fn with_record(record: BakingRecord) -> Self {
        Self { record }
    }
}

impl RecordStore for MemoryStore {
    fn persist(&mut self, record: &BakingRecord) -> Result<()> {
        self.record = *record;
        Ok(())
    }

    fn load(&self) -> Result<BakingRecord> {
        Ok(self.record)
    }
}
