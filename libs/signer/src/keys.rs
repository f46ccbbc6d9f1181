//! Key selection types: signature curves, BIP32 derivation paths, and the
//! public-key-hash addressing derived from them.

use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use thiserror::Error;
use verrou_storage::{BakingRecord, MAX_PATH_SEGMENTS};

type Blake2b160 = Blake2b<U20>;

/// Key errors
#[derive(Error, Debug)]
pub enum KeyError {
    /// Curve selector byte is not one of the supported curves
    #[error("Unknown curve selector: 0x{0:02X}")]
    UnknownCurve(u8),

    /// Path wire form is truncated or has too many segments
    #[error("Invalid BIP32 path: {0}")]
    InvalidPath(String),
}

/// Result type for key operations
pub type Result<T> = std::result::Result<T, KeyError>;

/// Supported signature curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Curve {
    /// Ed25519 (tz1 addresses)
    Ed25519 = 0,
    /// Secp256k1 (tz2 addresses)
    Secp256k1 = 1,
    /// P-256 (tz3 addresses)
    P256 = 2,
}

impl Curve {
    /// Decode the P2 curve selector byte.
    pub fn from_selector(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::Ed25519),
            1 => Ok(Self::Secp256k1),
            2 => Ok(Self::P256),
            other => Err(KeyError::UnknownCurve(other)),
        }
    }

    /// Stable identifier used in the persisted record.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Base58check prefix for implicit addresses on this curve.
    #[must_use]
    const fn address_prefix(self) -> [u8; 3] {
        match self {
            Self::Ed25519 => [6, 161, 159],   // tz1
            Self::Secp256k1 => [6, 161, 161], // tz2
            Self::P256 => [6, 161, 164],      // tz3
        }
    }
}

/// BIP32 derivation path, at most [`MAX_PATH_SEGMENTS`] segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bip32Path {
    segments: [u32; MAX_PATH_SEGMENTS],
    len: u8,
}

impl Bip32Path {
    /// Build a path from explicit segments.
    pub fn new(segments: &[u32]) -> Result<Self> {
        if segments.len() > MAX_PATH_SEGMENTS {
            return Err(KeyError::InvalidPath(format!(
                "{} segments exceeds maximum of {MAX_PATH_SEGMENTS}",
                segments.len()
            )));
        }
        let mut fixed = [0u32; MAX_PATH_SEGMENTS];
        fixed[..segments.len()].copy_from_slice(segments);
        Ok(Self {
            segments: fixed,
            len: segments.len() as u8,
        })
    }

    /// Decode the wire form: one segment-count byte followed by that many
    /// 4-byte big-endian segments. The path must span the whole buffer.
    pub fn from_wire(bytes: &[u8]) -> Result<Self> {
        let Some((&count, rest)) = bytes.split_first() else {
            return Err(KeyError::InvalidPath("empty path payload".to_string()));
        };
        if count as usize > MAX_PATH_SEGMENTS {
            return Err(KeyError::InvalidPath(format!(
                "{count} segments exceeds maximum of {MAX_PATH_SEGMENTS}"
            )));
        }
        if rest.len() != count as usize * 4 {
            return Err(KeyError::InvalidPath(format!(
                "expected {} path bytes, got {}",
                count as usize * 4,
                rest.len()
            )));
        }
        let mut segments = [0u32; MAX_PATH_SEGMENTS];
        for (i, chunk) in rest.chunks_exact(4).enumerate() {
            segments[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(Self {
            segments,
            len: count,
        })
    }

    /// Number of meaningful segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True when the path carries no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The meaningful segments.
    #[must_use]
    pub fn segments(&self) -> &[u32] {
        &self.segments[..self.len as usize]
    }
}

/// The session's key selection: curve plus derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySelector {
    /// Signature curve
    pub curve: Curve,
    /// Derivation path
    pub path: Bip32Path,
}

impl KeySelector {
    /// Compare against the persisted baking record.
    #[must_use]
    pub fn matches_record(&self, record: &BakingRecord) -> bool {
        record.path_len != 0
            && record.curve_id == self.curve.id()
            && record.path_len as usize == self.path.len()
            && record.path[..self.path.len()] == *self.path.segments()
    }

    /// Build the persisted form of this selector, carrying over watermark
    /// fields from the caller.
    #[must_use]
    pub fn to_record(&self, highest_level: u32, had_endorsement: bool) -> BakingRecord {
        let mut path = [0u32; MAX_PATH_SEGMENTS];
        path[..self.path.len()].copy_from_slice(self.path.segments());
        BakingRecord {
            curve_id: self.curve.id(),
            path_len: self.path.len() as u8,
            path,
            highest_level,
            had_endorsement,
        }
    }
}

/// A raw public key as returned by the secure element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(
    /// Raw key bytes
    pub Vec<u8>,
);

impl PublicKey {
    /// 20-byte hash identifying this key on chain.
    #[must_use]
    pub fn hash(&self) -> PublicKeyHash {
        let mut hasher = Blake2b160::new();
        hasher.update(&self.0);
        let digest = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest);
        PublicKeyHash(out)
    }
}

/// 20-byte public key hash (the payload of a tz1/tz2/tz3 address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyHash(
    /// Raw hash bytes
    pub [u8; 20],
);

impl PublicKeyHash {
    /// Raw hash bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Base58check address string with the curve's tz prefix.
    #[must_use]
    pub fn to_b58check(&self, curve: Curve) -> String {
        let mut prefixed = curve.address_prefix().to_vec();
        prefixed.extend_from_slice(&self.0);
        bs58::encode(&prefixed).with_check().into_string()
    }
}

/// Base58 rendering of a 32-byte message digest, as shown on pre-hashed
/// confirmation prompts.
#[must_use]
pub fn digest_to_base58(digest: &[u8; 32]) -> String {
    bs58::encode(digest).into_string()
}
