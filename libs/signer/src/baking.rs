//! Decoding of consensus (baking) messages: block headers and endorsements.
//!
//! Only the fields the anti-equivocation guard needs are extracted. Wire
//! layouts:
//!
//! - Block: tag (1) + chain id (4, BE) + level (4, BE) + protocol version
//!   (1); the remainder of the header is ignored.
//! - Endorsement: tag (1) + chain id (4, BE) + branch (32) + inner tag (1)
//!   + level (4, BE), and nothing else.

use crate::magic_bytes::MessageTag;
use thiserror::Error;

/// Levels are 31-bit; the top bit is reserved.
pub const LEVEL_RESERVED_MASK: u32 = 0x8000_0000;

/// Minimum block header length: tag + chain id + level + protocol version.
const BLOCK_MIN_LENGTH: usize = 1 + 4 + 4 + 1;

/// Exact endorsement length.
const ENDORSEMENT_LENGTH: usize = 1 + 4 + 32 + 1 + 4;

/// Baking-data decode errors
#[derive(Error, Debug)]
pub enum BakingParseError {
    /// First byte is not a block or endorsement tag
    #[error("Not a baking message (tag 0x{0:02X})")]
    NotBakingData(u8),

    /// Buffer length does not fit the expected layout
    #[error("Bad baking message length: expected {expected}, got {actual}")]
    BadLength {
        /// Required length (minimum for blocks, exact for endorsements)
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Level uses the reserved high bit
    #[error("Level 0x{0:08X} uses the reserved bit")]
    ReservedLevel(u32),
}

/// Result type for baking-data decoding
pub type Result<T> = std::result::Result<T, BakingParseError>;

/// The consensus-relevant content of a block or endorsement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedBakingData {
    /// Consensus level (31-bit)
    pub level: u32,
    /// True for endorsements, false for block proposals
    pub is_endorsement: bool,
}

/// Whether a level value stays within the 31-bit bound.
#[must_use]
pub const fn is_valid_level(level: u32) -> bool {
    level & LEVEL_RESERVED_MASK == 0
}

/// Decode a block header or endorsement.
pub fn parse_baking_data(data: &[u8]) -> Result<ParsedBakingData> {
    let tag = data.first().copied().unwrap_or(0);
    let parsed = match MessageTag::from_byte(tag) {
        Some(MessageTag::Block) => {
            if data.len() < BLOCK_MIN_LENGTH {
                return Err(BakingParseError::BadLength {
                    expected: BLOCK_MIN_LENGTH,
                    actual: data.len(),
                });
            }
            ParsedBakingData {
                level: u32::from_be_bytes([data[5], data[6], data[7], data[8]]),
                is_endorsement: false,
            }
        }
        Some(MessageTag::Endorsement) => {
            if data.len() != ENDORSEMENT_LENGTH {
                return Err(BakingParseError::BadLength {
                    expected: ENDORSEMENT_LENGTH,
                    actual: data.len(),
                });
            }
            ParsedBakingData {
                level: u32::from_be_bytes([data[38], data[39], data[40], data[41]]),
                is_endorsement: true,
            }
        }
        _ => return Err(BakingParseError::NotBakingData(tag)),
    };

    if !is_valid_level(parsed.level) {
        return Err(BakingParseError::ReservedLevel(parsed.level));
    }
    Ok(parsed)
}
