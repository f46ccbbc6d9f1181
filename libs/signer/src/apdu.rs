//! Command framing and the error-to-status translation.
//!
//! Each exchange is one APDU: class byte, instruction byte, two parameter
//! bytes (P1 carries the first/continuation/last packet markers, P2 the
//! curve selector), a length byte, and the payload. Every reply ends in a
//! two-byte status word; errors are reported as a bare status word with no
//! payload.

use crate::baking::BakingParseError;
use crate::hashing::HashError;
use crate::high_watermark::{SecurityError, WatermarkError};
use crate::keys::KeyError;
use crate::operations::ParseError;
use crate::secure_element::SecureElementError;
use thiserror::Error;
use verrou_storage::StorageError;

/// Command class accepted by this application.
pub const CLA: u8 = 0x80;

/// Maximum payload bytes in one APDU.
pub const MAX_PACKET_SIZE: usize = 230;

/// P1 control values for sign commands.
pub mod p1 {
    /// First packet of a command sequence: key selection only
    pub const FIRST: u8 = 0x00;
    /// Continuation packet carrying message content
    pub const NEXT: u8 = 0x01;
    /// Continuation that arms the digest-only diagnostic response
    pub const HASH_ONLY_NEXT: u8 = 0x03;
    /// OR-ed onto the marker of the final packet
    pub const LAST_MARKER: u8 = 0x80;
}

/// Status words.
pub mod status {
    /// Success
    pub const OK: u16 = 0x9000;
    /// Wrong command class
    pub const WRONG_CLASS: u16 = 0x6E00;
    /// Unknown instruction
    pub const UNKNOWN_INSTRUCTION: u16 = 0x6D00;
    /// Bad parameter byte
    pub const WRONG_PARAM: u16 = 0x6B00;
    /// Bad payload length
    pub const WRONG_LENGTH: u16 = 0x6C00;
    /// Malformed values inside the payload
    pub const WRONG_VALUES: u16 = 0x6A80;
    /// Wire data failed to parse
    pub const PARSE_ERROR: u16 = 0x9405;
    /// Authorization refused (intentionally uninformative)
    pub const SECURITY: u16 = 0x6982;
    /// User rejected the prompt
    pub const REJECTED: u16 = 0x6985;
    /// Internal resource bound exceeded
    pub const MEMORY_ERROR: u16 = 0x9200;
    /// Secure element failure
    pub const TECHNICAL_PROBLEM: u16 = 0x6F00;
}

/// Supported instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    /// Replace the authorized baking key (validator mode)
    AuthorizeBaking = 0x01,
    /// Return the public key for a curve/path
    GetPublicKey = 0x02,
    /// Sign a message, returning the signature alone
    Sign = 0x04,
    /// Sign raw bytes without parsing or hashing (wallet mode)
    SignUnsafe = 0x05,
    /// Set the high-water mark level (validator mode)
    ResetHighWaterMark = 0x06,
    /// Sign a message, prefixing the digest to the response
    SignWithHash = 0x0F,
}

impl Instruction {
    /// Decode the instruction byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::AuthorizeBaking),
            0x02 => Some(Self::GetPublicKey),
            0x04 => Some(Self::Sign),
            0x05 => Some(Self::SignUnsafe),
            0x06 => Some(Self::ResetHighWaterMark),
            0x0F => Some(Self::SignWithHash),
            _ => None,
        }
    }

    /// The wire value of this instruction.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }
}

/// One parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    /// Decoded instruction
    pub instruction: Instruction,
    /// Packet control byte
    pub p1: u8,
    /// Mode selector byte (curve choice)
    pub p2: u8,
    /// Command payload
    pub payload: &'a [u8],
}

impl<'a> Command<'a> {
    /// Parse a raw APDU. The declared length must match the buffer
    /// exactly and stay within [`MAX_PACKET_SIZE`].
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        if raw.len() < 5 {
            return Err(CommandError::WrongLength);
        }
        if raw[0] != CLA {
            return Err(CommandError::WrongClass(raw[0]));
        }
        let instruction =
            Instruction::from_byte(raw[1]).ok_or(CommandError::UnknownInstruction(raw[1]))?;
        let declared = raw[4] as usize;
        if declared > MAX_PACKET_SIZE || raw.len() != 5 + declared {
            return Err(CommandError::WrongLength);
        }
        Ok(Self {
            instruction,
            p1: raw[2],
            p2: raw[3],
            payload: &raw[5..],
        })
    }
}

/// Every way a command can fail, with its fixed reply status.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Class byte is not ours
    #[error("Wrong command class: 0x{0:02X}")]
    WrongClass(u8),

    /// Instruction byte unknown, or known but unavailable in this mode
    #[error("Unknown instruction: 0x{0:02X}")]
    UnknownInstruction(u8),

    /// P1 does not carry a valid packet marker
    #[error("Wrong parameter byte")]
    WrongParameter,

    /// Declared or accumulated length out of bounds
    #[error("Wrong length")]
    WrongLength,

    /// A continuation packet arrived before the first packet
    #[error("Packet sequence violation: no key selected")]
    SequenceViolation,

    /// More than 255 packets in one command sequence
    #[error("Packet counter overflow")]
    PacketOverflow,

    /// No confirmation is pending for a resolve call
    #[error("No confirmation pending")]
    NoPendingConfirmation,

    /// Validator-mode messages must fit in a single packet
    #[error("Message exceeds one packet")]
    MultiPacket,

    /// First byte of the message is not signable in this mode
    #[error("Unsupported message tag: 0x{0:02X}")]
    UnsupportedMessageTag(u8),

    /// The accumulated operation group never parsed
    #[error("Operation group did not parse")]
    UnparsedGroup,

    /// Message content failed to parse
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Baking message failed to parse
    #[error("Baking parse error: {0}")]
    Baking(#[from] BakingParseError),

    /// Key selector or path malformed
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    /// Internal staging bound exceeded
    #[error("Resource error: {0}")]
    Resource(#[from] HashError),

    /// Authorization refused; no further detail is exposed
    #[error("Not authorized")]
    Security,

    /// Persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// User rejected the operation
    #[error("Rejected by user")]
    Rejected,

    /// A display value could not be rendered
    #[error("Value rendering failed")]
    Value,

    /// Secure element failed
    #[error("Secure element error: {0}")]
    SecureElement(#[from] SecureElementError),
}

impl From<SecurityError> for CommandError {
    fn from(_: SecurityError) -> Self {
        Self::Security
    }
}

impl From<WatermarkError> for CommandError {
    fn from(e: WatermarkError) -> Self {
        match e {
            WatermarkError::Storage(inner) => Self::Storage(inner),
        }
    }
}

impl CommandError {
    /// The fixed status word reported for this error.
    #[must_use]
    pub fn status_word(&self) -> u16 {
        match self {
            Self::WrongClass(_) => status::WRONG_CLASS,
            Self::UnknownInstruction(_) => status::UNKNOWN_INSTRUCTION,
            Self::WrongParameter | Self::NoPendingConfirmation => status::WRONG_PARAM,
            Self::WrongLength | Self::SequenceViolation => status::WRONG_LENGTH,
            Self::PacketOverflow
            | Self::MultiPacket
            | Self::UnsupportedMessageTag(_)
            | Self::UnparsedGroup
            | Self::Parse(_)
            | Self::Baking(_) => status::PARSE_ERROR,
            Self::Key(_) | Self::Value => status::WRONG_VALUES,
            Self::Resource(_) | Self::Storage(_) => status::MEMORY_ERROR,
            Self::Security => status::SECURITY,
            Self::Rejected => status::REJECTED,
            Self::SecureElement(_) => status::TECHNICAL_PROBLEM,
        }
    }
}

/// Result type for command handling
pub type Result<T> = std::result::Result<T, CommandError>;
