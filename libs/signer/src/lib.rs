//! Transaction-signing core for a Tezos hardware signer.
//!
//! An untrusted host streams a candidate block, endorsement, or operation
//! group to the device over a byte-oriented command protocol; this crate
//! decides whether it is safe to sign and, if so, produces a signature
//! through an isolated secure element. Its central duty beyond plain
//! signing is anti-equivocation: no matter what the host sends, the
//! device never signs two blocks, or two endorsements, for the same
//! consensus level.
//!
//! # Architecture
//!
//! - [`hashing`] — incremental Blake2b over multi-packet messages
//! - [`operations`] — decoder for the chain's tagged operation groups
//! - [`baking`] + [`high_watermark`] — consensus-message decoding and the
//!   persisted anti-double-signing guard
//! - [`session`] — the command state machine tying it all together
//! - [`secure_element`] — the seam behind which keys live
//!
//! # Example
//!
//! ```rust
//! use verrou_signer::test_utils::{SoftVault, apdu_packet, path_wire};
//! use verrou_signer::{AppMode, CommandHandler, Reply};
//! use verrou_storage::MemoryStore;
//!
//! let mut handler =
//!     CommandHandler::new(AppMode::Wallet, SoftVault::new(), MemoryStore::new()).unwrap();
//!
//! // Ask for the public key at m/44'/1729'
//! let path = path_wire(&[0x8000_002C, 0x8000_06C1]);
//! let apdu = apdu_packet(0x02, 0, 0, &path);
//! match handler.handle(&apdu).unwrap() {
//!     Reply::Ack(payload) => assert_eq!(payload[0] as usize, payload.len() - 1),
//!     Reply::Pending(_) => unreachable!(),
//! }
//! ```

#![warn(missing_docs)]

pub mod apdu;
pub mod baking;
pub mod hashing;
pub mod high_watermark;
pub mod keys;
pub mod magic_bytes;
pub mod mode;
pub mod operations;
pub mod secure_element;
pub mod session;
/// Test utilities for building wire-format messages and driving sessions
pub mod test_utils;

// Re-export commonly used types
pub use apdu::{Command, CommandError, Instruction, status};
pub use baking::{BakingParseError, ParsedBakingData};
pub use hashing::{HashError, IncrementalHasher};
pub use high_watermark::{AuthorizedBakingKey, SecurityError, WatermarkError};
pub use keys::{Bip32Path, Curve, KeyError, KeySelector, PublicKey, PublicKeyHash};
pub use magic_bytes::MessageTag;
pub use mode::AppMode;
pub use operations::{
    Contract, Operation, OperationKind, ParseError, ParsedOperationGroup, parse_operation_group,
};
pub use secure_element::{SecureElement, SecureElementError};
pub use session::{CommandHandler, ConfirmationRequest, PromptField, Reply};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
