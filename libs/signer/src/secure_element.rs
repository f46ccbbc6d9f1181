//! Secure-element seam.
//!
//! Key derivation and the raw signature primitive live in an isolated
//! element provided by the platform. The core never sees key material; it
//! asks for the public key behind a derivation path and for signatures
//! over prepared bytes.

use crate::keys::{Bip32Path, Curve, PublicKey};
use thiserror::Error;

/// Secure-element errors
#[derive(Error, Debug)]
pub enum SecureElementError {
    /// The element could not derive a key for this curve/path
    #[error("Key derivation failed: {0}")]
    Derivation(String),

    /// The element refused or failed the signature
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Result type for secure-element operations
pub type Result<T> = std::result::Result<T, SecureElementError>;

/// The isolated signing device.
pub trait SecureElement {
    /// Public key for the key at `path` on `curve`.
    fn public_key(&mut self, curve: Curve, path: &Bip32Path) -> Result<PublicKey>;

    /// Sign `message` (already hashed or raw, caller's choice) with the
    /// key at `path` on `curve`.
    fn sign(&mut self, curve: Curve, path: &Bip32Path, message: &[u8]) -> Result<Vec<u8>>;
}
