//! Test utilities: wire-format builders for blocks, endorsements, and
//! operation groups, plus a deterministic software secure element.
//!
//! These produce properly formatted binary data for exercising the
//! decoders, the anti-equivocation guard, and full multi-packet signing
//! flows without hardware.

use crate::keys::{Bip32Path, Curve, PublicKey};
use crate::magic_bytes::MessageTag;
use crate::operations::Contract;
use crate::secure_element::{Result as SeResult, SecureElement};
use blake2::digest::consts::{U32, U64};
use blake2::{Blake2b, Digest};

/// Deterministic in-software secure element.
///
/// Public keys and signatures are Blake2b images of the curve, path, and
/// message, so every test sees stable, collision-free values without any
/// real cryptography.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftVault;

impl SoftVault {
    /// Create a vault.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SecureElement for SoftVault {
    fn public_key(&mut self, curve: Curve, path: &Bip32Path) -> SeResult<PublicKey> {
        let mut hasher = Blake2b::<U32>::new();
        hasher.update([0x50, curve.id()]);
        for segment in path.segments() {
            hasher.update(segment.to_be_bytes());
        }
        Ok(PublicKey(hasher.finalize().to_vec()))
    }

    fn sign(&mut self, curve: Curve, path: &Bip32Path, message: &[u8]) -> SeResult<Vec<u8>> {
        let mut hasher = Blake2b::<U64>::new();
        hasher.update([0x53, curve.id()]);
        for segment in path.segments() {
            hasher.update(segment.to_be_bytes());
        }
        hasher.update(message);
        Ok(hasher.finalize().to_vec())
    }
}

/// Implicit-account contract from raw hash bytes.
#[must_use]
pub fn implicit(curve: Curve, hash: [u8; 20]) -> Contract {
    Contract::Implicit {
        curve,
        hash: crate::keys::PublicKeyHash(hash),
    }
}

/// Wire form of a BIP32 path: count byte + big-endian segments.
#[must_use]
pub fn path_wire(segments: &[u32]) -> Vec<u8> {
    let mut out = vec![segments.len() as u8];
    for segment in segments {
        out.extend_from_slice(&segment.to_be_bytes());
    }
    out
}

/// Assemble a raw APDU: class, instruction, P1, P2, length, payload.
#[must_use]
pub fn apdu_packet(instruction: u8, p1: u8, p2: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![crate::apdu::CLA, instruction, p1, p2, payload.len() as u8];
    out.extend_from_slice(payload);
    out
}

/// Block header bytes at `level`: tag, chain id, level, protocol version.
#[must_use]
pub fn make_block(level: u32) -> Vec<u8> {
    let mut data = vec![MessageTag::Block.byte()];
    data.extend_from_slice(&[0, 0, 0, 1]); // chain id
    data.extend_from_slice(&level.to_be_bytes());
    data.push(4); // protocol version
    data
}

/// Endorsement bytes at `level`: tag, chain id, branch, inner tag, level.
#[must_use]
pub fn make_endorsement(level: u32) -> Vec<u8> {
    let mut data = vec![MessageTag::Endorsement.byte()];
    data.extend_from_slice(&[0, 0, 0, 1]); // chain id
    data.extend_from_slice(&[0u8; 32]); // branch
    data.push(0); // inner endorsement tag
    data.extend_from_slice(&level.to_be_bytes());
    data
}

/// Unsigned base-128 varint encoding.
#[must_use]
pub fn zarith(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// 21-byte implicit-account encoding (scheme tag + hash), used for
/// current-era operation sources and delegates.
///
/// # Panics
/// Panics when handed an originated contract.
#[must_use]
pub fn implicit_bytes(contract: &Contract) -> Vec<u8> {
    match contract {
        Contract::Implicit { curve, hash } => {
            let mut out = vec![curve.id()];
            out.extend_from_slice(hash.as_bytes());
            out
        }
        Contract::Originated { .. } => panic!("expected an implicit account"),
    }
}

/// 22-byte discriminated contract encoding.
#[must_use]
pub fn contract_bytes(contract: &Contract) -> Vec<u8> {
    match contract {
        Contract::Implicit { .. } => {
            let mut out = vec![0x00];
            out.extend(implicit_bytes(contract));
            out
        }
        Contract::Originated { hash } => {
            let mut out = vec![0x01];
            out.extend_from_slice(hash);
            out.push(0x00); // padding
            out
        }
    }
}

/// Current-era transaction record without parameters.
#[must_use]
pub fn transaction_record(
    source: &Contract,
    destination: &Contract,
    amount: u64,
    fee: u64,
    storage_limit: u64,
) -> Vec<u8> {
    let mut out = vec![108u8];
    out.extend(implicit_bytes(source));
    out.extend(zarith(fee));
    out.extend(zarith(1)); // counter
    out.extend(zarith(0)); // gas limit
    out.extend(zarith(storage_limit));
    out.extend(zarith(amount));
    out.extend(contract_bytes(destination));
    out.push(0x00); // no parameters
    out
}

/// Current-era delegation record; `delegate` of `None` is a withdrawal.
#[must_use]
pub fn delegation_record(
    source: &Contract,
    delegate: Option<&Contract>,
    fee: u64,
    storage_limit: u64,
) -> Vec<u8> {
    let mut out = vec![110u8];
    out.extend(implicit_bytes(source));
    out.extend(zarith(fee));
    out.extend(zarith(1)); // counter
    out.extend(zarith(0)); // gas limit
    out.extend(zarith(storage_limit));
    match delegate {
        Some(contract) => {
            out.push(0xFF);
            out.extend(implicit_bytes(contract));
        }
        None => out.push(0x00),
    }
    out
}

/// Current-era reveal record for a 32-byte Ed25519 public key.
#[must_use]
pub fn reveal_record(source: &Contract, public_key: &PublicKey) -> Vec<u8> {
    let mut out = vec![107u8];
    out.extend(implicit_bytes(source));
    out.extend(zarith(0)); // fee
    out.extend(zarith(1)); // counter
    out.extend(zarith(0)); // gas limit
    out.extend(zarith(0)); // storage limit
    out.push(Curve::Ed25519.id());
    out.extend_from_slice(&public_key.0);
    out
}

/// Proposal record with a single proposal hash.
#[must_use]
pub fn proposal_record(source: &Contract, voting_period: u32, hash: &[u8; 32]) -> Vec<u8> {
    let mut out = vec![5u8];
    out.extend(implicit_bytes(source));
    out.extend_from_slice(&voting_period.to_be_bytes());
    out.extend_from_slice(&32u32.to_be_bytes());
    out.extend_from_slice(hash);
    out
}

/// Ballot record.
#[must_use]
pub fn ballot_record(
    source: &Contract,
    voting_period: u32,
    hash: &[u8; 32],
    vote: u8,
) -> Vec<u8> {
    let mut out = vec![6u8];
    out.extend(implicit_bytes(source));
    out.extend_from_slice(&voting_period.to_be_bytes());
    out.extend_from_slice(hash);
    out.push(vote);
    out
}

/// Operation group body: a zero branch hash followed by `records`.
/// The signable message is this prefixed with the group message tag.
#[must_use]
pub fn group(records: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0u8; 32];
    for record in records {
        out.extend_from_slice(record);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zarith_known_values() {
        assert_eq!(zarith(0), vec![0x00]);
        assert_eq!(zarith(100), vec![0x64]);
        assert_eq!(zarith(127), vec![0x7F]);
        assert_eq!(zarith(128), vec![0x80, 0x01]);
        assert_eq!(zarith(250), vec![0xFA, 0x01]);
    }

    #[test]
    fn test_block_layout() {
        let data = make_block(7);
        assert_eq!(data[0], 0x01);
        assert_eq!(u32::from_be_bytes([data[5], data[6], data[7], data[8]]), 7);
    }

    #[test]
    fn test_endorsement_layout() {
        let data = make_endorsement(9);
        assert_eq!(data.len(), 42);
        assert_eq!(data[0], 0x02);
        assert_eq!(
            u32::from_be_bytes([data[38], data[39], data[40], data[41]]),
            9
        );
    }

    #[test]
    fn test_soft_vault_is_deterministic() {
        let mut vault = SoftVault::new();
        let path = Bip32Path::new(&[0x8000_002C]).unwrap();
        let pk1 = vault.public_key(Curve::Ed25519, &path).unwrap();
        let pk2 = vault.public_key(Curve::Ed25519, &path).unwrap();
        assert_eq!(pk1, pk2);

        let other = vault.public_key(Curve::P256, &path).unwrap();
        assert_ne!(pk1, other);

        let sig1 = vault.sign(Curve::Ed25519, &path, b"message").unwrap();
        let sig2 = vault.sign(Curve::Ed25519, &path, b"message").unwrap();
        assert_eq!(sig1, sig2);
        assert_eq!(sig1.len(), 64);
    }
}
