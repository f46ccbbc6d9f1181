//! Decoder for generic operation groups.
//!
//! An operation group is a 32-byte branch hash followed by a sequence of
//! tagged operation records. Two encoding eras are supported: the legacy
//! era (tags 7-10), where the source of a manager operation is a full
//! discriminated contract, and the current era (tags 107-110), where it is
//! an implicit account. Proposal (5) and ballot (6) are era-independent.
//!
//! Record layouts:
//!
//! - Reveal: source, fee, counter, gas limit, storage limit, public key
//!   (scheme tag + raw key bytes)
//! - Transaction: source, fee, counter, gas limit, storage limit, amount,
//!   destination, optional parameters (entrypoint tag + length + payload)
//! - Origination: source, fee, counter, gas limit, storage limit,
//!   [legacy: manager, balance, spendable, delegatable]
//!   [current: balance], optional delegate, optional script
//! - Delegation: source, fee, counter, gas limit, storage limit, optional
//!   delegate (absent = withdrawal)
//! - Proposal: source, voting period, proposal hash
//! - Ballot: source, voting period, proposal hash, vote
//!
//! Numeric fields use the chain's unsigned base-128 varint encoding; any
//! value that does not fit the target width is a parse failure, while the
//! per-group fee and storage totals saturate instead of wrapping.

use crate::keys::{Curve, PublicKey, PublicKeyHash};
use thiserror::Error;

/// Base58check prefix for originated (KT1) contract addresses.
const ORIGINATED_PREFIX: [u8; 3] = [2, 90, 121];

/// Base58check prefix for protocol hashes.
const PROTOCOL_PREFIX: [u8; 2] = [2, 170];

/// Decode errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Tag byte does not select any known operation
    #[error("Unknown operation tag: {0}")]
    UnknownOperationTag(u8),

    /// Operation kind is recognized but not allowed in this mode
    #[error("Operation kind not allowed: {0:?}")]
    DisallowedOperation(OperationKind),

    /// Buffer ended in the middle of a record
    #[error("Truncated operation data: needed {needed} more bytes, {remaining} left")]
    Truncated {
        /// Bytes the current field still required
        needed: usize,
        /// Bytes actually remaining
        remaining: usize,
    },

    /// Varint does not terminate or exceeds the target width
    #[error("Numeric field overflows its target width")]
    NumberOverflow,

    /// Contract discriminator byte is not implicit or originated
    #[error("Unknown contract discriminator: 0x{0:02X}")]
    UnknownContractKind(u8),

    /// Signature-scheme tag inside an address or key is unknown
    #[error("Unknown signature scheme tag: 0x{0:02X}")]
    UnknownSignatureScheme(u8),

    /// Ballot byte is not yea, nay, or pass
    #[error("Unknown ballot vote: 0x{0:02X}")]
    UnknownBallotVote(u8),

    /// Proposal payload length is not a single 32-byte hash
    #[error("Unsupported proposal payload length: {0}")]
    BadProposalPayload(usize),

    /// Optional-field marker byte is neither present nor absent
    #[error("Invalid option marker: 0x{0:02X}")]
    BadOptionMarker(u8),

    /// A revealed public key does not belong to the signing key
    #[error("Revealed key does not match the signing key")]
    RevealKeyMismatch,

    /// The group contains no operation records
    #[error("Operation group is empty")]
    EmptyGroup,
}

/// Result type for decode operations
pub type Result<T> = std::result::Result<T, ParseError>;

/// Conceptual operation kinds, independent of encoding era.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Publish the public key behind an address
    Reveal,
    /// Transfer between accounts
    Transaction,
    /// Create an originated contract
    Origination,
    /// Delegate (or withdraw delegation of) an account's stake
    Delegation,
    /// Protocol amendment proposal
    Proposal,
    /// Protocol amendment vote
    Ballot,
}

impl OperationKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            5 => Some(Self::Proposal),
            6 => Some(Self::Ballot),
            7 | 107 => Some(Self::Reveal),
            8 | 108 => Some(Self::Transaction),
            9 | 109 => Some(Self::Origination),
            10 | 110 => Some(Self::Delegation),
            _ => None,
        }
    }
}

/// Ballot vote value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotVote {
    /// In favor
    Yea,
    /// Against
    Nay,
    /// Abstain
    Pass,
}

impl BallotVote {
    /// Display label used in confirmation prompts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Yea => "Yea",
            Self::Nay => "Nay",
            Self::Pass => "Pass",
        }
    }
}

/// A decoded address or contract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    /// Implicit account: signature scheme plus public key hash
    Implicit {
        /// Signature curve of the account
        curve: Curve,
        /// 20-byte public key hash
        hash: PublicKeyHash,
    },
    /// Originated contract, addressed by hash alone
    Originated {
        /// 20-byte contract hash
        hash: [u8; 20],
    },
}

impl Contract {
    /// Base58check address string (tz1/tz2/tz3 or KT1).
    #[must_use]
    pub fn to_b58check(&self) -> String {
        match self {
            Self::Implicit { curve, hash } => hash.to_b58check(*curve),
            Self::Originated { hash } => {
                let mut prefixed = ORIGINATED_PREFIX.to_vec();
                prefixed.extend_from_slice(hash);
                bs58::encode(&prefixed).with_check().into_string()
            }
        }
    }
}

/// Base58check rendering of a 32-byte protocol hash.
#[must_use]
pub fn protocol_hash_to_b58check(hash: &[u8; 32]) -> String {
    let mut prefixed = PROTOCOL_PREFIX.to_vec();
    prefixed.extend_from_slice(hash);
    bs58::encode(&prefixed).with_check().into_string()
}

/// One decoded operation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Key reveal
    Reveal {
        /// Account revealing its key
        source: Contract,
        /// The revealed public key
        public_key: PublicKey,
    },
    /// Transfer
    Transaction {
        /// Paying account
        source: Contract,
        /// Receiving account or contract
        destination: Contract,
        /// Amount in the chain's smallest unit
        amount: u64,
        /// True when the transfer carries manager-contract parameters
        is_manager_contract: bool,
    },
    /// Contract origination
    Origination {
        /// Originating account
        source: Contract,
        /// Initial balance of the new contract
        balance: u64,
        /// Optional initial delegate
        delegate: Option<Contract>,
        /// Legacy spendable flag
        spendable: bool,
        /// Legacy delegatable flag
        delegatable: bool,
    },
    /// Delegation change; no delegate means withdrawal
    Delegation {
        /// Delegating account
        source: Contract,
        /// New delegate, or `None` to withdraw
        delegate: Option<Contract>,
    },
    /// Amendment proposal
    Proposal {
        /// Proposing account
        source: Contract,
        /// Voting period index
        voting_period: u32,
        /// Proposed protocol hash
        proposal_hash: [u8; 32],
    },
    /// Amendment vote
    Ballot {
        /// Voting account
        source: Contract,
        /// Voting period index
        voting_period: u32,
        /// Protocol hash voted on
        proposal_hash: [u8; 32],
        /// The vote
        vote: BallotVote,
    },
}

impl Operation {
    /// The kind of this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Reveal { .. } => OperationKind::Reveal,
            Self::Transaction { .. } => OperationKind::Transaction,
            Self::Origination { .. } => OperationKind::Origination,
            Self::Delegation { .. } => OperationKind::Delegation,
            Self::Proposal { .. } => OperationKind::Proposal,
            Self::Ballot { .. } => OperationKind::Ballot,
        }
    }
}

/// A fully decoded, validated operation group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOperationGroup {
    /// The session signing key's own implicit address, for
    /// self-consistency checks
    pub signer: Contract,
    /// The last record in the group; by convention the one
    /// human-meaningful operation, with reveals bundled ahead of it
    pub last_operation: Operation,
    /// Sum of all record fees, saturating
    pub total_fee: u64,
    /// Sum of all record storage limits, saturating
    pub total_storage_limit: u64,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ParseError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32_be(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Unsigned base-128 varint, 7 data bits per byte, high bit continues.
    fn zarith_u64(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.u8()?;
            let payload = u64::from(byte & 0x7F);
            if shift > 63 || (shift == 63 && payload > 1) {
                return Err(ParseError::NumberOverflow);
            }
            value |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }
}

fn parse_hash20(cur: &mut Cursor) -> Result<[u8; 20]> {
    let bytes = cur.take(20)?;
    let mut hash = [0u8; 20];
    hash.copy_from_slice(bytes);
    Ok(hash)
}

fn parse_curve(cur: &mut Cursor) -> Result<Curve> {
    let tag = cur.u8()?;
    Curve::from_selector(tag).map_err(|_| ParseError::UnknownSignatureScheme(tag))
}

/// Implicit account: scheme tag + 20-byte hash (no leading discriminator).
fn parse_implicit(cur: &mut Cursor) -> Result<Contract> {
    let curve = parse_curve(cur)?;
    let hash = PublicKeyHash(parse_hash20(cur)?);
    Ok(Contract::Implicit { curve, hash })
}

/// Discriminated contract: implicit (0x00) or originated (0x01 + padding).
fn parse_contract(cur: &mut Cursor) -> Result<Contract> {
    match cur.u8()? {
        0x00 => parse_implicit(cur),
        0x01 => {
            let hash = parse_hash20(cur)?;
            cur.u8()?; // padding
            Ok(Contract::Originated { hash })
        }
        other => Err(ParseError::UnknownContractKind(other)),
    }
}

/// Optional delegate field: 0x00 absent, 0xFF followed by an implicit
/// account.
fn parse_optional_implicit(cur: &mut Cursor) -> Result<Option<Contract>> {
    match cur.u8()? {
        0x00 => Ok(None),
        0xFF => Ok(Some(parse_implicit(cur)?)),
        other => Err(ParseError::BadOptionMarker(other)),
    }
}

/// Optional length-prefixed blob (scripts, transaction parameters):
/// 0x00 absent, 0xFF followed by a 4-byte length and that many bytes.
fn parse_optional_blob(cur: &mut Cursor) -> Result<bool> {
    match cur.u8()? {
        0x00 => Ok(false),
        0xFF => {
            let len = cur.u32_be()? as usize;
            cur.take(len)?;
            Ok(true)
        }
        other => Err(ParseError::BadOptionMarker(other)),
    }
}

fn parse_public_key(cur: &mut Cursor) -> Result<PublicKey> {
    let curve = parse_curve(cur)?;
    let len = match curve {
        Curve::Ed25519 => 32,
        Curve::Secp256k1 | Curve::P256 => 33,
    };
    Ok(PublicKey(cur.take(len)?.to_vec()))
}

/// Fee, counter, gas limit, storage limit — shared prefix of every manager
/// operation. Returns (fee, `storage_limit`).
fn parse_manager_numbers(cur: &mut Cursor) -> Result<(u64, u64)> {
    let fee = cur.zarith_u64()?;
    let _counter = cur.zarith_u64()?;
    let _gas_limit = cur.zarith_u64()?;
    let storage_limit = cur.zarith_u64()?;
    Ok((fee, storage_limit))
}

struct Record {
    operation: Operation,
    fee: u64,
    storage_limit: u64,
}

fn parse_record(cur: &mut Cursor, signer: &Contract) -> Result<Record> {
    let tag = cur.u8()?;
    let kind = OperationKind::from_tag(tag).ok_or(ParseError::UnknownOperationTag(tag))?;
    let legacy = (7..100).contains(&tag);

    // Amendment operations carry no fees
    match kind {
        OperationKind::Proposal => {
            let source = parse_implicit(cur)?;
            let voting_period = cur.u32_be()?;
            let payload_len = cur.u32_be()? as usize;
            if payload_len != 32 {
                return Err(ParseError::BadProposalPayload(payload_len));
            }
            let mut proposal_hash = [0u8; 32];
            proposal_hash.copy_from_slice(cur.take(32)?);
            return Ok(Record {
                operation: Operation::Proposal {
                    source,
                    voting_period,
                    proposal_hash,
                },
                fee: 0,
                storage_limit: 0,
            });
        }
        OperationKind::Ballot => {
            let source = parse_implicit(cur)?;
            let voting_period = cur.u32_be()?;
            let mut proposal_hash = [0u8; 32];
            proposal_hash.copy_from_slice(cur.take(32)?);
            let vote = match cur.u8()? {
                0x00 => BallotVote::Yea,
                0x01 => BallotVote::Nay,
                0x02 => BallotVote::Pass,
                other => return Err(ParseError::UnknownBallotVote(other)),
            };
            return Ok(Record {
                operation: Operation::Ballot {
                    source,
                    voting_period,
                    proposal_hash,
                    vote,
                },
                fee: 0,
                storage_limit: 0,
            });
        }
        _ => {}
    }

    let source = if legacy {
        parse_contract(cur)?
    } else {
        parse_implicit(cur)?
    };
    let (fee, storage_limit) = parse_manager_numbers(cur)?;

    let operation = match kind {
        OperationKind::Reveal => {
            let public_key = parse_public_key(cur)?;
            let Contract::Implicit { hash, .. } = signer else {
                return Err(ParseError::RevealKeyMismatch);
            };
            if public_key.hash() != *hash {
                return Err(ParseError::RevealKeyMismatch);
            }
            Operation::Reveal { source, public_key }
        }
        OperationKind::Transaction => {
            let amount = cur.zarith_u64()?;
            let destination = parse_contract(cur)?;
            let is_manager_contract = parse_optional_blob(cur)?;
            Operation::Transaction {
                source,
                destination,
                amount,
                is_manager_contract,
            }
        }
        OperationKind::Origination => {
            let (balance, spendable, delegatable) = if legacy {
                // Legacy origination names a manager before the balance
                // and carries explicit spendability flags.
                parse_implicit(cur)?;
                let balance = cur.zarith_u64()?;
                let spendable = cur.u8()? != 0;
                let delegatable = cur.u8()? != 0;
                (balance, spendable, delegatable)
            } else {
                (cur.zarith_u64()?, false, false)
            };
            let delegate = parse_optional_implicit(cur)?;
            parse_optional_blob(cur)?; // script
            Operation::Origination {
                source,
                balance,
                delegate,
                spendable,
                delegatable,
            }
        }
        OperationKind::Delegation => {
            let delegate = parse_optional_implicit(cur)?;
            Operation::Delegation { source, delegate }
        }
        OperationKind::Proposal | OperationKind::Ballot => unreachable!(),
    };

    Ok(Record {
        operation,
        fee,
        storage_limit,
    })
}

/// Decode an operation group.
///
/// `signer` is the implicit address of the session's signing key, used for
/// the reveal self-consistency check and recorded in the result. `allow`
/// is the mode's operation-kind predicate; a disallowed kind anywhere in
/// the group fails the whole parse.
pub fn parse_operation_group(
    data: &[u8],
    signer: Contract,
    allow: impl Fn(OperationKind) -> bool,
) -> Result<ParsedOperationGroup> {
    let mut cur = Cursor::new(data);
    cur.take(32)?; // branch hash, not retained

    let mut last_operation: Option<Operation> = None;
    let mut total_fee: u64 = 0;
    let mut total_storage_limit: u64 = 0;

    while !cur.at_end() {
        let record = parse_record(&mut cur, &signer)?;
        let kind = record.operation.kind();
        if !allow(kind) {
            return Err(ParseError::DisallowedOperation(kind));
        }
        total_fee = total_fee.saturating_add(record.fee);
        total_storage_limit = total_storage_limit.saturating_add(record.storage_limit);
        last_operation = Some(record.operation);
    }

    let last_operation = last_operation.ok_or(ParseError::EmptyGroup)?;
    Ok(ParsedOperationGroup {
        signer,
        last_operation,
        total_fee,
        total_storage_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        delegation_record, group, implicit, proposal_record, reveal_record, transaction_record,
        zarith,
    };

    fn signer_contract() -> Contract {
        implicit(Curve::Ed25519, [0xAA; 20])
    }

    #[test]
    fn test_zarith_single_byte() {
        let mut cur = Cursor::new(&[0x64]);
        assert_eq!(cur.zarith_u64().unwrap(), 100);
        assert!(cur.at_end());
    }

    #[test]
    fn test_zarith_multi_byte() {
        // 250 = 0xFA -> 0x7A | 0x80, 0x01
        let mut cur = Cursor::new(&[0xFA, 0x01]);
        assert_eq!(cur.zarith_u64().unwrap(), 250);

        let mut cur = Cursor::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert_eq!(cur.zarith_u64().unwrap(), u64::MAX);
    }

    #[test]
    fn test_zarith_overflow_rejected() {
        // One bit past 64
        let mut cur = Cursor::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02]);
        assert!(matches!(cur.zarith_u64(), Err(ParseError::NumberOverflow)));
    }

    #[test]
    fn test_zarith_unterminated_rejected() {
        let mut cur = Cursor::new(&[0x80, 0x80]);
        assert!(cur.zarith_u64().is_err());
    }

    #[test]
    fn test_transaction_roundtrip() {
        let source = implicit(Curve::Ed25519, [0x11; 20]);
        let destination = implicit(Curve::Secp256k1, [0x22; 20]);
        let body = transaction_record(&source, &destination, 5000, 100, 77);
        let data = group(&[body]);

        let parsed = parse_operation_group(&data, signer_contract(), |_| true).unwrap();
        assert_eq!(parsed.total_fee, 100);
        assert_eq!(parsed.total_storage_limit, 77);
        match parsed.last_operation {
            Operation::Transaction {
                source: s,
                destination: d,
                amount,
                is_manager_contract,
            } => {
                assert_eq!(s, source);
                assert_eq!(d, destination);
                assert_eq!(amount, 5000);
                assert!(!is_manager_contract);
            }
            other => panic!("expected transaction, got {other:?}"),
        }
    }

    #[test]
    fn test_fee_totals_accumulate() {
        let a = implicit(Curve::Ed25519, [0x11; 20]);
        let b = implicit(Curve::Ed25519, [0x22; 20]);
        let first = transaction_record(&a, &b, 1, 100, 10);
        let second = transaction_record(&a, &b, 2, 250, 20);
        let data = group(&[first, second]);

        let parsed = parse_operation_group(&data, signer_contract(), |_| true).unwrap();
        assert_eq!(parsed.total_fee, 350);
        assert_eq!(parsed.total_storage_limit, 30);
        // Last record wins
        assert!(matches!(
            parsed.last_operation,
            Operation::Transaction { amount: 2, .. }
        ));
    }

    #[test]
    fn test_disallowed_kind_rejected() {
        let a = implicit(Curve::Ed25519, [0x11; 20]);
        let b = implicit(Curve::Ed25519, [0x22; 20]);
        let data = group(&[transaction_record(&a, &b, 1, 1, 1)]);

        let result = parse_operation_group(&data, signer_contract(), |kind| {
            matches!(kind, OperationKind::Reveal | OperationKind::Delegation)
        });
        assert!(matches!(
            result,
            Err(ParseError::DisallowedOperation(OperationKind::Transaction))
        ));
    }

    #[test]
    fn test_delegation_and_withdrawal() {
        let source = implicit(Curve::Ed25519, [0x11; 20]);
        let delegate = implicit(Curve::Ed25519, [0x33; 20]);

        let data = group(&[delegation_record(&source, Some(&delegate), 200, 0)]);
        let parsed = parse_operation_group(&data, signer_contract(), |_| true).unwrap();
        assert_eq!(
            parsed.last_operation,
            Operation::Delegation {
                source,
                delegate: Some(delegate),
            }
        );

        let data = group(&[delegation_record(&source, None, 200, 0)]);
        let parsed = parse_operation_group(&data, signer_contract(), |_| true).unwrap();
        assert_eq!(
            parsed.last_operation,
            Operation::Delegation {
                source,
                delegate: None,
            }
        );
    }

    #[test]
    fn test_reveal_requires_signing_key() {
        let own_key = PublicKey(vec![0x99; 32]);
        let signer = Contract::Implicit {
            curve: Curve::Ed25519,
            hash: own_key.hash(),
        };
        let source = implicit(Curve::Ed25519, [0x11; 20]);

        // A reveal of the signer's own key parses
        let data = group(&[reveal_record(&source, &own_key)]);
        assert!(parse_operation_group(&data, signer, |_| true).is_ok());

        // A reveal of any other key fails
        let foreign = PublicKey(vec![0x55; 32]);
        let data = group(&[reveal_record(&source, &foreign)]);
        assert!(matches!(
            parse_operation_group(&data, signer, |_| true),
            Err(ParseError::RevealKeyMismatch)
        ));
    }

    #[test]
    fn test_proposal_roundtrip() {
        let source = implicit(Curve::P256, [0x11; 20]);
        let data = group(&[proposal_record(&source, 12, &[0x77; 32])]);
        let parsed = parse_operation_group(&data, signer_contract(), |_| true).unwrap();
        assert_eq!(
            parsed.last_operation,
            Operation::Proposal {
                source,
                voting_period: 12,
                proposal_hash: [0x77; 32],
            }
        );
        assert_eq!(parsed.total_fee, 0);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut data = vec![0u8; 32];
        data.push(42); // no such operation
        assert!(matches!(
            parse_operation_group(&data, signer_contract(), |_| true),
            Err(ParseError::UnknownOperationTag(42))
        ));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let source = implicit(Curve::Ed25519, [0x11; 20]);
        let destination = implicit(Curve::Ed25519, [0x22; 20]);
        let body = transaction_record(&source, &destination, 5000, 100, 77);
        let mut data = group(&[body]);
        data.truncate(data.len() - 3);
        assert!(matches!(
            parse_operation_group(&data, signer_contract(), |_| true),
            Err(ParseError::Truncated { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let source = implicit(Curve::Ed25519, [0x11; 20]);
        let destination = implicit(Curve::Ed25519, [0x22; 20]);
        let mut data = group(&[transaction_record(&source, &destination, 1, 1, 1)]);
        data.push(0xFE); // not a known tag, not a complete record
        assert!(parse_operation_group(&data, signer_contract(), |_| true).is_err());
    }

    #[test]
    fn test_empty_group_rejected() {
        let data = vec![0u8; 32]; // branch only
        assert!(matches!(
            parse_operation_group(&data, signer_contract(), |_| true),
            Err(ParseError::EmptyGroup)
        ));
    }

    #[test]
    fn test_short_branch_rejected() {
        let data = vec![0u8; 10];
        assert!(matches!(
            parse_operation_group(&data, signer_contract(), |_| true),
            Err(ParseError::Truncated { .. })
        ));
    }

    #[test]
    fn test_manager_parameters_set_flag() {
        let source = implicit(Curve::Ed25519, [0x11; 20]);
        let destination = Contract::Originated { hash: [0x44; 20] };
        let mut body = Vec::new();
        body.push(108u8);
        body.push(Curve::Ed25519.id());
        body.extend_from_slice(&[0x11; 20]);
        body.extend(zarith(10)); // fee
        body.extend(zarith(1)); // counter
        body.extend(zarith(0)); // gas
        body.extend(zarith(0)); // storage
        body.extend(zarith(0)); // amount
        body.push(0x01); // originated destination
        body.extend_from_slice(&[0x44; 20]);
        body.push(0x00); // padding
        body.push(0xFF); // parameters present
        body.extend_from_slice(&4u32.to_be_bytes());
        body.extend_from_slice(&[1, 2, 3, 4]);

        let data = group(&[body]);
        let parsed = parse_operation_group(&data, signer_contract(), |_| true).unwrap();
        assert_eq!(
            parsed.last_operation,
            Operation::Transaction {
                source,
                destination,
                amount: 0,
                is_manager_contract: true,
            }
        );
    }

    #[test]
    fn test_contract_rendering() {
        let tz = implicit(Curve::Ed25519, [0u8; 20]).to_b58check();
        assert!(tz.starts_with("tz1"), "{tz}");
        let kt = Contract::Originated { hash: [0u8; 20] }.to_b58check();
        assert!(kt.starts_with("KT1"), "{kt}");
    }
}
