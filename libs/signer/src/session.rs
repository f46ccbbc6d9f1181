//! The signing session state machine.
//!
//! A sign command arrives as a sequence of packets: a first packet naming
//! the key, content packets that are accumulated and incrementally hashed,
//! and a final packet that triggers classification, authorization, and —
//! directly or after user confirmation — the signature. The session value
//! holds everything accumulated for the in-flight command and is replaced
//! wholesale on completion, rejection, or any error, so no state leaks
//! between command sequences.
//!
//! Confirmation is two-phase: when a prompt is required the handler
//! returns [`Reply::Pending`] and parks the planned action; the caller
//! reports the user's decision through [`CommandHandler::resolve`], which
//! finishes or abandons the pending operation.

use crate::apdu::{self, Command, CommandError, Instruction, Result, p1};
use crate::baking::{self, ParsedBakingData, is_valid_level};
use crate::hashing::{BLOCK_BYTES, DIGEST_SIZE, IncrementalHasher};
use crate::high_watermark::AuthorizedBakingKey;
use crate::keys::{Bip32Path, Curve, KeyError, KeySelector, digest_to_base58};
use crate::magic_bytes::MessageTag;
use crate::mode::AppMode;
use crate::operations::{
    Contract, Operation, ParsedOperationGroup, parse_operation_group, protocol_hash_to_b58check,
};
use crate::secure_element::SecureElement;
use verrou_storage::RecordStore;

/// Capacity of the session's staging buffer: one packet of new content on
/// top of an incremental-hash tail that is always shorter than one block.
pub const MAX_MESSAGE_SIZE: usize = apdu::MAX_PACKET_SIZE + BLOCK_BYTES;

/// One labelled line of a confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptField {
    /// Short label ("Amount", "Destination", ...)
    pub label: String,
    /// Preformatted value
    pub value: String,
}

impl PromptField {
    fn new(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
        }
    }
}

/// A confirmation request handed to the display collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    /// Prompt headline
    pub title: String,
    /// Labelled values summarizing what will be signed
    pub fields: Vec<PromptField>,
}

/// Outcome of one handled command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The command completed; respond with this payload and a success
    /// status
    Ack(Vec<u8>),
    /// A confirmation prompt must be shown; the reply is produced by
    /// [`CommandHandler::resolve`]
    Pending(ConfirmationRequest),
}

/// What to do once the user accepts a pending prompt.
enum PendingAction {
    Sign { over: SignOver, send_hash: bool },
    Authorize { key: KeySelector, starting_level: u32 },
    ResetLevel { level: u32 },
}

enum SignOver {
    Digest,
    RawMessage,
}

/// All state accumulated for one in-flight command sequence.
struct Session {
    key: Option<KeySelector>,
    packet_index: u8,
    message_tag: Option<MessageTag>,
    staging: Vec<u8>,
    hasher: IncrementalHasher,
    final_digest: Option<[u8; DIGEST_SIZE]>,
    operations: Option<ParsedOperationGroup>,
    baking_data: Option<ParsedBakingData>,
    hash_only: bool,
    pending: Option<PendingAction>,
}

impl Session {
    fn new() -> Self {
        Self {
            key: None,
            packet_index: 0,
            message_tag: None,
            staging: Vec::with_capacity(MAX_MESSAGE_SIZE),
            hasher: IncrementalHasher::new(MAX_MESSAGE_SIZE),
            final_digest: None,
            operations: None,
            baking_data: None,
            hash_only: false,
            pending: None,
        }
    }
}

/// The command handler: operating mode, collaborators, and the session.
pub struct CommandHandler<V, S: RecordStore> {
    mode: AppMode,
    vault: V,
    guard: AuthorizedBakingKey<S>,
    session: Session,
}

impl<V: SecureElement, S: RecordStore> CommandHandler<V, S> {
    /// Create a handler in `mode` over a secure element and record store.
    pub fn new(mode: AppMode, vault: V, store: S) -> Result<Self> {
        Ok(Self {
            mode,
            vault,
            guard: AuthorizedBakingKey::open(store)?,
            session: Session::new(),
        })
    }

    /// The configured operating mode.
    #[must_use]
    pub fn mode(&self) -> AppMode {
        self.mode
    }

    /// The anti-equivocation guard (read access, for status display).
    #[must_use]
    pub fn guard(&self) -> &AuthorizedBakingKey<S> {
        &self.guard
    }

    /// Process one raw APDU. Any error resets the session before it is
    /// returned.
    pub fn handle(&mut self, raw: &[u8]) -> Result<Reply> {
        let result = self.handle_command(raw);
        if result.is_err() {
            self.session = Session::new();
        }
        result
    }

    /// Deliver the user's decision for a pending confirmation. Accepting
    /// completes the parked operation; cancelling reports
    /// [`CommandError::Rejected`]. Either way the session is cleared.
    pub fn resolve(&mut self, accepted: bool) -> Result<Vec<u8>> {
        let Some(pending) = self.session.pending.take() else {
            return Err(CommandError::NoPendingConfirmation);
        };
        let result = if accepted {
            self.execute_pending(pending)
        } else {
            log::debug!("User cancelled the pending operation");
            Err(CommandError::Rejected)
        };
        self.session = Session::new();
        result
    }

    fn handle_command(&mut self, raw: &[u8]) -> Result<Reply> {
        let cmd = Command::parse(raw)?;
        match cmd.instruction {
            Instruction::GetPublicKey => self.handle_get_public_key(&cmd),
            Instruction::AuthorizeBaking => self.handle_authorize_baking(&cmd),
            Instruction::ResetHighWaterMark => self.handle_reset_watermark(&cmd),
            Instruction::Sign | Instruction::SignWithHash | Instruction::SignUnsafe => {
                self.handle_sign(&cmd)
            }
        }
    }

    fn handle_get_public_key(&mut self, cmd: &Command) -> Result<Reply> {
        if cmd.p1 != 0 {
            return Err(CommandError::WrongParameter);
        }
        let curve = Curve::from_selector(cmd.p2).map_err(|_| CommandError::WrongParameter)?;
        let path = Bip32Path::from_wire(cmd.payload)?;

        // Any other instruction abandons an in-flight sign sequence
        self.session = Session::new();

        let public_key = self.vault.public_key(curve, &path)?;
        let mut response = Vec::with_capacity(1 + public_key.0.len());
        response.push(public_key.0.len() as u8);
        response.extend_from_slice(&public_key.0);
        Ok(Reply::Ack(response))
    }

    fn handle_authorize_baking(&mut self, cmd: &Command) -> Result<Reply> {
        if self.mode != AppMode::Baking {
            return Err(CommandError::UnknownInstruction(cmd.instruction.byte()));
        }
        if cmd.p1 != 0 {
            return Err(CommandError::WrongParameter);
        }
        let curve = Curve::from_selector(cmd.p2).map_err(|_| CommandError::WrongParameter)?;
        if cmd.payload.len() < 4 {
            return Err(CommandError::WrongLength);
        }
        let starting_level = u32::from_be_bytes([
            cmd.payload[0],
            cmd.payload[1],
            cmd.payload[2],
            cmd.payload[3],
        ]);
        if !is_valid_level(starting_level) {
            return Err(baking::BakingParseError::ReservedLevel(starting_level).into());
        }
        let path = Bip32Path::from_wire(&cmd.payload[4..])?;
        if path.is_empty() {
            return Err(KeyError::InvalidPath("empty derivation path".to_string()).into());
        }
        let key = KeySelector { curve, path };

        self.session = Session::new();
        let public_key = self.vault.public_key(curve, &path)?;
        let address = public_key.hash().to_b58check(curve);

        self.session.pending = Some(PendingAction::Authorize {
            key,
            starting_level,
        });
        Ok(Reply::Pending(ConfirmationRequest {
            title: "Authorize baking?".to_string(),
            fields: vec![
                PromptField::new("Public Key", address),
                PromptField::new("Start Level", starting_level.to_string()),
            ],
        }))
    }

    fn handle_reset_watermark(&mut self, cmd: &Command) -> Result<Reply> {
        if self.mode != AppMode::Baking {
            return Err(CommandError::UnknownInstruction(cmd.instruction.byte()));
        }
        if cmd.p1 != 0 {
            return Err(CommandError::WrongParameter);
        }
        if cmd.payload.len() != 4 {
            return Err(CommandError::WrongLength);
        }
        let level = u32::from_be_bytes([
            cmd.payload[0],
            cmd.payload[1],
            cmd.payload[2],
            cmd.payload[3],
        ]);
        if !is_valid_level(level) {
            return Err(baking::BakingParseError::ReservedLevel(level).into());
        }

        self.session = Session::new();
        self.session.pending = Some(PendingAction::ResetLevel { level });
        Ok(Reply::Pending(ConfirmationRequest {
            title: "Reset high-water mark?".to_string(),
            fields: vec![PromptField::new("Level", level.to_string())],
        }))
    }

    fn handle_sign(&mut self, cmd: &Command) -> Result<Reply> {
        if cmd.instruction == Instruction::SignUnsafe && self.mode == AppMode::Baking {
            return Err(CommandError::UnknownInstruction(cmd.instruction.byte()));
        }
        let enable_hashing = cmd.instruction != Instruction::SignUnsafe;
        let last = cmd.p1 & p1::LAST_MARKER != 0;

        match cmd.p1 & !p1::LAST_MARKER {
            p1::FIRST => {
                let curve =
                    Curve::from_selector(cmd.p2).map_err(|_| CommandError::WrongParameter)?;
                let path = Bip32Path::from_wire(cmd.payload)?;
                if path.is_empty() {
                    return Err(
                        KeyError::InvalidPath("empty derivation path".to_string()).into()
                    );
                }
                self.session = Session::new();
                self.session.key = Some(KeySelector { curve, path });
                return Ok(Reply::Ack(Vec::new()));
            }
            p1::NEXT => {}
            p1::HASH_ONLY_NEXT if self.mode == AppMode::Wallet => {
                self.session.hash_only = true;
            }
            _ => return Err(CommandError::WrongParameter),
        }

        let Some(key) = self.session.key else {
            return Err(CommandError::SequenceViolation);
        };
        self.session.packet_index = self
            .session
            .packet_index
            .checked_add(1)
            .ok_or(CommandError::PacketOverflow)?;

        if enable_hashing {
            self.classify_and_parse(&key, cmd.payload)?;
        }

        if enable_hashing {
            // Hash the content of previous packets before staging this one
            self.session.hasher.feed(&mut self.session.staging)?;
        }
        if self.session.staging.len() + cmd.payload.len() > MAX_MESSAGE_SIZE {
            return Err(CommandError::WrongLength);
        }
        self.session.staging.extend_from_slice(cmd.payload);

        if !last {
            return Ok(Reply::Ack(Vec::new()));
        }

        if enable_hashing {
            let digest = self.session.hasher.finish(&mut self.session.staging)?;
            self.session.final_digest = Some(digest);
        }

        match self.mode {
            AppMode::Baking => self.baking_sign_complete(&key, cmd.instruction),
            AppMode::Wallet => self.wallet_sign_complete(cmd.instruction),
        }
    }

    /// Classify the message on its first content packet and run the
    /// matching decoder. Later packets invalidate any prior group decode:
    /// a group must arrive whole.
    fn classify_and_parse(&mut self, key: &KeySelector, payload: &[u8]) -> Result<()> {
        if self.mode == AppMode::Baking && self.session.packet_index != 1 {
            return Err(CommandError::MultiPacket);
        }
        if self.session.packet_index != 1 {
            self.session.operations = None;
            return Ok(());
        }

        let tag_byte = payload.first().copied().unwrap_or(0);
        let tag = MessageTag::from_byte(tag_byte)
            .filter(|tag| self.mode.accepts_message(*tag))
            .ok_or(CommandError::UnsupportedMessageTag(tag_byte))?;
        self.session.message_tag = Some(tag);

        if tag == MessageTag::OperationGroup {
            let signer = self.signer_contract(key)?;
            let mode = self.mode;
            // A failed group decode is a classification outcome, not a
            // command failure: the message falls back to the unparsed
            // path, where validator mode refuses it and wallet mode shows
            // the bare digest. The decoder starts at the branch hash,
            // after the tag byte.
            self.session.operations =
                parse_operation_group(&payload[1..], signer, |kind| mode.allows_operation(kind))
                    .inspect_err(|e| log::debug!("Operation group did not parse: {e}"))
                    .ok();
        } else {
            self.session.baking_data = Some(baking::parse_baking_data(payload)?);
        }
        Ok(())
    }

    fn baking_sign_complete(&mut self, key: &KeySelector, instruction: Instruction) -> Result<Reply> {
        let send_hash = instruction == Instruction::SignWithHash;
        match self.session.message_tag {
            Some(MessageTag::Block | MessageTag::Endorsement) => {
                let candidate = self
                    .session
                    .baking_data
                    .ok_or(CommandError::Security)?;
                self.guard.guard_baking_authorized(key, &candidate)?;

                // Authorization was granted at registration time; no
                // prompt for routine baking. Sign first, then advance.
                let digest = self.session.final_digest.ok_or(CommandError::Security)?;
                let signature = self.vault.sign(key.curve, &key.path, &digest)?;
                self.guard
                    .advance_watermark(candidate.level, candidate.is_endorsement)?;

                let mut response = Vec::new();
                if send_hash {
                    response.extend_from_slice(&digest);
                }
                response.extend_from_slice(&signature);
                self.session = Session::new();
                Ok(Reply::Ack(response))
            }
            Some(MessageTag::OperationGroup) => {
                let Some(group) = self.session.operations.clone() else {
                    return Err(CommandError::UnparsedGroup);
                };
                // The one operation group a validator signs: registering
                // itself as its own delegate, with the authorized key.
                let is_self_delegation = matches!(
                    &group.last_operation,
                    Operation::Delegation {
                        source,
                        delegate: Some(delegate),
                    } if *source == group.signer && *delegate == group.signer
                );
                if !self.guard.is_key_authorized(key) || !is_self_delegation {
                    log::debug!("Refusing operation group in validator mode");
                    return Err(CommandError::Security);
                }

                self.session.pending = Some(PendingAction::Sign {
                    over: SignOver::Digest,
                    send_hash,
                });
                Ok(Reply::Pending(ConfirmationRequest {
                    title: "Register as delegate?".to_string(),
                    fields: vec![
                        PromptField::new("Address", group.signer.to_b58check()),
                        PromptField::new("Fee", group.total_fee.to_string()),
                    ],
                }))
            }
            Some(tag) => Err(CommandError::UnsupportedMessageTag(tag.byte())),
            None => Err(CommandError::UnsupportedMessageTag(0)),
        }
    }

    fn wallet_sign_complete(&mut self, instruction: Instruction) -> Result<Reply> {
        if instruction == Instruction::SignUnsafe {
            let rendered = bs58::encode(&self.session.staging).into_string();
            self.session.pending = Some(PendingAction::Sign {
                over: SignOver::RawMessage,
                send_hash: false,
            });
            return Ok(Reply::Pending(ConfirmationRequest {
                title: "Sign pre-hashed data?".to_string(),
                fields: vec![PromptField::new("Hash", rendered)],
            }));
        }

        let send_hash = instruction == Instruction::SignWithHash;
        self.session.pending = Some(PendingAction::Sign {
            over: SignOver::Digest,
            send_hash,
        });

        if let Some(group) = self.session.operations.clone() {
            Ok(Reply::Pending(prompt_for_operation(&group)))
        } else {
            let digest = self.session.final_digest.ok_or(CommandError::Security)?;
            Ok(Reply::Pending(ConfirmationRequest {
                title: "Sign unrecognized operation?".to_string(),
                fields: vec![PromptField::new("Hash", digest_to_base58(&digest))],
            }))
        }
    }

    fn execute_pending(&mut self, pending: PendingAction) -> Result<Vec<u8>> {
        match pending {
            PendingAction::Sign { over, send_hash } => {
                let key = self.session.key.ok_or(CommandError::NoPendingConfirmation)?;
                match over {
                    SignOver::Digest => {
                        let digest = self
                            .session
                            .final_digest
                            .ok_or(CommandError::NoPendingConfirmation)?;
                        if self.session.hash_only {
                            // Diagnostic mode: return the digest, sign nothing
                            return Ok(digest.to_vec());
                        }
                        let signature = self.vault.sign(key.curve, &key.path, &digest)?;
                        let mut response = Vec::new();
                        if send_hash {
                            response.extend_from_slice(&digest);
                        }
                        response.extend_from_slice(&signature);
                        Ok(response)
                    }
                    SignOver::RawMessage => {
                        let signature =
                            self.vault
                                .sign(key.curve, &key.path, &self.session.staging)?;
                        Ok(signature)
                    }
                }
            }
            PendingAction::Authorize {
                key,
                starting_level,
            } => {
                self.guard.authorize(&key, starting_level)?;
                Ok(Vec::new())
            }
            PendingAction::ResetLevel { level } => {
                self.guard.reset_level(level)?;
                Ok(Vec::new())
            }
        }
    }

    fn signer_contract(&mut self, key: &KeySelector) -> Result<Contract> {
        let public_key = self.vault.public_key(key.curve, &key.path)?;
        Ok(Contract::Implicit {
            curve: key.curve,
            hash: public_key.hash(),
        })
    }
}

/// Build the wallet confirmation prompt for a decoded group.
fn prompt_for_operation(group: &ParsedOperationGroup) -> ConfirmationRequest {
    let fee = PromptField::new("Fee", group.total_fee.to_string());
    let storage = PromptField::new("Storage Limit", group.total_storage_limit.to_string());
    match &group.last_operation {
        Operation::Reveal { source, .. } => ConfirmationRequest {
            title: "Reveal key?".to_string(),
            fields: vec![
                PromptField::new("Source", source.to_b58check()),
                fee,
                storage,
            ],
        },
        Operation::Transaction {
            source,
            destination,
            amount,
            is_manager_contract,
        } => ConfirmationRequest {
            title: if *is_manager_contract {
                "Confirm manager transaction?".to_string()
            } else {
                "Confirm transaction?".to_string()
            },
            fields: vec![
                PromptField::new("Amount", amount.to_string()),
                fee,
                PromptField::new("Source", source.to_b58check()),
                PromptField::new("Destination", destination.to_b58check()),
                storage,
            ],
        },
        Operation::Origination {
            source,
            balance,
            delegate,
            delegatable,
            ..
        } => {
            let delegate_value = match (delegate, delegatable) {
                (Some(contract), _) => contract.to_b58check(),
                (None, true) => "Any".to_string(),
                (None, false) => "Disabled".to_string(),
            };
            ConfirmationRequest {
                title: "Confirm origination?".to_string(),
                fields: vec![
                    PromptField::new("Amount", balance.to_string()),
                    fee,
                    PromptField::new("Source", source.to_b58check()),
                    PromptField::new("Delegate", delegate_value),
                    storage,
                ],
            }
        }
        Operation::Delegation { source, delegate } => match delegate {
            Some(contract) => ConfirmationRequest {
                title: "Confirm delegation?".to_string(),
                fields: vec![
                    fee,
                    PromptField::new("Source", source.to_b58check()),
                    PromptField::new("Delegate", contract.to_b58check()),
                    storage,
                ],
            },
            None => ConfirmationRequest {
                title: "Withdraw delegation?".to_string(),
                fields: vec![fee, PromptField::new("Source", source.to_b58check()), storage],
            },
        },
        Operation::Proposal {
            source,
            voting_period,
            proposal_hash,
        } => ConfirmationRequest {
            title: "Confirm proposal?".to_string(),
            fields: vec![
                PromptField::new("Source", source.to_b58check()),
                PromptField::new("Period", voting_period.to_string()),
                PromptField::new("Protocol", protocol_hash_to_b58check(proposal_hash)),
            ],
        },
        Operation::Ballot {
            source,
            voting_period,
            proposal_hash,
            vote,
        } => ConfirmationRequest {
            title: "Confirm vote?".to_string(),
            fields: vec![
                PromptField::new("Vote", vote.label().to_string()),
                PromptField::new("Source", source.to_b58check()),
                PromptField::new("Protocol", protocol_hash_to_b58check(proposal_hash)),
                PromptField::new("Period", voting_period.to_string()),
            ],
        },
    }
}
