//! Application operating mode.
//!
//! One device build serves two roles: a validator signer that bakes without
//! prompting but only for the authorized key, and a wallet that prompts for
//! every operation. The mode is chosen once at startup and selects every
//! policy decision: which message tags are signable and which operation
//! kinds the group decoder accepts.

use crate::magic_bytes::MessageTag;
use crate::operations::OperationKind;

/// Operating mode, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Validator signing: blocks and endorsements are signed unprompted
    /// when the anti-equivocation guard allows; operation groups are
    /// limited to self-delegation.
    Baking,
    /// General wallet: every message is confirmed by the user; baking
    /// messages are not signable at all.
    Wallet,
}

impl AppMode {
    /// Whether a classified message may proceed to signing in this mode.
    #[must_use]
    pub fn accepts_message(self, tag: MessageTag) -> bool {
        match self {
            Self::Baking => matches!(
                tag,
                MessageTag::Block | MessageTag::Endorsement | MessageTag::OperationGroup
            ),
            Self::Wallet => tag == MessageTag::OperationGroup,
        }
    }

    /// The operation-kind allow predicate fed to the group decoder.
    #[must_use]
    pub fn allows_operation(self, kind: OperationKind) -> bool {
        match self {
            Self::Baking => matches!(kind, OperationKind::Reveal | OperationKind::Delegation),
            Self::Wallet => true,
        }
    }
}
