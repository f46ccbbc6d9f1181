//! Message tag classification.
//!
//! Every signable message starts with a one-byte tag selecting how the rest
//! of the buffer is interpreted: a block header, an endorsement, or a
//! generic operation group. Two further tags exist on the wire but are not
//! supported for signing.

/// First-byte discriminator of a signable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageTag {
    /// Block header - 0x01
    Block = 0x01,

    /// Endorsement (consensus vote) - 0x02
    Endorsement = 0x02,

    /// Generic operation group - 0x03
    OperationGroup = 0x03,

    /// Reserved form - 0x04, recognized but never signable
    Reserved4 = 0x04,

    /// Reserved form - 0x05, recognized but never signable
    Reserved5 = 0x05,
}

impl MessageTag {
    /// Convert byte to `MessageTag` if it is a known tag.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Block),
            0x02 => Some(Self::Endorsement),
            0x03 => Some(Self::OperationGroup),
            0x04 => Some(Self::Reserved4),
            0x05 => Some(Self::Reserved5),
            _ => None,
        }
    }

    /// The wire value of this tag.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// True for the two consensus-critical baking tags.
    #[must_use]
    pub const fn is_baking(self) -> bool {
        matches!(self, Self::Block | Self::Endorsement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_byte() {
        assert_eq!(MessageTag::from_byte(0x01), Some(MessageTag::Block));
        assert_eq!(MessageTag::from_byte(0x02), Some(MessageTag::Endorsement));
        assert_eq!(
            MessageTag::from_byte(0x03),
            Some(MessageTag::OperationGroup)
        );
        assert_eq!(MessageTag::from_byte(0x04), Some(MessageTag::Reserved4));
        assert_eq!(MessageTag::from_byte(0x05), Some(MessageTag::Reserved5));
        assert_eq!(MessageTag::from_byte(0x00), None);
        assert_eq!(MessageTag::from_byte(0xFF), None);
    }

    #[test]
    fn test_byte_roundtrip() {
        for byte in 0x01..=0x05u8 {
            assert_eq!(MessageTag::from_byte(byte).unwrap().byte(), byte);
        }
    }

    #[test]
    fn test_is_baking() {
        assert!(MessageTag::Block.is_baking());
        assert!(MessageTag::Endorsement.is_baking());
        assert!(!MessageTag::OperationGroup.is_baking());
        assert!(!MessageTag::Reserved4.is_baking());
    }
}
