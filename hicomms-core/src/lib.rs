//! Wire-level core data types
//!
//! This crate provides basic definitions shared by the other hicomms crates: frame constants,
//! the sync prefix and the closed set of message identifiers.
//! Hicomms users should not depend on this crate directly. Use `hicomms::core` reexport instead.
//!
//! Frame layout, all multi-byte values big-endian:
//!
//! ```text
//! ┌────────────┬──────┬───────┬─────────┬──────────┐
//! │ SyncPrefix │ Size │ MsgId │ Payload │ Checksum │
//! │     2B     │  1B  │  1B   │   var   │    2B    │
//! └────────────┴──────┴───────┴─────────┴──────────┘
//! ```
#![no_std]

/// Length of the frame start marker
pub const SYNC_PREFIX_LEN: usize = 2;

/// Length of the size field
pub const MSG_SIZE_LEN: usize = 1;

/// Length of the message ID field
pub const MSG_ID_LEN: usize = 1;

/// Length of the checksum field
pub const CHECKSUM_LEN: usize = 2;

/// Value added to the number of bytes written by the layers inside the size field.
///
/// The checksum trails the payload, so the size field counts it as well: the size value equals
/// the number of bytes that follow the size field.
pub const EXTRA_SIZE_VALUE: usize = CHECKSUM_LEN;

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Frame start marker
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncPrefix(u16);

impl SyncPrefix {
    /// "Hi" in ASCII
    pub const DEFAULT: SyncPrefix = SyncPrefix(0x4869);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn into_u16(self) -> u16 {
        self.0
    }

    pub const fn to_be_bytes(self) -> [u8; SYNC_PREFIX_LEN] {
        self.0.to_be_bytes()
    }
}

impl Default for SyncPrefix {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<SyncPrefix> for u16 {
    fn from(value: SyncPrefix) -> Self {
        value.into_u16()
    }
}

impl From<u16> for SyncPrefix {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Message type identifier
///
/// The message set is closed. Each identifier selects exactly one message type with a fixed
/// payload layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MsgId {
    /// Periodic liveness report with a wrapping sequence number
    Heartbeat = 0,
    /// Button edge notification
    ButtonStateChange = 1,
    /// LED state notification
    LedStateChange = 2,
    /// LED state command
    LedStateCtrl = 3,
}

impl MsgId {
    pub const MAX: MsgId = MsgId::LedStateCtrl;

    pub const ALL: [MsgId; 4] = [
        MsgId::Heartbeat,
        MsgId::ButtonStateChange,
        MsgId::LedStateChange,
        MsgId::LedStateCtrl,
    ];

    pub const fn try_from_u8(code: u8) -> Option<MsgId> {
        match code {
            0 => Some(MsgId::Heartbeat),
            1 => Some(MsgId::ButtonStateChange),
            2 => Some(MsgId::LedStateChange),
            3 => Some(MsgId::LedStateCtrl),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<MsgId> for u8 {
    fn from(value: MsgId) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for MsgId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_id_codes() {
        for id in MsgId::ALL {
            assert_eq!(MsgId::try_from(u8::from(id)).ok(), Some(id));
        }
        assert_eq!(MsgId::try_from_u8(MsgId::MAX.into_u8() + 1), None);
        assert!(MsgId::try_from(0xff).is_err());
    }

    #[test]
    fn test_sync_prefix_bytes() {
        assert_eq!(SyncPrefix::DEFAULT.to_be_bytes(), *b"Hi");
        assert_eq!(SyncPrefix::default(), SyncPrefix::new(0x4869));
    }
}
