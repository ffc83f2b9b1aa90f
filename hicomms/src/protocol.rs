//! Layered frame codec
//!
//! Each layer handles one frame field and wraps the next one:
//!
//! ```text
//! SyncPrefixLayer
//! └─ ChecksumLayer<_, BytesSum>
//!    └─ MsgSizeLayer
//!       └─ MsgIdLayer
//!          └─ MsgDataLayer
//! ```
//!
//! Writing is a two-pass operation. `write` emits the frame with placeholders for the fields that
//! depend on the rest of the frame (size, checksum) and reports `WriteStatus::UpdateRequired`;
//! `update` then patches them over the written region.
//!
//! Reading decodes the frame into a single-slot allocator owned by the ID layer. The returned
//! `MsgPtr` borrows the stack, so at most one decoded message exists at a time.

use hicomms_encoding::{BufferOverflow, DeserializeError, ReadCursor, WriteCursor};

use crate::core::SyncPrefix;
use crate::message::Message;

mod allocator;
mod checksum;
mod msg_data;
mod msg_id;
mod msg_size;
mod sync_prefix;

pub use allocator::{InPlaceAllocator, MsgPtr};
pub use checksum::{BytesSum, Checksum, ChecksumLayer};
pub use msg_data::MsgDataLayer;
pub use msg_id::MsgIdLayer;
pub use msg_size::MsgSizeLayer;
pub use sync_prefix::SyncPrefixLayer;

/// Frame decoding failure
///
/// All errors except `NotEnoughData` mean the bytes at the cursor do not start a valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    /// The frame is incomplete; holds the number of missing bytes known so far
    NotEnoughData(usize),
    MissingSyncPrefix,
    /// The size field is out of bounds or disagrees with the message type
    InvalidMsgSize,
    InvalidMsgId(u8),
    /// A payload field holds a value outside of its domain
    InvalidMsgData,
    ChecksumMismatch,
}

impl From<DeserializeError> for ReadError {
    fn from(value: DeserializeError) -> Self {
        match value {
            DeserializeError::NotEnoughData(missing) => ReadError::NotEnoughData(missing),
            DeserializeError::InvalidValue => ReadError::InvalidMsgData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteError {
    BufferOverflow,
    /// The frame does not fit the size field
    MsgTooLong,
}

impl From<BufferOverflow> for WriteError {
    fn from(_value: BufferOverflow) -> Self {
        WriteError::BufferOverflow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteStatus {
    Complete,
    /// Placeholders were written; call `update` over the written region
    UpdateRequired,
}

pub trait ProtocolLayer {
    /// Minimal number of bytes produced by this layer together with the inner ones
    fn length(&self) -> usize;

    /// Maximal number of bytes produced by this layer together with the inner ones
    fn max_length(&self) -> usize;

    /// Decodes a frame starting at the cursor.
    ///
    /// On success the cursor is advanced past the frame. On failure the cursor position is
    /// unspecified.
    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<MsgPtr<'_>, ReadError>;

    /// Encodes `msg` at the cursor.
    fn write(&self, msg: &Message, cursor: &mut WriteCursor<'_>)
    -> Result<WriteStatus, WriteError>;

    /// Patches placeholders. `frame` must be exactly the region written by `write`.
    fn update(&self, frame: &mut [u8]) -> Result<(), WriteError>;
}

/// The complete frame codec
pub type ProtocolStack = SyncPrefixLayer<ChecksumLayer<MsgSizeLayer<MsgIdLayer>, BytesSum>>;

impl ProtocolStack {
    pub const fn new(sync_prefix: SyncPrefix) -> Self {
        SyncPrefixLayer::with_prefix(
            sync_prefix,
            ChecksumLayer::new(MsgSizeLayer::new(MsgIdLayer::new())),
        )
    }
}

impl Default for ProtocolStack {
    fn default() -> Self {
        Self::new(SyncPrefix::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{
        ButtonState, ButtonStateChange, Heartbeat, LedState, LedStateChange, LedStateCtrl,
    };

    const LED_ON_FRAME: [u8; 7] = [0x48, 0x69, 0x04, 0x03, 0x01, 0x00, 0x08];
    const HEARTBEAT_FRAME: [u8; 8] = [0x48, 0x69, 0x05, 0x00, 0x01, 0x02, 0x00, 0x08];

    fn encode(stack: &ProtocolStack, msg: &Message, buf: &mut [u8]) -> usize {
        let mut cursor = WriteCursor::new(buf);
        let status = stack.write(msg, &mut cursor).unwrap();
        let len = cursor.position();
        assert_eq!(status, WriteStatus::UpdateRequired);
        stack.update(&mut buf[..len]).unwrap();
        len
    }

    fn decode(stack: &mut ProtocolStack, bytes: &[u8]) -> Result<(Message, usize), ReadError> {
        let mut cursor = ReadCursor::new(bytes);
        let msg = *stack.read(&mut cursor)?;
        Ok((msg, cursor.position()))
    }

    #[test]
    fn test_lengths() {
        let stack = ProtocolStack::default();
        assert_eq!(stack.length(), 7);
        assert_eq!(stack.max_length(), 8);
    }

    #[test]
    fn test_write_known_frames() {
        let stack = ProtocolStack::default();
        let mut buf = [0u8; 16];

        let msg = LedStateCtrl {
            state: LedState::On,
        }
        .into();
        let len = encode(&stack, &msg, &mut buf);
        assert_eq!(&buf[..len], &LED_ON_FRAME);

        let msg = Heartbeat { seq_num: 0x0102 }.into();
        let len = encode(&stack, &msg, &mut buf);
        assert_eq!(&buf[..len], &HEARTBEAT_FRAME);
    }

    #[test]
    fn test_read_known_frames() {
        let mut stack = ProtocolStack::default();
        assert_eq!(
            decode(&mut stack, &LED_ON_FRAME),
            Ok((
                Message::from(LedStateCtrl {
                    state: LedState::On
                }),
                7
            ))
        );
        assert_eq!(
            decode(&mut stack, &HEARTBEAT_FRAME),
            Ok((Message::from(Heartbeat { seq_num: 0x0102 }), 8))
        );
    }

    #[test]
    fn test_round_trip() {
        let messages: [Message; 5] = [
            Heartbeat { seq_num: 0xffff }.into(),
            ButtonStateChange {
                state: ButtonState::Pressed,
            }
            .into(),
            ButtonStateChange {
                state: ButtonState::Released,
            }
            .into(),
            LedStateChange {
                state: LedState::Off,
            }
            .into(),
            LedStateCtrl {
                state: LedState::Off,
            }
            .into(),
        ];

        let mut stack = ProtocolStack::new(SyncPrefix::new(0xabcd));
        for msg in messages {
            let mut buf = [0u8; 16];
            let len = encode(&stack, &msg, &mut buf);
            assert_eq!(len, stack.length() - 1 + msg.payload_len());
            assert_eq!(&buf[..2], &[0xab, 0xcd]);
            assert_eq!(decode(&mut stack, &buf[..len]), Ok((msg, len)));
        }
    }

    #[test]
    fn test_trailing_bytes_untouched() {
        let mut stack = ProtocolStack::default();
        let mut bytes = [0u8; 10];
        bytes[..7].copy_from_slice(&LED_ON_FRAME);
        bytes[7..].copy_from_slice(&[0x48, 0x69, 0x05]);
        let (_, len) = decode(&mut stack, &bytes).unwrap();
        assert_eq!(len, 7);
    }

    #[test]
    fn test_write_overflow() {
        let stack = ProtocolStack::default();
        let mut buf = [0u8; 6];
        let mut cursor = WriteCursor::new(&mut buf);
        let msg = LedStateCtrl {
            state: LedState::On,
        }
        .into();
        assert_eq!(
            stack.write(&msg, &mut cursor),
            Err(WriteError::BufferOverflow)
        );
    }

    #[test]
    fn test_not_enough_data() {
        let mut stack = ProtocolStack::default();
        assert_eq!(decode(&mut stack, &[]), Err(ReadError::NotEnoughData(7)));
        assert_eq!(decode(&mut stack, &[0x48]), Err(ReadError::NotEnoughData(6)));
        // Sync prefix only: the shortest frame is still missing all of its fields
        assert_eq!(
            decode(&mut stack, &LED_ON_FRAME[..2]),
            Err(ReadError::NotEnoughData(5))
        );
        // The size field is known, the count is exact
        assert_eq!(
            decode(&mut stack, &LED_ON_FRAME[..3]),
            Err(ReadError::NotEnoughData(4))
        );
        assert_eq!(
            decode(&mut stack, &HEARTBEAT_FRAME[..7]),
            Err(ReadError::NotEnoughData(1))
        );
    }

    #[test]
    fn test_missing_sync_prefix() {
        let mut stack = ProtocolStack::default();
        let mut bytes = LED_ON_FRAME;
        bytes[1] = 0x68;
        assert_eq!(decode(&mut stack, &bytes), Err(ReadError::MissingSyncPrefix));
    }

    #[test]
    fn test_invalid_size() {
        let mut stack = ProtocolStack::default();
        for size in [0x00, 0x03, 0x06, 0xff] {
            let mut bytes = LED_ON_FRAME;
            bytes[2] = size;
            assert_eq!(decode(&mut stack, &bytes), Err(ReadError::InvalidMsgSize));
        }

        // Size valid in general, but not for the message type
        let bytes = [0x48, 0x69, 0x04, 0x00, 0x01, 0x00, 0x05];
        assert_eq!(decode(&mut stack, &bytes), Err(ReadError::InvalidMsgSize));
        let bytes = [0x48, 0x69, 0x05, 0x03, 0x01, 0x00, 0x00, 0x09];
        assert_eq!(decode(&mut stack, &bytes), Err(ReadError::InvalidMsgSize));
    }

    #[test]
    fn test_invalid_id() {
        let mut stack = ProtocolStack::default();
        let bytes = [0x48, 0x69, 0x04, 0x07, 0x01, 0x00, 0x0c];
        assert_eq!(decode(&mut stack, &bytes), Err(ReadError::InvalidMsgId(7)));
    }

    #[test]
    fn test_invalid_data() {
        let mut stack = ProtocolStack::default();
        let bytes = [0x48, 0x69, 0x04, 0x03, 0x02, 0x00, 0x09];
        assert_eq!(decode(&mut stack, &bytes), Err(ReadError::InvalidMsgData));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut stack = ProtocolStack::default();
        let mut bytes = LED_ON_FRAME;
        bytes[6] ^= 0x01;
        assert_eq!(decode(&mut stack, &bytes), Err(ReadError::ChecksumMismatch));
    }

    #[test]
    fn test_single_bit_flip_detected() {
        let mut stack = ProtocolStack::default();
        for index in 0..HEARTBEAT_FRAME.len() {
            for bit in 0..8 {
                let mut bytes = HEARTBEAT_FRAME;
                bytes[index] ^= 1 << bit;
                assert!(
                    decode(&mut stack, &bytes).is_err(),
                    "flip at byte {index} bit {bit} accepted"
                );
            }
        }
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(BytesSum::calculate(&[]), 0);
        assert_eq!(BytesSum::calculate(&[0xff; 4]), 0x03fc);
        let data = [0xff; 300];
        assert_eq!(BytesSum::calculate(&data), (300u32 * 0xff % 0x1_0000) as u16);
    }
}
