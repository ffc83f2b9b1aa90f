//! Closed message set
//!
//! Every message type has a unique `MsgId` and a fixed-size payload. `Message` is the sum of all
//! types; the protocol stack decodes into it and the session dispatches it to a `MsgHandler`.

use hicomms_encoding::{self as enc, Deserialize, Serialize};

use crate::core::MsgId;
use crate::dispatch::MsgHandler;

mod button;
mod heartbeat;
mod led;

pub use button::{ButtonState, ButtonStateChange};
pub use heartbeat::Heartbeat;
pub use led::{LedState, LedStateChange, LedStateCtrl};

/// Concrete message type with a static identifier
pub trait MsgType: Serialize + Deserialize + Into<Message> {
    const ID: MsgId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    Heartbeat(Heartbeat),
    ButtonStateChange(ButtonStateChange),
    LedStateChange(LedStateChange),
    LedStateCtrl(LedStateCtrl),
}

impl Message {
    /// Shortest payload among all message types
    pub const MIN_PAYLOAD_LEN: usize = payload_len_bound(false);
    /// Longest payload among all message types
    pub const MAX_PAYLOAD_LEN: usize = payload_len_bound(true);

    pub const fn id(&self) -> MsgId {
        match self {
            Message::Heartbeat(_) => Heartbeat::ID,
            Message::ButtonStateChange(_) => ButtonStateChange::ID,
            Message::LedStateChange(_) => LedStateChange::ID,
            Message::LedStateCtrl(_) => LedStateCtrl::ID,
        }
    }

    /// Payload length of a message type
    pub const fn payload_len_of(id: MsgId) -> usize {
        match id {
            MsgId::Heartbeat => Heartbeat::SIZE,
            MsgId::ButtonStateChange => ButtonStateChange::SIZE,
            MsgId::LedStateChange => LedStateChange::SIZE,
            MsgId::LedStateCtrl => LedStateCtrl::SIZE,
        }
    }

    pub const fn payload_len(&self) -> usize {
        Self::payload_len_of(self.id())
    }

    /// Calls the handler method matching the concrete type
    pub fn dispatch<H: MsgHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            Message::Heartbeat(msg) => handler.handle_heartbeat(msg),
            Message::ButtonStateChange(msg) => handler.handle_button_state_change(msg),
            Message::LedStateChange(msg) => handler.handle_led_state_change(msg),
            Message::LedStateCtrl(msg) => handler.handle_led_state_ctrl(msg),
        }
    }

    pub(crate) fn serialize_payload(
        &self,
        cursor: &mut enc::WriteCursor<'_>,
    ) -> Result<(), enc::BufferOverflow> {
        match self {
            Message::Heartbeat(msg) => cursor.write(msg),
            Message::ButtonStateChange(msg) => cursor.write(msg),
            Message::LedStateChange(msg) => cursor.write(msg),
            Message::LedStateCtrl(msg) => cursor.write(msg),
        }
    }

    pub(crate) fn deserialize_payload(
        id: MsgId,
        cursor: &mut enc::ReadCursor<'_>,
    ) -> Result<Message, enc::DeserializeError> {
        Ok(match id {
            MsgId::Heartbeat => Heartbeat::deserialize(cursor)?.into(),
            MsgId::ButtonStateChange => ButtonStateChange::deserialize(cursor)?.into(),
            MsgId::LedStateChange => LedStateChange::deserialize(cursor)?.into(),
            MsgId::LedStateCtrl => LedStateCtrl::deserialize(cursor)?.into(),
        })
    }
}

const fn payload_len_bound(max: bool) -> usize {
    let mut bound = Message::payload_len_of(MsgId::ALL[0]);
    let mut i = 1;
    while i < MsgId::ALL.len() {
        let len = Message::payload_len_of(MsgId::ALL[i]);
        if (max && len > bound) || (!max && len < bound) {
            bound = len;
        }
        i += 1;
    }
    bound
}

macro_rules! impl_from_variant {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(value: $variant) -> Self {
                    Message::$variant(value)
                }
            }
        )*
    };
}

impl_from_variant!(Heartbeat, ButtonStateChange, LedStateChange, LedStateCtrl);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_bounds() {
        assert_eq!(Message::MIN_PAYLOAD_LEN, 1);
        assert_eq!(Message::MAX_PAYLOAD_LEN, 2);
    }

    #[test]
    fn test_ids() {
        let msg: Message = Heartbeat { seq_num: 5 }.into();
        assert_eq!(msg.id(), MsgId::Heartbeat);
        assert_eq!(msg.payload_len(), 2);

        let msg: Message = LedStateCtrl {
            state: LedState::On,
        }
        .into();
        assert_eq!(msg.id(), MsgId::LedStateCtrl);
        assert_eq!(msg.payload_len(), 1);
    }

    #[test]
    fn test_payload_layout() {
        let mut buf = [0u8; 4];
        let mut cursor = enc::WriteCursor::new(&mut buf);
        Message::from(Heartbeat { seq_num: 0x0102 })
            .serialize_payload(&mut cursor)
            .unwrap();
        Message::from(ButtonStateChange {
            state: ButtonState::Pressed,
        })
        .serialize_payload(&mut cursor)
        .unwrap();
        assert_eq!(cursor.written(), &[0x01, 0x02, 0x01]);
    }

    #[test]
    fn test_invalid_enum_value() {
        let mut cursor = enc::ReadCursor::new(&[2]);
        assert_eq!(
            Message::deserialize_payload(MsgId::LedStateChange, &mut cursor),
            Err(enc::DeserializeError::InvalidValue)
        );

        let mut cursor = enc::ReadCursor::new(&[1]);
        assert_eq!(
            Message::deserialize_payload(MsgId::ButtonStateChange, &mut cursor),
            Ok(Message::ButtonStateChange(ButtonStateChange {
                state: ButtonState::Pressed
            }))
        );
    }

    #[test]
    fn test_short_payload() {
        let mut cursor = enc::ReadCursor::new(&[0x01]);
        assert!(matches!(
            Message::deserialize_payload(MsgId::Heartbeat, &mut cursor),
            Err(enc::DeserializeError::NotEnoughData(_))
        ));
    }
}
