use hicomms_encoding::{ReadCursor, WriteCursor};

use super::{ReadError, WriteError};
use crate::core::MsgId;
use crate::message::Message;

/// Payload fields in declaration order
#[derive(Default)]
pub struct MsgDataLayer;

impl MsgDataLayer {
    pub const fn new() -> Self {
        Self
    }

    pub fn length(&self) -> usize {
        Message::MIN_PAYLOAD_LEN
    }

    pub fn max_length(&self) -> usize {
        Message::MAX_PAYLOAD_LEN
    }

    pub fn read(&self, id: MsgId, cursor: &mut ReadCursor<'_>) -> Result<Message, ReadError> {
        Ok(Message::deserialize_payload(id, cursor)?)
    }

    pub fn write(&self, msg: &Message, cursor: &mut WriteCursor<'_>) -> Result<(), WriteError> {
        Ok(msg.serialize_payload(cursor)?)
    }
}
