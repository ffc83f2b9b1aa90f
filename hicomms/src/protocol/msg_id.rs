use hicomms_encoding::{ReadCursor, WriteCursor};

use super::{
    InPlaceAllocator, MsgDataLayer, MsgPtr, ProtocolLayer, ReadError, WriteError, WriteStatus,
};
use crate::core::{MSG_ID_LEN, MsgId};
use crate::message::Message;

/// Innermost layer: selects the message type and stores the decoded message
pub struct MsgIdLayer {
    data: MsgDataLayer,
    allocator: InPlaceAllocator,
}

impl MsgIdLayer {
    pub const fn new() -> Self {
        Self {
            data: MsgDataLayer::new(),
            allocator: InPlaceAllocator::new(),
        }
    }
}

impl Default for MsgIdLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolLayer for MsgIdLayer {
    fn length(&self) -> usize {
        MSG_ID_LEN + self.data.length()
    }

    fn max_length(&self) -> usize {
        MSG_ID_LEN + self.data.max_length()
    }

    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<MsgPtr<'_>, ReadError> {
        let code = cursor.read_u8()?;
        let id = MsgId::try_from_u8(code).ok_or(ReadError::InvalidMsgId(code))?;
        let msg = self.data.read(id, cursor)?;
        Ok(self.allocator.alloc(msg))
    }

    fn write(
        &self,
        msg: &Message,
        cursor: &mut WriteCursor<'_>,
    ) -> Result<WriteStatus, WriteError> {
        cursor.write_u8(msg.id().into_u8())?;
        self.data.write(msg, cursor)?;
        Ok(WriteStatus::Complete)
    }

    fn update(&self, _frame: &mut [u8]) -> Result<(), WriteError> {
        Ok(())
    }
}
