use hicomms_encoding::{ReadCursor, WriteCursor};

use super::{MsgPtr, ProtocolLayer, ReadError, WriteError, WriteStatus};
use crate::core::{EXTRA_SIZE_VALUE, MSG_SIZE_LEN};
use crate::message::Message;

/// Size field: the number of bytes that follow it, trailing checksum included
pub struct MsgSizeLayer<L> {
    inner: L,
}

impl<L: ProtocolLayer> MsgSizeLayer<L> {
    pub const fn new(inner: L) -> Self {
        Self { inner }
    }

    fn min_size(&self) -> usize {
        self.inner.length() + EXTRA_SIZE_VALUE
    }

    fn max_size(&self) -> usize {
        self.inner.max_length() + EXTRA_SIZE_VALUE
    }
}

impl<L: ProtocolLayer> ProtocolLayer for MsgSizeLayer<L> {
    fn length(&self) -> usize {
        MSG_SIZE_LEN + self.inner.length()
    }

    fn max_length(&self) -> usize {
        MSG_SIZE_LEN + self.inner.max_length()
    }

    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<MsgPtr<'_>, ReadError> {
        let remaining = cursor.remaining();
        if remaining < MSG_SIZE_LEN {
            // The shortest frame still carries the checksum counted by the size field
            return Err(ReadError::NotEnoughData(
                self.length() + EXTRA_SIZE_VALUE - remaining,
            ));
        }

        let size = usize::from(cursor.read_u8()?);
        if size < self.min_size() || size > self.max_size() {
            return Err(ReadError::InvalidMsgSize);
        }

        let remaining = cursor.remaining();
        if remaining < size {
            return Err(ReadError::NotEnoughData(size - remaining));
        }

        let mut body = cursor.split(size - EXTRA_SIZE_VALUE)?;
        let msg = self.inner.read(&mut body).map_err(|err| match err {
            ReadError::NotEnoughData(_) => ReadError::InvalidMsgSize,
            err => err,
        })?;
        if !body.is_empty() {
            return Err(ReadError::InvalidMsgSize);
        }
        Ok(msg)
    }

    fn write(
        &self,
        msg: &Message,
        cursor: &mut WriteCursor<'_>,
    ) -> Result<WriteStatus, WriteError> {
        cursor.write_u8(0)?;
        self.inner.write(msg, cursor)?;
        Ok(WriteStatus::UpdateRequired)
    }

    fn update(&self, frame: &mut [u8]) -> Result<(), WriteError> {
        let (size, inner) = frame.split_first_mut().ok_or(WriteError::BufferOverflow)?;
        self.inner.update(inner)?;
        *size = u8::try_from(inner.len() + EXTRA_SIZE_VALUE).map_err(|_| WriteError::MsgTooLong)?;
        Ok(())
    }
}
