use hicomms_encoding::{ReadCursor, WriteCursor};

use super::{MsgPtr, ProtocolLayer, ReadError, WriteError, WriteStatus};
use crate::core::{SYNC_PREFIX_LEN, SyncPrefix};
use crate::message::Message;

/// Outermost layer: a constant marker at the frame start
///
/// The layer only checks the marker. Skipping unsynchronized bytes is up to the caller.
pub struct SyncPrefixLayer<L> {
    prefix: [u8; SYNC_PREFIX_LEN],
    inner: L,
}

impl<L: ProtocolLayer> SyncPrefixLayer<L> {
    pub const fn with_prefix(prefix: SyncPrefix, inner: L) -> Self {
        Self {
            prefix: prefix.to_be_bytes(),
            inner,
        }
    }
}

impl<L: ProtocolLayer> ProtocolLayer for SyncPrefixLayer<L> {
    fn length(&self) -> usize {
        SYNC_PREFIX_LEN + self.inner.length()
    }

    fn max_length(&self) -> usize {
        SYNC_PREFIX_LEN + self.inner.max_length()
    }

    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<MsgPtr<'_>, ReadError> {
        let remaining = cursor.remaining();
        if remaining < SYNC_PREFIX_LEN {
            return Err(ReadError::NotEnoughData(self.length() - remaining));
        }
        if cursor.take(SYNC_PREFIX_LEN)? != self.prefix.as_slice() {
            return Err(ReadError::MissingSyncPrefix);
        }
        self.inner.read(cursor)
    }

    fn write(
        &self,
        msg: &Message,
        cursor: &mut WriteCursor<'_>,
    ) -> Result<WriteStatus, WriteError> {
        cursor.write_bytes(&self.prefix)?;
        self.inner.write(msg, cursor)
    }

    fn update(&self, frame: &mut [u8]) -> Result<(), WriteError> {
        let inner = frame
            .get_mut(SYNC_PREFIX_LEN..)
            .ok_or(WriteError::BufferOverflow)?;
        self.inner.update(inner)
    }
}
