use core::marker::PhantomData;

use hicomms_encoding::{ReadCursor, WriteCursor};

use super::{MsgPtr, ProtocolLayer, ReadError, WriteError, WriteStatus};
use crate::core::CHECKSUM_LEN;
use crate::message::Message;

/// Checksum algorithm
pub trait Checksum {
    fn calculate(data: &[u8]) -> u16;
}

/// 16-bit wrapping sum of all bytes
pub struct BytesSum;

impl Checksum for BytesSum {
    fn calculate(data: &[u8]) -> u16 {
        data.iter()
            .fold(0u16, |sum, &byte| sum.wrapping_add(u16::from(byte)))
    }
}

/// Trailing checksum over the frame region of the inner layers
///
/// The checksum is verified after the inner layers have parsed the frame.
pub struct ChecksumLayer<L, C> {
    inner: L,
    _checksum: PhantomData<C>,
}

impl<L: ProtocolLayer, C: Checksum> ChecksumLayer<L, C> {
    pub const fn new(inner: L) -> Self {
        Self {
            inner,
            _checksum: PhantomData,
        }
    }
}

impl<L: ProtocolLayer, C: Checksum> ProtocolLayer for ChecksumLayer<L, C> {
    fn length(&self) -> usize {
        self.inner.length() + CHECKSUM_LEN
    }

    fn max_length(&self) -> usize {
        self.inner.max_length() + CHECKSUM_LEN
    }

    fn read(&mut self, cursor: &mut ReadCursor<'_>) -> Result<MsgPtr<'_>, ReadError> {
        let start = cursor.remaining_bytes();
        let msg = self.inner.read(cursor)?;
        let covered = &start[..start.len() - cursor.remaining()];
        let expected = cursor.read_u16()?;
        if C::calculate(covered) != expected {
            return Err(ReadError::ChecksumMismatch);
        }
        Ok(msg)
    }

    fn write(
        &self,
        msg: &Message,
        cursor: &mut WriteCursor<'_>,
    ) -> Result<WriteStatus, WriteError> {
        self.inner.write(msg, cursor)?;
        cursor.write_u16(0)?;
        Ok(WriteStatus::UpdateRequired)
    }

    fn update(&self, frame: &mut [u8]) -> Result<(), WriteError> {
        let split = frame
            .len()
            .checked_sub(CHECKSUM_LEN)
            .ok_or(WriteError::BufferOverflow)?;
        let (covered, checksum) = frame.split_at_mut(split);
        self.inner.update(covered)?;
        checksum.copy_from_slice(&C::calculate(covered).to_be_bytes());
        Ok(())
    }
}
