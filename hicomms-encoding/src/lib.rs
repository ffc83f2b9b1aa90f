//! Fixed-width big-endian field encoding
//!
//! Message payloads are ordered tuples of fixed-width fields. The cursors in this crate read and
//! write such fields over byte slices; `Serialize`/`Deserialize` describe a whole field tuple.
//!
//! Hicomms stack users should not depend on this crate directly.

#![no_std]

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeserializeError {
    /// The input ended early; holds the number of missing bytes
    NotEnoughData(usize),
    /// A field holds a value outside of its domain
    InvalidValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferOverflow;

pub trait Serialize {
    /// Encoded length in bytes. All field tuples have a fixed length.
    const SIZE: usize;

    fn serialize(&self, cursor: &mut WriteCursor<'_>) -> Result<(), BufferOverflow>;
}

pub trait Deserialize: Sized {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DeserializeError>;
}

/// Forward-only reader over a byte slice
#[derive(Debug, Clone)]
pub struct ReadCursor<'b> {
    bytes: &'b [u8],
    position: usize,
}

impl<'b> ReadCursor<'b> {
    pub const fn new(bytes: &'b [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes not consumed yet
    pub fn remaining_bytes(&self) -> &'b [u8] {
        &self.bytes[self.position..]
    }

    /// Consumes the next `len` bytes.
    ///
    /// Does not advance on failure.
    pub fn take(&mut self, len: usize) -> Result<&'b [u8], DeserializeError> {
        let remaining = self.remaining();
        if remaining < len {
            return Err(DeserializeError::NotEnoughData(len - remaining));
        }
        let bytes = &self.bytes[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Consumes the next `len` bytes and returns a cursor bounded to them.
    pub fn split(&mut self, len: usize) -> Result<ReadCursor<'b>, DeserializeError> {
        self.take(len).map(ReadCursor::new)
    }

    pub fn read_u8(&mut self) -> Result<u8, DeserializeError> {
        let bytes = self.take(1)?;
        Ok(bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DeserializeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DeserializeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read<T: Deserialize>(&mut self) -> Result<T, DeserializeError> {
        T::deserialize(self)
    }
}

/// Append-only writer over a byte slice
///
/// Values are either written completely or not at all; a failed write leaves the cursor
/// untouched.
#[derive(Debug)]
pub struct WriteCursor<'b> {
    bytes: &'b mut [u8],
    position: usize,
}

impl<'b> WriteCursor<'b> {
    pub fn new(bytes: &'b mut [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Number of bytes written so far
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.bytes[..self.position]
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), BufferOverflow> {
        if self.remaining() < data.len() {
            return Err(BufferOverflow);
        }
        self.bytes[self.position..self.position + data.len()].copy_from_slice(data);
        self.position += data.len();
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), BufferOverflow> {
        self.write_bytes(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), BufferOverflow> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<(), BufferOverflow> {
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write<T: Serialize>(&mut self, value: &T) -> Result<(), BufferOverflow> {
        value.serialize(self)
    }
}

impl Serialize for u8 {
    const SIZE: usize = 1;

    fn serialize(&self, cursor: &mut WriteCursor<'_>) -> Result<(), BufferOverflow> {
        cursor.write_u8(*self)
    }
}

impl Deserialize for u8 {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DeserializeError> {
        cursor.read_u8()
    }
}

impl Serialize for u16 {
    const SIZE: usize = 2;

    fn serialize(&self, cursor: &mut WriteCursor<'_>) -> Result<(), BufferOverflow> {
        cursor.write_u16(*self)
    }
}

impl Deserialize for u16 {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DeserializeError> {
        cursor.read_u16()
    }
}

impl Serialize for u32 {
    const SIZE: usize = 4;

    fn serialize(&self, cursor: &mut WriteCursor<'_>) -> Result<(), BufferOverflow> {
        cursor.write_u32(*self)
    }
}

impl Deserialize for u32 {
    fn deserialize(cursor: &mut ReadCursor<'_>) -> Result<Self, DeserializeError> {
        cursor.read_u32()
    }
}
