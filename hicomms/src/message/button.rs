use hicomms_encoding as enc;

use super::MsgType;
use crate::core::MsgId;

/// `ButtonState`
///
/// Fixed size 1 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    #[default]
    Released,
    Pressed,
}

impl enc::Serialize for ButtonState {
    const SIZE: usize = 1;

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) -> Result<(), enc::BufferOverflow> {
        match self {
            ButtonState::Released => cursor.write_u8(0),
            ButtonState::Pressed => cursor.write_u8(1),
        }
    }
}

impl enc::Deserialize for ButtonState {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        match cursor.read_u8()? {
            0 => Ok(ButtonState::Released),
            1 => Ok(ButtonState::Pressed),
            _ => Err(enc::DeserializeError::InvalidValue),
        }
    }
}

/// `ButtonStateChange`
///
/// Fixed size 1 bytes
///
/// Emitted on every debounced button edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonStateChange {
    pub state: ButtonState,
}

impl MsgType for ButtonStateChange {
    const ID: MsgId = MsgId::ButtonStateChange;
}

impl enc::Serialize for ButtonStateChange {
    const SIZE: usize = <ButtonState as enc::Serialize>::SIZE;

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) -> Result<(), enc::BufferOverflow> {
        cursor.write(&self.state)
    }
}

impl enc::Deserialize for ButtonStateChange {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(ButtonStateChange {
            state: cursor.read()?,
        })
    }
}
