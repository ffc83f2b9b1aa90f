use hicomms_encoding as enc;

use super::MsgType;
use crate::core::MsgId;

/// `LedState`
///
/// Fixed size 1 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedState {
    #[default]
    Off,
    On,
}

impl enc::Serialize for LedState {
    const SIZE: usize = 1;

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) -> Result<(), enc::BufferOverflow> {
        match self {
            LedState::Off => cursor.write_u8(0),
            LedState::On => cursor.write_u8(1),
        }
    }
}

impl enc::Deserialize for LedState {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        match cursor.read_u8()? {
            0 => Ok(LedState::Off),
            1 => Ok(LedState::On),
            _ => Err(enc::DeserializeError::InvalidValue),
        }
    }
}

/// `LedStateChange`
///
/// Fixed size 1 bytes
///
/// Reports the LED state after it has changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedStateChange {
    pub state: LedState,
}

impl MsgType for LedStateChange {
    const ID: MsgId = MsgId::LedStateChange;
}

impl enc::Serialize for LedStateChange {
    const SIZE: usize = <LedState as enc::Serialize>::SIZE;

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) -> Result<(), enc::BufferOverflow> {
        cursor.write(&self.state)
    }
}

impl enc::Deserialize for LedStateChange {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(LedStateChange {
            state: cursor.read()?,
        })
    }
}

/// `LedStateCtrl`
///
/// Fixed size 1 bytes
///
/// Commands the LED state. The device answers with `LedStateChange` once the LED has been set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedStateCtrl {
    pub state: LedState,
}

impl MsgType for LedStateCtrl {
    const ID: MsgId = MsgId::LedStateCtrl;
}

impl enc::Serialize for LedStateCtrl {
    const SIZE: usize = <LedState as enc::Serialize>::SIZE;

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) -> Result<(), enc::BufferOverflow> {
        cursor.write(&self.state)
    }
}

impl enc::Deserialize for LedStateCtrl {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(LedStateCtrl {
            state: cursor.read()?,
        })
    }
}
