use hicomms_encoding as enc;

use super::MsgType;
use crate::core::MsgId;

/// `Heartbeat`
///
/// Fixed size 2 bytes
///
/// Periodic liveness report of the device. The host may consider the device offline after
/// missing a few consecutive reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Heartbeat {
    /// Incremented by one per report, wraps silently.
    ///
    /// `uint16`
    pub seq_num: u16,
}

impl MsgType for Heartbeat {
    const ID: MsgId = MsgId::Heartbeat;
}

impl enc::Serialize for Heartbeat {
    const SIZE: usize = 2;

    fn serialize(&self, cursor: &mut enc::WriteCursor<'_>) -> Result<(), enc::BufferOverflow> {
        cursor.write_u16(self.seq_num)
    }
}

impl enc::Deserialize for Heartbeat {
    fn deserialize(cursor: &mut enc::ReadCursor<'_>) -> Result<Self, enc::DeserializeError> {
        Ok(Heartbeat {
            seq_num: cursor.read_u16()?,
        })
    }
}
