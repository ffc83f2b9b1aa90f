//! Channels connecting driver and hicomms stack

use core::future::poll_fn;

use crate::internal;

/// Device-level failure reported by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// Receiver overrun, bytes were lost
    Overrun,
    /// Framing error (missing stop bit)
    Framing,
    Parity,
    Noise,
    /// Reception was cancelled. The stack stops reading until explicitly restarted.
    Aborted,
}

/// Consumer of received bytes
///
/// Bytes must be pushed in arrival order.
///
/// The channel may block only for short periods.
pub struct Rx<'a>(&'a (dyn internal::DynamicRx + Sync));

impl<'a> Rx<'a> {
    /// Asynchronously pushes all bytes. Safe to drop, though a dropped call may have delivered
    /// a prefix of `data`.
    pub async fn push(&mut self, data: &[u8]) {
        let mut rest = data;
        while !rest.is_empty() {
            let count = poll_fn(|cx| self.0.poll_push(cx, rest)).await;
            rest = &rest[count..];
        }
    }

    /// Reports a reception failure.
    ///
    /// The stack resynchronizes on the next frame. `DeviceError::Aborted` stops reception.
    pub fn push_error(&mut self, error: DeviceError) {
        self.0.push_error(error);
    }
}

/// Producer of bytes for transmission
///
/// A driver should transmit popped bytes in order and as soon as possible: the stack does not
/// accept the next frame before the previous one is fully popped.
pub struct Tx<'a>(&'a (dyn internal::DynamicTx + Sync));

impl<'a> Tx<'a> {
    /// Asynchronously fetches the next chunk of output bytes. Safe to drop.
    ///
    /// Blocks until at least one byte is available. Returns the number of bytes written to `buf`.
    pub async fn pop(&mut self, buf: &mut [u8]) -> usize {
        poll_fn(|cx| self.0.poll_pop(cx, buf)).await
    }
}

/// Channel container. A driver should consume it.
pub struct Link<'a>(&'a (dyn internal::DynamicLink + Sync));

impl<'a> Link<'a> {
    pub fn new(access: &'a (dyn internal::DynamicLink + Sync)) -> Self {
        Self(access)
    }

    pub fn split(self) -> (Rx<'a>, Tx<'a>) {
        (Rx(self.0), Tx(self.0))
    }
}
