//! Byte stream buffers between the driver and the session
//!
//! The driver side is served through the port `Link`, the session side through the `InStream`
//! and `OutStream` handles. Both sides may run in different tasks; the state is guarded by a
//! blocking mutex and each critical section is bounded by the buffer capacity.

use core::task::{Context, Poll};

use crate::link::DeviceError;

mod in_stream;
mod out_stream;

pub use in_stream::{InStream, InStreamBuf};
pub use out_stream::{OutStream, OutStreamBuf};

/// Failure reported to an input stream waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// Reception is stopped until an explicit restart
    Aborted,
    /// The driver reported a failure; bytes may have been lost
    Device(DeviceError),
}

pub(crate) trait DynamicInStream {
    fn poll_data_available(&self, cx: &mut Context<'_>, len: usize)
    -> Poll<Result<(), StreamError>>;
    fn read(&self, f: &mut dyn FnMut(&[u8]));
    fn consume(&self, len: usize);
    fn size(&self) -> usize;
    fn full_capacity(&self) -> usize;

    fn abort(&self);
    fn restart(&self);
    fn poll_restarted(&self, cx: &mut Context<'_>) -> Poll<()>;
}

pub(crate) trait DynamicOutStream {
    fn stage(&self, f: &mut dyn FnMut(&mut [u8]) -> usize) -> usize;
    fn flush(&self);
    fn clear(&self);
    fn size(&self) -> usize;
    fn full_capacity(&self) -> usize;
    fn available_capacity(&self) -> usize;
    fn poll_empty(&self, cx: &mut Context<'_>) -> Poll<()>;
}
