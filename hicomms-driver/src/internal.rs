/// Private interfaces for the hicomms port
///
/// Drivers should not use this module.
/// Backward-incompatible changes can be made without major version bump.
use core::task::{Context, Poll};

use crate::link::DeviceError;

pub trait DynamicRx {
    /// Copies as many leading bytes of `data` as fit and returns their count.
    ///
    /// Pending while no byte fits. Never returns zero for non-empty `data`.
    fn poll_push(&self, cx: &mut Context<'_>, data: &[u8]) -> Poll<usize>;

    fn push_error(&self, error: DeviceError);
}

pub trait DynamicTx {
    /// Copies pending output bytes into `buf` and returns their count.
    ///
    /// Pending while there is nothing to send. Never returns zero for non-empty `buf`.
    fn poll_pop(&self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<usize>;
}

pub trait DynamicLink: DynamicRx + DynamicTx {}
