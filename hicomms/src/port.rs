//! Serial port state shared by the driver, the session and the controller
//!
//! ## Examples
//!
//! A port is typically allocated statically to obtain `'static` handles that can be passed to
//! spawned tasks:
//! ```
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex as Mutex;
//! use hicomms::port::Port;
//! use static_cell::StaticCell;
//!
//! static PORT: StaticCell<Port<Mutex, 64, 64>> = StaticCell::new();
//! let port = PORT.init(Port::new());
//! let (link, streams, control) = port.split();
//! ```

use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::raw::RawMutex;
use hicomms_driver::internal::{DynamicLink, DynamicRx, DynamicTx};

use crate::buffer::{DynamicInStream, InStream, InStreamBuf, OutStream, OutStreamBuf};
use crate::link::{DeviceError, Link};
use crate::timer::{DynamicTimer, Timer, TimerState};

/// Stream buffers and the heartbeat timer of one serial link
///
/// `RX` and `TX` are the buffer capacities in bytes. Both must hold at least the longest frame.
pub struct Port<M: RawMutex, const RX: usize, const TX: usize> {
    rx: InStreamBuf<M, RX>,
    tx: OutStreamBuf<M, TX>,
    timer: TimerState<M>,
}

/// Session-side handles
pub struct Streams<'a> {
    pub rx: InStream<'a>,
    pub tx: OutStream<'a>,
    pub timer: Timer<'a>,
}

impl<M: RawMutex + Sync, const RX: usize, const TX: usize> Port<M, RX, TX> {
    pub const fn new() -> Self {
        Self {
            rx: InStreamBuf::new(),
            tx: OutStreamBuf::new(),
            timer: TimerState::new(),
        }
    }

    pub fn split(&mut self) -> (Link<'_>, Streams<'_>, Control<'_>) {
        let this: &Self = self;
        let link = Link::new(this);
        let streams = Streams {
            rx: InStream::new(&this.rx),
            tx: OutStream::new(&this.tx),
            timer: Timer::new(&this.timer),
        };
        let control = Control {
            rx: &this.rx,
            timer: &this.timer,
        };
        (link, streams, control)
    }
}

impl<M: RawMutex + Sync, const RX: usize, const TX: usize> Default for Port<M, RX, TX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const RX: usize, const TX: usize> DynamicRx for Port<M, RX, TX> {
    fn poll_push(&self, cx: &mut Context<'_>, data: &[u8]) -> Poll<usize> {
        self.rx.poll_push(cx, data)
    }

    fn push_error(&self, error: DeviceError) {
        self.rx.push_error(error);
    }
}

impl<M: RawMutex, const RX: usize, const TX: usize> DynamicTx for Port<M, RX, TX> {
    fn poll_pop(&self, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<usize> {
        self.tx.poll_pop(cx, buf)
    }
}

impl<M: RawMutex, const RX: usize, const TX: usize> DynamicLink for Port<M, RX, TX> {}

/// Port control handle
///
/// Stops and resumes reception and the heartbeat. The session observes changes at its next
/// wait.
#[derive(Clone, Copy)]
pub struct Control<'a> {
    rx: &'a (dyn DynamicInStream + Sync),
    timer: &'a (dyn DynamicTimer + Sync),
}

impl<'a> Control<'a> {
    /// Drops buffered input and stops reception.
    pub fn abort_read(&self) {
        self.rx.abort();
    }

    pub fn restart_read(&self) {
        self.rx.restart();
    }

    pub fn cancel_heartbeat(&self) {
        self.timer.set_cancelled(true);
    }

    pub fn restart_heartbeat(&self) {
        self.timer.set_cancelled(false);
    }

    /// Stops both reception and the heartbeat.
    pub fn shutdown(&self) {
        self.abort_read();
        self.cancel_heartbeat();
    }
}
