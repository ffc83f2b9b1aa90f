//! Hicomms driver interface
//!
//! The crate provides an interface between a byte-stream device driver (typically a UART) and
//! the hicomms stack. Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. Hicomms stack users should depend on
//! the `hicomms` crate instead.
//!
//! A `Link` encompasses two asynchronous channels:
//! * `Rx` consumes received bytes and device errors
//! * `Tx` produces bytes for transmission
//!
//! The stack does not call the device. Driver runners pull and push data instead: the stream
//! buffers behind the link are channel-like, while a driver needs its own task to serve the
//! peripheral anyway. The inverse structure eliminates intermediate channels and redundant
//! runners.
//!
//! The `Rx` channel blocks while the stack input buffer is full. The stack drains it as soon as
//! a frame is complete, so a driver should expect only short-term blockage. Bytes received in the
//! meantime stay in the driver's own buffering.

#![no_std]

pub mod internal;
pub mod link;

pub mod time {
    pub use embassy_time::{Duration, Instant};
}
