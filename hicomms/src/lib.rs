//! # Hicomms
//!
//! This library implements a small framed message protocol over a serial byte stream for no_std
//! environments. Frames carry one message of a closed set (heartbeat, LED and button state) and
//! are protected by a sync prefix, a size field and a checksum. All buffers are statically
//! sized; no dynamic memory allocation is required.
//!
//! The library targets the Embassy async framework.
//!
//! ## Architecture
//!
//! ```text
//!                ┌─────────┐
//!                │ Control │
//!                └────┬────┘
//!                     ▼
//! ┌──────┐      ┌───────────┐      ┌─────────┐
//! │ Link ├─────►│   Port    │◄─────┤ Session │
//! └──────┘      │ RX buffer │      │  Stack  │
//!               │ TX buffer │      └────┬────┘
//!               │   Timer   │           ▼
//!               └───────────┘   ┌──────────────┐
//!                               │ LED / Button │
//!                               └──────────────┘
//! ```
//! Components:
//! * _Port_ holds the input and output stream buffers and the heartbeat timer state of a single
//!   serial link.
//! * _Link_ is an asynchronous byte channel that a UART driver runner consumes.
//! * _Session_ is a task that decodes incoming frames through the protocol stack, dispatches
//!   them to per-type handlers, reports button edges and emits periodic heartbeats.
//! * _Protocol stack_ is a composition of codec layers, one per frame field.
//! * _Control_ is a handle for stopping and resuming reception and the heartbeat.
//!
//! ## Frame format
//!
//! ```text
//! SyncPrefix(2) | Size(1) | MsgId(1) | Payload(N) | Checksum(2)
//! ```
//! All fields are big-endian. `Size` counts the bytes after it, checksum included. `Checksum`
//! is the 16-bit wrapping sum of all bytes from `Size` up to the checksum.
//!
//! ## Concurrency model
//!
//! The port uses a mutex to synchronize the driver, the session and the controller. There are
//! two mutex implementation options:
//! * _CriticalSectionRawMutex_ allows stack components to run concurrently (at different
//!   interrupt levels), but can add bounded priority inversion to the rest of the system.
//! * _ThreadModeRawMutex_ has no system-wide effects but requires all components to run in a
//!   thread (non-interrupt) executor.
//!
//! Critical sections are bounded by the buffer capacities: a copy in or out, a linearization
//! of the input ring, or a single frame decode.
//!
//! ## Limitations
//!
//! * A single link per port; no routing, fragmentation or retransmission.
//! * The message set is fixed at build time.
#![no_std]

pub use hicomms_core as core;
pub use hicomms_driver::{link, time};

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod buffer;
pub mod component;
pub mod dispatch;
pub mod message;
pub mod port;
pub mod protocol;
pub mod session;
pub mod timer;
