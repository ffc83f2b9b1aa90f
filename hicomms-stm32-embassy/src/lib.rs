//! STM32 UART driver adapter for the hicomms stack
//!
//! This adapter integrates the buffered UART driver from the Embassy framework with the hicomms
//! stack. Received bytes and line errors are forwarded to the link; bytes produced by the stack
//! are written out in order.
//!
//! # Limitations
//!
//! * No hardware flow control
//! * A transmit error loses the affected chunk; the stack does not retransmit
//! * Line errors are reported after the bytes received before them, so the session resynchronizes
//!   on the next sync prefix
//!
//! # Examples
//!
//! See the `uart_comms` binary in the `nucleo-g431rb` crate.

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
mod driver;

pub use driver::{RxRunner, TxRunner, bind};
