//! Hicomms example project for the Nucleo-G431RB board.
//!
//! To use this crate on other STM32G4 boards, update the chip name in `Cargo.toml`
//! and `.cargo/config.toml`.
//!
//! The link runs over LPUART1, which the on-board ST-LINK exposes as a virtual COM port
//! (115200 baud, 8N1). The user LED (LD2) follows `LedStateCtrl` requests and the user button
//! (B1) edges are reported as `ButtonStateChange`.

#![no_std]

pub mod board;
