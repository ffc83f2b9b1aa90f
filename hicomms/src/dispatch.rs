//! Per-type message handling
//!
//! `Message::dispatch` selects the handler method by the concrete message type. Every method
//! falls back to `handle_unhandled`, so a handler overrides only the types it cares about.

use crate::message::{ButtonStateChange, Heartbeat, LedStateChange, LedStateCtrl, Message};

pub trait MsgHandler {
    fn handle_heartbeat(&mut self, msg: &Heartbeat) {
        self.handle_unhandled(&(*msg).into());
    }

    fn handle_button_state_change(&mut self, msg: &ButtonStateChange) {
        self.handle_unhandled(&(*msg).into());
    }

    fn handle_led_state_change(&mut self, msg: &LedStateChange) {
        self.handle_unhandled(&(*msg).into());
    }

    fn handle_led_state_ctrl(&mut self, msg: &LedStateCtrl) {
        self.handle_unhandled(&(*msg).into());
    }

    /// Fallback for message types without a dedicated handler
    fn handle_unhandled(&mut self, msg: &Message) {
        let _ = msg;
    }
}
