//! Board peripherals driven by the session

use core::future::pending;

use crate::message::{ButtonState, LedState};
use crate::time::{Duration, Instant};

pub trait Led {
    fn on(&mut self);
    fn off(&mut self);

    /// Actual output state. May differ from the last command if the LED is driven elsewhere.
    fn state(&self) -> LedState;

    fn set(&mut self, state: LedState) {
        match state {
            LedState::On => self.on(),
            LedState::Off => self.off(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait Button {
    /// Asynchronously waits for the next debounced edge and returns the new state.
    ///
    /// Must be cancel-safe: an edge is not lost if the future is dropped.
    async fn wait_for_change(&mut self) -> ButtonState;
}

/// Button placeholder for boards without one. Never changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoButton;

impl Button for NoButton {
    async fn wait_for_change(&mut self) -> ButtonState {
        pending().await
    }
}

/// Raw button contact, before debouncing
#[allow(async_fn_in_trait)]
pub trait ButtonInput {
    fn is_pressed(&self) -> bool;

    /// Asynchronously waits for the next level change of the contact.
    async fn wait_for_edge(&mut self);
}

/// Debounced button over a raw contact
///
/// After an edge the level is sampled once it had `delay` to settle. The settle deadline
/// survives a dropped `wait_for_change` future, so a caller that keeps re-polling from a `select`
/// loop still gets the change reported on time.
pub struct Debounced<I> {
    input: I,
    delay: Duration,
    reported: ButtonState,
    settle_at: Option<Instant>,
}

impl<I: ButtonInput> Debounced<I> {
    pub fn new(input: I, delay: Duration) -> Self {
        let reported = level_to_state(input.is_pressed());
        Self {
            input,
            delay,
            reported,
            settle_at: None,
        }
    }

    /// Last reported state
    pub fn state(&self) -> ButtonState {
        self.reported
    }

    fn level(&self) -> ButtonState {
        level_to_state(self.input.is_pressed())
    }
}

impl<I: ButtonInput> Button for Debounced<I> {
    async fn wait_for_change(&mut self) -> ButtonState {
        loop {
            let deadline = match self.settle_at {
                Some(deadline) => deadline,
                None => {
                    // A change that happened while no one was waiting has no pending edge
                    if self.level() == self.reported {
                        self.input.wait_for_edge().await;
                    }
                    let deadline = Instant::now() + self.delay;
                    self.settle_at = Some(deadline);
                    deadline
                }
            };
            embassy_time::Timer::at(deadline).await;

            self.settle_at = None;
            let state = self.level();
            // Bounces that settle at the old level are not edges
            if state != self.reported {
                self.reported = state;
                return state;
            }
        }
    }
}

fn level_to_state(pressed: bool) -> ButtonState {
    if pressed {
        ButtonState::Pressed
    } else {
        ButtonState::Released
    }
}
