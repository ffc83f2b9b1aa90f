//! Cancellable deadline timer
//!
//! A port owns one timer state. The session waits on it through a `Timer` handle, while
//! `Control` may cancel and restart it from another task.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::{Context, Poll};

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::{Mutex, raw::RawMutex};
use embassy_sync::waitqueue::WakerRegistration;

use crate::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitError {
    /// The timer was cancelled
    Aborted,
}

pub(crate) trait DynamicTimer {
    fn is_cancelled(&self) -> bool;
    fn poll_cancelled(&self, cx: &mut Context<'_>) -> Poll<()>;
    fn poll_restarted(&self, cx: &mut Context<'_>) -> Poll<()>;
    fn set_cancelled(&self, cancelled: bool);
}

pub(crate) struct TimerState<M: RawMutex> {
    state: Mutex<M, RefCell<State>>,
}

struct State {
    cancelled: bool,
    waker: WakerRegistration,
}

impl<M: RawMutex> TimerState<M> {
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                cancelled: false,
                waker: WakerRegistration::new(),
            })),
        }
    }
}

impl<M: RawMutex> DynamicTimer for TimerState<M> {
    fn is_cancelled(&self) -> bool {
        self.state.lock(|state| state.borrow().cancelled)
    }

    fn poll_cancelled(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.cancelled {
                Poll::Ready(())
            } else {
                state.waker.register(cx.waker());
                Poll::Pending
            }
        })
    }

    fn poll_restarted(&self, cx: &mut Context<'_>) -> Poll<()> {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.cancelled {
                state.waker.register(cx.waker());
                Poll::Pending
            } else {
                Poll::Ready(())
            }
        })
    }

    fn set_cancelled(&self, cancelled: bool) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.cancelled != cancelled {
                state.cancelled = cancelled;
                state.waker.wake();
            }
        })
    }
}

/// Timer handle
///
/// Only one task should wait on a timer at a time.
#[derive(Clone, Copy)]
pub struct Timer<'a>(&'a (dyn DynamicTimer + Sync));

impl<'a> Timer<'a> {
    pub(crate) fn new(state: &'a (dyn DynamicTimer + Sync)) -> Self {
        Self(state)
    }

    /// Asynchronously waits for `deadline`.
    ///
    /// Fails with `WaitError::Aborted` while the timer is cancelled, including cancellation
    /// during the wait.
    pub async fn wait_until(&self, deadline: Instant) -> Result<(), WaitError> {
        if self.is_cancelled() {
            return Err(WaitError::Aborted);
        }
        let expired = embassy_time::Timer::at(deadline);
        let cancelled = poll_fn(|cx| self.0.poll_cancelled(cx));
        match select(expired, cancelled).await {
            Either::First(()) => Ok(()),
            Either::Second(()) => Err(WaitError::Aborted),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Cancels the pending and all later waits until `restart`.
    pub fn cancel(&self) {
        self.0.set_cancelled(true);
    }

    pub fn restart(&self) {
        self.0.set_cancelled(false);
    }

    /// Asynchronously waits until the timer is not cancelled.
    pub async fn wait_restarted(&self) {
        poll_fn(|cx| self.0.poll_restarted(cx)).await
    }
}
