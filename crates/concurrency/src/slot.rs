//! Single-use result handoff
//!
//! The connection worker fills a [`ResultSlot`] exactly once; the
//! committing thread takes the value or gives up at its deadline. A value
//! delivered after the taker gave up is dropped.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

enum SlotState<T> {
    Empty,
    Full(T),
    Closed,
}

/// Capacity-one channel between the worker and a committing thread
pub struct ResultSlot<T> {
    state: Mutex<SlotState<T>>,
    filled: Condvar,
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultSlot<T> {
    /// An empty slot
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
            filled: Condvar::new(),
        }
    }

    /// Deliver `value`; returns false if the slot was already filled or the
    /// taker gave up
    pub fn put(&self, value: T) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, SlotState::Empty) {
            return false;
        }
        *state = SlotState::Full(value);
        self.filled.notify_all();
        true
    }

    /// Take the value, waiting up to `timeout`; the slot is closed either way
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        while matches!(*state, SlotState::Empty) {
            match deadline {
                Some(deadline) => {
                    if self.filled.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.filled.wait(&mut state),
            }
        }
        match std::mem::replace(&mut *state, SlotState::Closed) {
            SlotState::Full(value) => Some(value),
            _ => None,
        }
    }

    /// True once a value was delivered and not yet taken
    pub fn is_full(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Full(_))
    }
}
