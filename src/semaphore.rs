//! A blocking counting semaphore used as the pool's capacity gate.
//!
//! Unlike `tokio::sync::Semaphore`, this one blocks the calling OS thread,
//! matching the spec's thread-based acquisition model (§5). `max_size = 0`
//! is modeled as "no gate" one level up, in [`crate::pool::Pool`]; this type
//! always has a concrete capacity.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

pub(crate) struct Semaphore {
    state: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits),
            cond: Condvar::new(),
        }
    }

    /// Block until a permit is available.
    pub(crate) fn acquire(&self) {
        let mut permits = self.state.lock();
        while *permits == 0 {
            self.cond.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Block until a permit is available or `timeout` elapses. Returns
    /// `true` if a permit was acquired.
    pub(crate) fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.state.lock();
        loop {
            if *permits > 0 {
                *permits -= 1;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let remaining = deadline - now;
            let result = self.cond.wait_for(&mut permits, remaining);
            if result.timed_out() && *permits == 0 {
                return false;
            }
        }
    }

    /// Non-blocking acquire. Returns `true` if a permit was acquired.
    pub(crate) fn try_acquire(&self) -> bool {
        let mut permits = self.state.lock();
        if *permits > 0 {
            *permits -= 1;
            true
        } else {
            false
        }
    }

    /// Release a permit back to the semaphore.
    pub(crate) fn release(&self) {
        let mut permits = self.state.lock();
        *permits += 1;
        self.cond.notify_one();
    }

    /// Current number of available permits, for `stats()` reporting.
    pub(crate) fn value(&self) -> usize {
        *self.state.lock()
    }
}
