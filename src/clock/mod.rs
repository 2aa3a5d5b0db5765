// src/clock/mod.rs

//! Time source abstraction.
//!
//! The cache asks a [`Clock`] for the current instant instead of calling
//! `Instant::now()` directly, so tests can drive expiry by hand with
//! [`mock::ManualClock`]. Execution timings still use real time.

use std::fmt::Debug;
use std::time::Instant;

pub mod mock;

pub use mock::ManualClock;

/// Abstract monotonic clock.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// Implementation backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
