//! Time source used by the state machine and the main loop.
//!
//! The daemon needs two notions of time: a monotonic instant for idle
//! timeouts and the local wall-clock minute for the blank window. Ramps and
//! the tick cadence also sleep through the clock so tests can run a whole
//! night of transitions without waiting.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{Local, Timelike};

/// Hour and minute of the local wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self { hour: 0, minute: 0 };

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

pub trait Clock {
    /// Monotonic instant used for idle durations.
    fn now(&self) -> Instant;

    /// Current local time of day, truncated to the minute.
    fn time_of_day(&self) -> TimeOfDay;

    /// Block the control thread.
    fn sleep(&self, duration: Duration);
}

/// Real clock backed by `Instant`, the local timezone and `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn time_of_day(&self) -> TimeOfDay {
        let now = Local::now();
        TimeOfDay {
            hour: now.hour(),
            minute: now.minute(),
        }
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
