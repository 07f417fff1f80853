//! The fixed-period control loop tying input polling to the state machine.
//!
//! The loop never exits without running [`PowerStateMachine::shutdown`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::Result;
use crate::platform::backlight::BrightnessSink;
use crate::platform::input::ActivitySource;
use crate::power::{PowerState, PowerStateMachine};
use crate::slideshow::Launcher;

/// Longest uninterrupted sleep between stop-flag checks.
const STOP_POLL: Duration = Duration::from_secs(1);

/// Why the control loop ended. Cleanup has already run in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A termination signal was received.
    Shutdown,
    /// The state machine reached [`PowerState::Fatal`].
    Fatal,
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => f.write_str("stopped by signal"),
            Self::Fatal => f.write_str("slideshow process could not be managed"),
        }
    }
}

/// The fixed-period control loop.
pub struct Daemon<A, B, L, C>
where
    A: ActivitySource,
    B: BrightnessSink,
    L: Launcher,
    C: Clock,
{
    input: A,
    machine: PowerStateMachine<B, L, C>,
    clock: C,
    tick_interval: Duration,
    stop: Arc<AtomicBool>,
}

impl<A, B, L, C> Daemon<A, B, L, C>
where
    A: ActivitySource,
    B: BrightnessSink,
    L: Launcher,
    C: Clock,
{
    pub fn new(
        input: A,
        machine: PowerStateMachine<B, L, C>,
        clock: C,
        tick_interval: Duration,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            input,
            machine,
            clock,
            tick_interval,
            stop,
        }
    }

    pub fn machine(&self) -> &PowerStateMachine<B, L, C> {
        &self.machine
    }

    /// Polls, ticks and sleeps until a stop is requested or the machine
    /// turns fatal. Backlight errors end the loop early with an error after
    /// the same cleanup pass.
    pub fn run(&mut self) -> Result<Exit> {
        info!(tick = ?self.tick_interval, "control loop running");
        let exit = loop {
            if self.stop_requested() {
                info!("stop requested");
                break Exit::Shutdown;
            }

            let active = self.input.poll();
            if !active.is_empty() {
                debug!(sources = ?active, "touch detected");
            }
            match self.machine.tick(!active.is_empty()) {
                Ok(PowerState::Fatal) => {
                    error!("unrecoverable error, resetting everything");
                    break Exit::Fatal;
                }
                Ok(_) => {}
                Err(err) => {
                    error!(error = %err, "backlight failure");
                    self.machine.shutdown();
                    return Err(err);
                }
            }

            self.sleep_until_next_tick();
        };
        self.machine.shutdown();
        Ok(exit)
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn sleep_until_next_tick(&self) {
        let mut remaining = self.tick_interval;
        while !remaining.is_zero() && !self.stop_requested() {
            let slice = remaining.min(STOP_POLL);
            self.clock.sleep(slice);
            remaining -= slice;
        }
    }
}
