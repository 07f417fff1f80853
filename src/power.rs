//! Idle and schedule driven power state machine.
//!
//! Each tick evaluates [`Rule::ORDER`] top to bottom. A rule is a pure
//! predicate over [`RuntimeState`] plus an effect on the backlight and the
//! slideshow. Later rules see the effects of earlier ones, and touch is
//! always first so user input wins over any timeout firing in the same tick.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace};

use crate::clock::{Clock, TimeOfDay};
use crate::config::{Config, RAMP_STEP, RAMP_STEP_DELAY};
use crate::error::{Error, Result};
use crate::platform::backlight::BrightnessSink;
use crate::slideshow::{Launcher, SlideshowSupervisor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// Full brightness, user recently active.
    Active,
    /// Slideshow running at full brightness.
    Slideshow,
    /// Slideshow running at the dimming floor.
    Dimmed,
    /// Backlight off for the blank window.
    Blanked,
    /// A child process could not be managed; the daemon must exit.
    Fatal,
}

impl PowerState {
    /// Numeric level used in logs: 1, 2, 3, 10 and -1 for fatal.
    pub const fn code(self) -> i32 {
        match self {
            Self::Active => 1,
            Self::Slideshow => 2,
            Self::Dimmed => 3,
            Self::Blanked => 10,
            Self::Fatal => -1,
        }
    }

    fn can_blank(self) -> bool {
        matches!(self, Self::Active | Self::Slideshow | Self::Dimmed)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Slideshow => "slideshow",
            Self::Dimmed => "dimmed",
            Self::Blanked => "blanked",
            Self::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Mutable core of the daemon, written only by [`PowerStateMachine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    pub state: PowerState,
    pub last_touch_at: Instant,
    pub current_brightness: u32,
    /// Level used while active and restored on touch.
    pub full_brightness: u32,
    /// Level captured when blanking started, restored when it ends.
    pub saved_brightness: Option<u32>,
}

impl RuntimeState {
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_touch_at)
    }
}

/// What the control loop observed for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub touched: bool,
    pub now: Instant,
    pub time_of_day: TimeOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Touch,
    SlideTimeout,
    DimTimeout,
    BlankStart,
    BlankEnd,
}

impl Rule {
    /// Evaluation order within a tick.
    pub const ORDER: [Rule; 5] = [
        Rule::Touch,
        Rule::SlideTimeout,
        Rule::DimTimeout,
        Rule::BlankStart,
        Rule::BlankEnd,
    ];

    pub fn applies(self, runtime: &RuntimeState, config: &Config, input: &TickInput) -> bool {
        let idle = runtime.idle_for(input.now);
        let window = config.blank_window.and_then(|w| w.enabled());
        match self {
            Rule::Touch => input.touched,
            Rule::SlideTimeout => {
                runtime.state == PowerState::Active && idle > config.slide_timeout
            }
            Rule::DimTimeout => {
                runtime.state == PowerState::Slideshow && idle > config.dim_after()
            }
            Rule::BlankStart => {
                runtime.state.can_blank()
                    && window.is_some_and(|w| w.start == input.time_of_day)
            }
            Rule::BlankEnd => {
                runtime.state == PowerState::Blanked
                    && window.is_some_and(|w| w.end == input.time_of_day)
            }
        }
    }
}

pub struct PowerStateMachine<B, L, C>
where
    B: BrightnessSink,
    L: Launcher,
    C: Clock,
{
    config: Config,
    runtime: RuntimeState,
    sink: B,
    slideshow: SlideshowSupervisor<L>,
    clock: C,
    shut_down: bool,
}

impl<B, L, C> PowerStateMachine<B, L, C>
where
    B: BrightnessSink,
    L: Launcher,
    C: Clock,
{
    /// Writes the initial brightness and starts in [`PowerState::Active`].
    pub fn new(
        config: Config,
        mut sink: B,
        slideshow: SlideshowSupervisor<L>,
        clock: C,
    ) -> Result<Self> {
        let max = sink.max_brightness();
        if config.min_brightness > max {
            return Err(Error::InvalidConfig(format!(
                "min brightness {} exceeds hardware maximum {max}",
                config.min_brightness
            )));
        }
        let full_brightness = config.initial_brightness.min(max);
        sink.set_brightness(full_brightness)?;
        info!(brightness = full_brightness, max, "initial brightness set");

        let runtime = RuntimeState {
            state: PowerState::Active,
            last_touch_at: clock.now(),
            current_brightness: full_brightness,
            full_brightness,
            saved_brightness: None,
        };
        Ok(Self {
            config,
            runtime,
            sink,
            slideshow,
            clock,
            shut_down: false,
        })
    }

    pub fn state(&self) -> PowerState {
        self.runtime.state
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    pub fn slideshow_running(&self) -> bool {
        self.slideshow.is_running()
    }

    /// Runs one tick. Backlight write failures are returned as errors; child
    /// process failures move the machine to [`PowerState::Fatal`].
    pub fn tick(&mut self, touched: bool) -> Result<PowerState> {
        if self.runtime.state == PowerState::Fatal {
            return Ok(PowerState::Fatal);
        }
        let input = TickInput {
            touched,
            now: self.clock.now(),
            time_of_day: self.clock.time_of_day(),
        };
        for rule in Rule::ORDER {
            if self.runtime.state == PowerState::Fatal {
                break;
            }
            if rule.applies(&self.runtime, &self.config, &input) {
                trace!(?rule, "rule fired");
                self.apply(rule, &input)?;
            }
        }
        Ok(self.runtime.state)
    }

    /// Kills any slideshow and restores brightness. Runs at most once; later
    /// calls do nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        info!(state = %self.runtime.state, "shutting down");
        self.slideshow.force_kill();
        let level = self
            .runtime
            .saved_brightness
            .take()
            .unwrap_or(self.runtime.full_brightness);
        if let Err(err) = self.write(level) {
            error!(error = %err, level, "failed to restore brightness during shutdown");
        }
    }

    fn apply(&mut self, rule: Rule, input: &TickInput) -> Result<()> {
        match rule {
            Rule::Touch => self.on_touch(input),
            Rule::SlideTimeout => {
                info!(idle = ?self.runtime.idle_for(input.now), "slide timeout reached");
                self.start_slideshow();
                Ok(())
            }
            Rule::DimTimeout => {
                info!(idle = ?self.runtime.idle_for(input.now), "dim timeout reached");
                self.transition(PowerState::Dimmed);
                self.ramp_to(self.config.min_brightness)
            }
            Rule::BlankStart => {
                info!(time = %input.time_of_day, "blank period started");
                self.runtime.saved_brightness = Some(self.runtime.current_brightness);
                self.transition(PowerState::Blanked);
                self.ramp_to(0)
            }
            Rule::BlankEnd => {
                info!(time = %input.time_of_day, "blank period ended");
                let level = self
                    .runtime
                    .saved_brightness
                    .take()
                    .unwrap_or(self.runtime.full_brightness);
                self.write(level)?;
                if self.slideshow.is_running() {
                    self.transition(PowerState::Slideshow);
                } else {
                    self.start_slideshow();
                }
                Ok(())
            }
        }
    }

    fn on_touch(&mut self, input: &TickInput) -> Result<()> {
        self.runtime.last_touch_at = input.now;
        let restore = match self.runtime.state {
            PowerState::Dimmed => Some(self.runtime.full_brightness),
            PowerState::Blanked => Some(
                self.runtime
                    .saved_brightness
                    .take()
                    .unwrap_or(self.runtime.full_brightness),
            ),
            _ => None,
        };
        if let Some(level) = restore {
            self.runtime.saved_brightness = None;
            self.write(level)?;
            self.transition(PowerState::Slideshow);
        }
        if self.runtime.state != PowerState::Slideshow {
            return Ok(());
        }
        if !self.slideshow.is_running() {
            self.transition(PowerState::Active);
            return Ok(());
        }
        match self.slideshow.stop() {
            Ok(_) => self.transition(PowerState::Active),
            Err(err) => self.fail(err),
        }
        Ok(())
    }

    fn start_slideshow(&mut self) {
        match self.slideshow.start() {
            Ok(_) => self.transition(PowerState::Slideshow),
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: Error) {
        error!(error = %err, state = %self.runtime.state, "slideshow lifecycle failure");
        self.transition(PowerState::Fatal);
    }

    fn transition(&mut self, next: PowerState) {
        if self.runtime.state != next {
            info!(from = %self.runtime.state, to = %next, code = next.code(), "state change");
            self.runtime.state = next;
        }
    }

    /// Steps down to `target`, sleeping after every write. Never undershoots.
    fn ramp_to(&mut self, target: u32) -> Result<()> {
        while self.runtime.current_brightness > target {
            let next = self
                .runtime
                .current_brightness
                .saturating_sub(RAMP_STEP)
                .max(target);
            self.write(next)?;
            trace!(brightness = next, target, "ramp step");
            self.clock.sleep(RAMP_STEP_DELAY);
        }
        debug!(brightness = self.runtime.current_brightness, "ramp finished");
        Ok(())
    }

    fn write(&mut self, level: u32) -> Result<()> {
        debug_assert!(level <= self.sink.max_brightness());
        self.sink.set_brightness(level)?;
        self.runtime.current_brightness = level;
        Ok(())
    }
}
