//! Resolved daemon configuration and the value types it is built from.

use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveTime, Timelike};

use crate::clock::TimeOfDay;
use crate::error::{Error, Result};

/// Dimming floor accepted on the command line.
pub const MIN_BRIGHTNESS_RANGE: RangeInclusive<u32> = 50..=254;

/// Brightness written at startup and restored on touch.
pub const DEFAULT_INITIAL_BRIGHTNESS: u32 = 200;

/// Decrement applied per ramp step.
pub const RAMP_STEP: u32 = 5;

/// Pause after each ramp step.
pub const RAMP_STEP_DELAY: Duration = Duration::from_secs(1);

/// Daily interval during which the screen is forced dark.
///
/// Both ends are matched to the exact minute; there is no notion of being
/// "inside" the window, only of reaching its start or its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlankWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl BlankWindow {
    /// `00:00-00:00` and any other window with equal ends blanks nothing.
    pub fn is_disabled(&self) -> bool {
        self.start == self.end
    }

    /// The window if it blanks anything at all.
    pub fn enabled(self) -> Option<Self> {
        (!self.is_disabled()).then_some(self)
    }
}

impl Default for BlankWindow {
    fn default() -> Self {
        Self {
            start: TimeOfDay::MIDNIGHT,
            end: TimeOfDay::MIDNIGHT,
        }
    }
}

impl FromStr for BlankWindow {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidBlankWindow(raw.to_string());
        let (start, end) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let start = parse_time_of_day(start).ok_or_else(invalid)?;
        let end = parse_time_of_day(end).ok_or_else(invalid)?;
        Ok(Self { start, end })
    }
}

impl fmt::Display for BlankWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

fn parse_time_of_day(raw: &str) -> Option<TimeOfDay> {
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()?;
    TimeOfDay::new(time.hour(), time.minute())
}

/// How the slideshow helper is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideshowCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// The complete environment of the child; nothing is inherited.
    pub env: Vec<(String, String)>,
}

impl SlideshowCommand {
    /// Builds `<program> -t <interval> -p <pictures> -s -r` with a display
    /// target and X authority file as its only environment.
    pub fn slide(
        program: impl Into<PathBuf>,
        pictures: &Path,
        interval_secs: u64,
        display: &str,
        xauthority: &Path,
    ) -> Self {
        Self {
            program: program.into(),
            args: vec![
                "-t".to_string(),
                interval_secs.to_string(),
                "-p".to_string(),
                pictures.display().to_string(),
                "-s".to_string(),
                "-r".to_string(),
            ],
            env: vec![
                ("DISPLAY".to_string(), display.to_string()),
                ("XAUTHORITY".to_string(), xauthority.display().to_string()),
            ],
        }
    }
}

impl fmt::Display for SlideshowCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Immutable daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Idle time after the last touch before the slideshow starts.
    pub slide_timeout: Duration,
    /// Additional idle time after the slideshow start before dimming.
    pub dim_timeout: Duration,
    pub min_brightness: u32,
    pub initial_brightness: u32,
    pub blank_window: Option<BlankWindow>,
    pub devices: Vec<PathBuf>,
    pub slideshow: SlideshowCommand,
    pub backlight_dir: PathBuf,
    pub tick_interval: Duration,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !MIN_BRIGHTNESS_RANGE.contains(&self.min_brightness) {
            return Err(Error::InvalidConfig(format!(
                "min brightness must be {}-{}, got {}",
                MIN_BRIGHTNESS_RANGE.start(),
                MIN_BRIGHTNESS_RANGE.end(),
                self.min_brightness
            )));
        }
        if self.initial_brightness < self.min_brightness {
            return Err(Error::InvalidConfig(format!(
                "initial brightness {} is below min brightness {}",
                self.initial_brightness, self.min_brightness
            )));
        }
        if self.devices.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one input device is required".to_string(),
            ));
        }
        if self.tick_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "tick interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Idle time after which the dimming ramp starts.
    pub fn dim_after(&self) -> Duration {
        self.slide_timeout + self.dim_timeout
    }

    /// Checks the configuration against the hardware range and settles the
    /// levels the state machine will use.
    pub fn fit_to_hardware(&mut self, max_brightness: u32) -> Result<()> {
        if self.min_brightness > max_brightness {
            return Err(Error::InvalidConfig(format!(
                "min brightness {} exceeds hardware maximum {max_brightness}",
                self.min_brightness
            )));
        }
        self.initial_brightness = self.initial_brightness.min(max_brightness);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn config() -> Config {
        Config {
            slide_timeout: Duration::from_secs(60),
            dim_timeout: Duration::from_secs(120),
            min_brightness: 50,
            initial_brightness: DEFAULT_INITIAL_BRIGHTNESS,
            blank_window: Some(BlankWindow {
                start: TimeOfDay::new(22, 0).unwrap(),
                end: TimeOfDay::new(6, 0).unwrap(),
            }),
            devices: vec![PathBuf::from("/dev/input/event0")],
            slideshow: SlideshowCommand::slide(
                "/usr/local/bin/slide",
                Path::new("/srv/pictures"),
                60,
                ":0.0",
                Path::new("/home/pi/.Xauthority"),
            ),
            backlight_dir: PathBuf::from("/sys/class/backlight/rpi_backlight"),
            tick_interval: Duration::from_secs(30),
        }
    }
}
