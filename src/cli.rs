//! Command-line surface.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{
    BlankWindow, Config, DEFAULT_INITIAL_BRIGHTNESS, MIN_BRIGHTNESS_RANGE, SlideshowCommand,
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "touch-dimmer",
    version,
    about = "Starts a slideshow, dims and blanks a touchscreen when idle, and wakes it on touch",
    after_help = "Use lsinput to list input devices; a device given as event0 is opened as /dev/input/event0."
)]
pub struct Cli {
    /// Minutes after the last touch before the slideshow starts.
    #[arg(value_name = "SLIDE_TIMEOUT_MIN")]
    pub slide_timeout: u64,

    /// Directory of pictures shown by the slideshow.
    #[arg(value_name = "SLIDE_PICTURES")]
    pub slide_pictures: PathBuf,

    /// Minutes after the slideshow started before the screen is dimmed (0 = immediately).
    #[arg(value_name = "DIM_TIMEOUT_MIN")]
    pub dim_timeout: u64,

    /// Brightness the screen is dimmed to (50-254).
    #[arg(
        value_name = "MIN_BRIGHTNESS",
        value_parser = clap::value_parser!(u32).range(
            i64::from(*MIN_BRIGHTNESS_RANGE.start())..=i64::from(*MIN_BRIGHTNESS_RANGE.end())
        )
    )]
    pub min_brightness: u32,

    /// Daily blank period as HH:MM-HH:MM, 24h; 00:00-00:00 disables blanking.
    #[arg(value_name = "BLANK_PERIOD")]
    pub blank_period: BlankWindow,

    /// Input devices, relative to --input-dir.
    #[arg(value_name = "DEVICE", required = true, num_args = 1..)]
    pub devices: Vec<PathBuf>,

    /// Backlight device directory.
    #[arg(long, default_value = "/sys/class/backlight/rpi_backlight")]
    pub backlight: PathBuf,

    /// Directory the input device names are resolved against.
    #[arg(long, default_value = "/dev/input")]
    pub input_dir: PathBuf,

    /// Brightness set at startup and restored on touch.
    #[arg(long, default_value_t = DEFAULT_INITIAL_BRIGHTNESS)]
    pub initial_brightness: u32,

    /// Slideshow executable.
    #[arg(long, default_value = "/usr/local/bin/slide")]
    pub slideshow_bin: PathBuf,

    /// Seconds each picture is shown (passed as `-t`).
    #[arg(long, default_value_t = 60)]
    pub slide_interval: u64,

    /// X display the slideshow renders to.
    #[arg(long, default_value = ":0.0")]
    pub display: String,

    /// X authority file for the display.
    #[arg(long, default_value = "/home/pi/.Xauthority")]
    pub xauthority: PathBuf,

    /// Time between polls of the touch devices and clocks.
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub tick_interval: Duration,

    /// Logging level (error|warn|info|debug|trace).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Validates the arguments and resolves them into a [`Config`].
    pub fn into_config(self) -> Result<Config> {
        if !self.slide_pictures.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "slide pictures path is not a directory: {}",
                self.slide_pictures.display()
            )));
        }

        let devices = self
            .devices
            .iter()
            .map(|device| self.input_dir.join(device))
            .collect();
        let slideshow = SlideshowCommand::slide(
            self.slideshow_bin,
            &self.slide_pictures,
            self.slide_interval,
            &self.display,
            &self.xauthority,
        );

        let config = Config {
            slide_timeout: minutes(self.slide_timeout, "slide timeout")?,
            dim_timeout: minutes(self.dim_timeout, "dim timeout")?,
            min_brightness: self.min_brightness,
            initial_brightness: self.initial_brightness,
            blank_window: self.blank_period.enabled(),
            devices,
            slideshow,
            backlight_dir: self.backlight,
            tick_interval: self.tick_interval,
        };
        config.validate()?;
        Ok(config)
    }
}

fn minutes(value: u64, label: &str) -> Result<Duration> {
    value
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| Error::InvalidConfig(format!("{label} of {value} minutes is too large")))
}
