use std::path::PathBuf;

use thiserror::Error;

/// Library error type for touch-dimmer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A backlight attribute could not be read.
    #[error("failed to read {}", path.display())]
    BacklightRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backlight attribute did not contain a decimal integer.
    #[error("{} does not hold a brightness value: {value:?}", path.display())]
    BacklightParse { path: PathBuf, value: String },

    /// The backlight `brightness` attribute could not be opened for writing.
    #[error("failed to open {} for writing", path.display())]
    BacklightOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a level to the backlight failed; the physical state is unknown.
    #[error("failed to write brightness {level} to {}", path.display())]
    BacklightWrite {
        path: PathBuf,
        level: u32,
        #[source]
        source: std::io::Error,
    },

    /// An input device could not be opened.
    #[error("failed to open input device {}", path.display())]
    InputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input device could not be switched to non-blocking mode.
    #[error("failed to set {} non-blocking", path.display())]
    InputConfigure {
        path: PathBuf,
        #[source]
        source: nix::errno::Errno,
    },

    /// The slideshow process could not be created.
    #[error("failed to spawn slideshow {}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A second slideshow was requested while one is still tracked.
    #[error("slideshow process {pid} is still running")]
    AlreadyRunning { pid: u32 },

    /// A stop was requested with no slideshow tracked.
    #[error("no slideshow process is running")]
    NotRunning,

    /// The interrupt signal could not be delivered to the slideshow.
    #[error("failed to signal slideshow process {pid}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    /// The slideshow process could not be reaped after signalling.
    #[error("failed to reap slideshow process {pid}")]
    Reap {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    /// A startup value is outside its accepted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The blank period is not in `HH:MM-HH:MM` form.
    #[error("invalid blank period {0:?} (expected HH:MM-HH:MM)")]
    InvalidBlankWindow(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
