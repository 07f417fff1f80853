pub mod cli;
pub mod clock;
pub mod config;
pub mod daemon;
pub mod error;
pub mod platform {
    pub mod backlight;
    pub mod input;
}
pub mod power;
pub mod slideshow;

pub use error::{Error, Result};
