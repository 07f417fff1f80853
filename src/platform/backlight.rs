//! Backlight control through the kernel's sysfs class interface.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Hardware surface the brightness level is written to.
///
/// Callers keep every level within `0..=max_brightness()`; implementations
/// do not clamp.
pub trait BrightnessSink {
    fn max_brightness(&self) -> u32;

    /// Level the hardware currently reports.
    fn brightness(&mut self) -> Result<u32>;

    /// Writes `level` and makes it visible before returning.
    fn set_brightness(&mut self, level: u32) -> Result<()>;
}

/// A `/sys/class/backlight/<name>` device.
#[derive(Debug)]
pub struct SysfsBacklight {
    dir: PathBuf,
    brightness_path: PathBuf,
    brightness: File,
    max_brightness: u32,
}

impl SysfsBacklight {
    /// Reads `max_brightness` and opens `brightness` for writing. Both must
    /// succeed; without them the backlight state cannot be known.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let max_brightness = read_level(&dir.join("max_brightness"))?;
        let brightness_path = dir.join("brightness");
        let brightness = OpenOptions::new()
            .write(true)
            .open(&brightness_path)
            .map_err(|source| Error::BacklightOpen {
                path: brightness_path.clone(),
                source,
            })?;
        debug!(dir = %dir.display(), max_brightness, "opened backlight");
        Ok(Self {
            dir,
            brightness_path,
            brightness,
            max_brightness,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BrightnessSink for SysfsBacklight {
    fn max_brightness(&self) -> u32 {
        self.max_brightness
    }

    fn brightness(&mut self) -> Result<u32> {
        let actual = self.dir.join("actual_brightness");
        if actual.exists() {
            read_level(&actual)
        } else {
            read_level(&self.brightness_path)
        }
    }

    fn set_brightness(&mut self, level: u32) -> Result<()> {
        // sysfs attributes take the whole value in a single write at offset 0
        let line = format!("{level}\n");
        rewrite(&mut self.brightness, line.as_bytes()).map_err(|source| Error::BacklightWrite {
            path: self.brightness_path.clone(),
            level,
            source,
        })?;
        debug!(level, "wrote backlight value");
        Ok(())
    }
}

fn rewrite(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    file.write_all(bytes)?;
    file.flush()
}

fn read_level(path: &Path) -> Result<u32> {
    let raw = fs::read_to_string(path).map_err(|source| Error::BacklightRead {
        path: path.to_path_buf(),
        source,
    })?;
    raw.trim().parse().map_err(|_| Error::BacklightParse {
        path: path.to_path_buf(),
        value: raw.trim().to_string(),
    })
}
