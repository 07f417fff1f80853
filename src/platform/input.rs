//! Touch activity detection on evdev input devices.
//!
//! Events are only counted, never interpreted: any event on a watched
//! device is treated as a touch.

use std::collections::BTreeSet;
use std::io;
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};

use evdev::Device;
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Indices of the sources that produced at least one event during a poll.
pub type ActivitySet = BTreeSet<usize>;

/// Anything that can report touch activity without blocking.
pub trait ActivitySource {
    fn poll(&mut self) -> ActivitySet;
}

/// The configured evdev touch devices, all in non-blocking mode.
pub struct InputWatcher {
    sources: Vec<InputSource>,
}

struct InputSource {
    path: PathBuf,
    device: Device,
}

impl InputWatcher {
    /// Opens every device; a single failure aborts startup.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref().to_path_buf();
            let device = Device::open(&path).map_err(|source| Error::InputOpen {
                path: path.clone(),
                source,
            })?;
            set_nonblocking(&device).map_err(|source| Error::InputConfigure {
                path: path.clone(),
                source,
            })?;
            info!(
                device = %path.display(),
                name = device.name().unwrap_or("<unnamed>"),
                "watching input device"
            );
            sources.push(InputSource { path, device });
        }
        Ok(Self { sources })
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(|source| source.path.as_path())
    }
}

impl ActivitySource for InputWatcher {
    fn poll(&mut self) -> ActivitySet {
        let mut active = ActivitySet::new();
        for (index, source) in self.sources.iter_mut().enumerate() {
            if source.drain() {
                active.insert(index);
            }
        }
        active
    }
}

impl InputSource {
    /// One read attempt; events beyond what the read returns are left for
    /// the next poll.
    fn drain(&mut self) -> bool {
        match self.device.fetch_events() {
            Ok(events) => {
                let count = events.count();
                if count > 0 {
                    debug!(device = %self.path.display(), count, "input activity");
                }
                count > 0
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => false,
            Err(err) => {
                warn!(device = %self.path.display(), error = %err, "failed reading input events");
                false
            }
        }
    }
}

fn set_nonblocking(device: &Device) -> nix::Result<()> {
    let current = fcntl(device.as_fd(), FcntlArg::F_GETFL)?;
    let mut flags = OFlag::from_bits_retain(current);
    flags.insert(OFlag::O_NONBLOCK);
    fcntl(device.as_fd(), FcntlArg::F_SETFL(flags))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("event9");
        let result = InputWatcher::open(&[missing.clone()]);
        match result {
            Err(Error::InputOpen { path, .. }) => assert_eq!(path, missing),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opening a missing device should fail"),
        }
    }

    #[test]
    fn empty_device_list_reports_no_activity() {
        let mut watcher = InputWatcher::open::<PathBuf>(&[]).unwrap();
        assert!(watcher.poll().is_empty());
        assert_eq!(watcher.paths().count(), 0);
    }
}
