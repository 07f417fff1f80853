//! Lifecycle of the external slideshow helper.
//!
//! At most one helper runs at a time. It is stopped with SIGINT and always
//! reaped, so the daemon never leaves defunct entries in the process table.

use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::config::SlideshowCommand;
use crate::error::{Error, Result};

/// A started helper process.
pub trait SlideshowChild {
    fn id(&self) -> u32;

    fn signal(&mut self, signal: Signal) -> nix::Result<()>;

    /// Blocks until the process has exited and been reaped.
    fn wait(&mut self) -> io::Result<ExitStatus>;
}

/// Creates helper processes.
pub trait Launcher {
    type Child: SlideshowChild;

    fn launch(&mut self, command: &SlideshowCommand) -> io::Result<Self::Child>;
}

/// Spawns the helper with `std::process` and an empty base environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandLauncher;

impl Launcher for CommandLauncher {
    type Child = Child;

    fn launch(&mut self, command: &SlideshowCommand) -> io::Result<Child> {
        Command::new(&command.program)
            .args(&command.args)
            .env_clear()
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .spawn()
    }
}

impl SlideshowChild for Child {
    fn id(&self) -> u32 {
        Child::id(self)
    }

    fn signal(&mut self, signal: Signal) -> nix::Result<()> {
        let pid = i32::try_from(Child::id(self)).map_err(|_| nix::errno::Errno::ESRCH)?;
        kill(Pid::from_raw(pid), signal)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        Child::wait(self)
    }
}

/// Owns the single slideshow process, if any.
pub struct SlideshowSupervisor<L: Launcher> {
    launcher: L,
    command: SlideshowCommand,
    child: Option<L::Child>,
}

impl<L: Launcher> SlideshowSupervisor<L> {
    pub fn new(launcher: L, command: SlideshowCommand) -> Self {
        Self {
            launcher,
            command,
            child: None,
        }
    }

    /// Whether a helper was started and has not been stopped yet.
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(SlideshowChild::id)
    }

    pub fn start(&mut self) -> Result<u32> {
        if let Some(pid) = self.pid() {
            return Err(Error::AlreadyRunning { pid });
        }
        let child = self
            .launcher
            .launch(&self.command)
            .map_err(|source| Error::Spawn {
                program: self.command.program.clone(),
                source,
            })?;
        let pid = child.id();
        info!(pid, command = %self.command, "slideshow started");
        self.child = Some(child);
        Ok(pid)
    }

    /// Interrupts the helper and reaps it.
    ///
    /// On failure the handle stays tracked so [`force_kill`](Self::force_kill)
    /// can still try on the way out.
    pub fn stop(&mut self) -> Result<ExitStatus> {
        let child = self.child.as_mut().ok_or(Error::NotRunning)?;
        let pid = child.id();
        child
            .signal(Signal::SIGINT)
            .map_err(|source| Error::Signal { pid, source })?;
        let status = child
            .wait()
            .map_err(|source| Error::Reap { pid, source })?;
        self.child = None;
        match status.code() {
            Some(code) => info!(pid, exit_code = code, "slideshow stopped"),
            None => info!(pid, %status, "slideshow stopped"),
        }
        Ok(status)
    }

    /// Best-effort SIGKILL and reap, used only during shutdown.
    pub fn force_kill(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        if let Err(err) = child.signal(Signal::SIGKILL) {
            debug!(pid, error = %err, "kill failed during shutdown");
        }
        match child.wait() {
            Ok(status) => info!(pid, %status, "slideshow killed"),
            Err(err) => warn!(pid, error = %err, "could not reap slideshow during shutdown"),
        }
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::cell::RefCell;
    use std::io;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use std::rc::Rc;

    use nix::errno::Errno;
    use nix::sys::signal::Signal;

    use super::{Launcher, SlideshowChild};
    use crate::config::SlideshowCommand;

    #[derive(Debug, Default)]
    pub(crate) struct Log {
        pub launches: usize,
        pub signals: Vec<(u32, Signal)>,
        pub waits: Vec<u32>,
        failing_launches: usize,
        failing_signals: usize,
        failing_waits: usize,
    }

    /// Launcher test double that records calls. Calls succeed unless a
    /// failure was queued with one of the `fail_next_*` methods.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct ScriptedLauncher {
        log: Rc<RefCell<Log>>,
        next_pid: Rc<RefCell<u32>>,
    }

    impl ScriptedLauncher {
        pub(crate) fn new() -> Self {
            Self {
                log: Rc::default(),
                next_pid: Rc::new(RefCell::new(4000)),
            }
        }

        pub(crate) fn fail_next_launch(&self) {
            self.log.borrow_mut().failing_launches += 1;
        }

        pub(crate) fn fail_next_signal(&self) {
            self.log.borrow_mut().failing_signals += 1;
        }

        pub(crate) fn fail_next_wait(&self) {
            self.log.borrow_mut().failing_waits += 1;
        }

        pub(crate) fn log(&self) -> std::cell::Ref<'_, Log> {
            self.log.borrow()
        }
    }

    fn take_failure(pending: &mut usize) -> bool {
        if *pending == 0 {
            return false;
        }
        *pending -= 1;
        true
    }

    pub(crate) struct ScriptedChild {
        pid: u32,
        log: Rc<RefCell<Log>>,
    }

    impl Launcher for ScriptedLauncher {
        type Child = ScriptedChild;

        fn launch(&mut self, _command: &SlideshowCommand) -> io::Result<ScriptedChild> {
            let mut log = self.log.borrow_mut();
            log.launches += 1;
            if take_failure(&mut log.failing_launches) {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            let mut next = self.next_pid.borrow_mut();
            *next += 1;
            Ok(ScriptedChild {
                pid: *next,
                log: Rc::clone(&self.log),
            })
        }
    }

    impl SlideshowChild for ScriptedChild {
        fn id(&self) -> u32 {
            self.pid
        }

        fn signal(&mut self, signal: Signal) -> nix::Result<()> {
            let mut log = self.log.borrow_mut();
            log.signals.push((self.pid, signal));
            if take_failure(&mut log.failing_signals) {
                return Err(Errno::EPERM);
            }
            Ok(())
        }

        fn wait(&mut self) -> io::Result<ExitStatus> {
            let mut log = self.log.borrow_mut();
            log.waits.push(self.pid);
            if take_failure(&mut log.failing_waits) {
                return Err(io::Error::from_raw_os_error(Errno::ECHILD as i32));
            }
            Ok(ExitStatus::from_raw(0))
        }
    }
}
