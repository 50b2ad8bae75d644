//! Signal delivery to supervised child processes

use serde::Serialize;
use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Asks the tool to stop; mono dumps its thread stacks on SIGQUIT
    Interrupt,
    Kill,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Interrupt => f.write_str("interrupt"),
            SignalKind::Kill => f.write_str("kill"),
        }
    }
}

pub trait Signaller: Send + Sync {
    fn interrupt(&self, pid: u32) -> io::Result<()>;

    fn kill(&self, pid: u32) -> io::Result<()>;
}

/// Delivers SIGQUIT and SIGKILL through `kill(2)`
#[derive(Debug, Clone, Copy, Default)]
pub struct NixSignaller;

#[cfg(unix)]
impl NixSignaller {
    fn send(pid: u32, signal: nix::sys::signal::Signal) -> io::Result<()> {
        use nix::unistd::Pid;

        let pid = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        nix::sys::signal::kill(Pid::from_raw(pid), signal).map_err(io::Error::from)
    }
}

#[cfg(unix)]
impl Signaller for NixSignaller {
    fn interrupt(&self, pid: u32) -> io::Result<()> {
        Self::send(pid, nix::sys::signal::Signal::SIGQUIT)
    }

    fn kill(&self, pid: u32) -> io::Result<()> {
        Self::send(pid, nix::sys::signal::Signal::SIGKILL)
    }
}

#[cfg(not(unix))]
impl Signaller for NixSignaller {
    fn interrupt(&self, _pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process signals are only available on unix",
        ))
    }

    fn kill(&self, pid: u32) -> io::Result<()> {
        self.interrupt(pid)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_signal_to_missing_process_fails() {
        // pid_max on linux stays well below this
        let err = NixSignaller.interrupt(i32::MAX as u32).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(nix::errno::Errno::ESRCH as i32));
    }

    #[test]
    fn test_out_of_range_pid_rejected() {
        let err = NixSignaller.kill(u32::MAX).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_signal_kind_display() {
        assert_eq!(SignalKind::Interrupt.to_string(), "interrupt");
        assert_eq!(SignalKind::Kill.to_string(), "kill");
    }
}
