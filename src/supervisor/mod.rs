//! Supervised execution of a single build action
//!
//! The wrapped IDE tool is known to hang silently while loading projects.
//! The supervisor watches its standard output for a stall marker and
//! escalates through interrupt, force kill and at most one retry:
//!
//! ```text
//! Running --marker--> AwaitingGraceTimeout --output--> Running
//! AwaitingGraceTimeout --grace elapsed--> Interrupting --exit--> TimedOut
//! Interrupting --force elapsed--> ForceKilled --exit--> TimedOut
//! ```
//!
//! Timers are relative to the most recent output line, so a slow build that
//! keeps printing is never interrupted.

mod signal;

pub use signal::{NixSignaller, SignalKind, Signaller};

use crate::config::XambuildConfig;
use crate::planner::BuildAction;
use serde::Serialize;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to start {}: {source}", .tool.display())]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while supervising build: {0}")]
    Io(#[from] std::io::Error),
    #[error("Build failed{}", exit_code_suffix(.status))]
    BuildFailed { status: Option<i32> },
    #[error("Command timed out after {attempts} attempt(s)")]
    TimedOut { attempts: u32 },
}

fn exit_code_suffix(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Running,
    AwaitingGraceTimeout,
    Interrupting,
    ForceKilled,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    /// Output fragment that arms the grace timer
    pub stall_marker: String,
    pub grace_timeout: Duration,
    pub force_timeout: Duration,
    pub retry_on_hang: bool,
}

impl From<&XambuildConfig> for SupervisorConfig {
    fn from(config: &XambuildConfig) -> Self {
        Self {
            stall_marker: config.stall_marker.clone(),
            grace_timeout: config.grace_timeout(),
            force_timeout: config.force_timeout(),
            retry_on_hang: config.retry_on_hang,
        }
    }
}

/// Result of a supervised action that eventually succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub attempts: u32,
    pub signals_sent: Vec<SignalKind>,
}

struct Attempt {
    status: ExitStatus,
    final_state: SupervisorState,
    signals_sent: Vec<SignalKind>,
}

pub struct ProcessSupervisor {
    config: SupervisorConfig,
    signaller: Arc<dyn Signaller>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self::with_signaller(config, Arc::new(NixSignaller))
    }

    pub fn with_signaller(config: SupervisorConfig, signaller: Arc<dyn Signaller>) -> Self {
        Self { config, signaller }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Runs `action` to completion, re-running it once if it hangs and
    /// retrying is enabled.
    pub async fn run(&self, action: &BuildAction) -> Result<RunReport, SupervisorError> {
        let mut retry = self.config.retry_on_hang;
        let mut attempts = 0;
        let mut signals_sent = Vec::new();

        loop {
            attempts += 1;
            info!(command = %action, attempt = attempts, "Running build action");

            let attempt = self.run_once(action).await?;
            signals_sent.extend(attempt.signals_sent);

            if attempt.final_state != SupervisorState::TimedOut {
                if attempt.status.success() {
                    return Ok(RunReport {
                        attempts,
                        signals_sent,
                    });
                }
                return Err(SupervisorError::BuildFailed {
                    status: attempt.status.code(),
                });
            }

            if !retry {
                return Err(SupervisorError::TimedOut { attempts });
            }

            warn!(command = %action, "Command timed out, retrying once");
            retry = false;
        }
    }

    async fn run_once(&self, action: &BuildAction) -> Result<Attempt, SupervisorError> {
        let mut child = Command::new(&action.tool)
            .args(action.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                tool: action.tool.clone(),
                source,
            })?;

        let pid = child.id();
        let stdout = child.stdout.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "child stdout was not captured")
        })?;
        let mut lines = BufReader::new(stdout).split(b'\n');

        let mut state = SupervisorState::Running;
        let mut deadline: Option<Instant> = None;
        let mut stdout_open = true;
        let mut signals_sent = Vec::new();

        let status = loop {
            tokio::select! {
                segment = lines.next_segment(), if stdout_open => {
                    match segment? {
                        Some(bytes) => {
                            let line = decode_line(&bytes);
                            info!(target: "xambuild::tool", "{}", line);
                            if matches!(state, SupervisorState::Running | SupervisorState::AwaitingGraceTimeout) {
                                if line.contains(&self.config.stall_marker) {
                                    debug!("Stall marker seen, arming grace timer");
                                    state = SupervisorState::AwaitingGraceTimeout;
                                    deadline = Some(Instant::now() + self.config.grace_timeout);
                                } else if state == SupervisorState::AwaitingGraceTimeout {
                                    debug!("Output resumed, disarming grace timer");
                                    state = SupervisorState::Running;
                                    deadline = None;
                                }
                            }
                        }
                        None => stdout_open = false,
                    }
                }
                // A signalled tool may leave descendants holding stdout open
                status = child.wait(), if !stdout_open || signalled(state) => break status?,
                _ = sleep_until(deadline) => {
                    match state {
                        SupervisorState::AwaitingGraceTimeout => {
                            warn!(pid = ?pid, "Command timed out, interrupting");
                            self.deliver(SignalKind::Interrupt, pid, &mut signals_sent);
                            state = SupervisorState::Interrupting;
                            deadline = Some(Instant::now() + self.config.force_timeout);
                        }
                        SupervisorState::Interrupting => {
                            warn!(pid = ?pid, "Command ignored interrupt, force killing");
                            self.deliver(SignalKind::Kill, pid, &mut signals_sent);
                            state = SupervisorState::ForceKilled;
                            deadline = None;
                        }
                        _ => deadline = None,
                    }
                }
            }
        };

        let final_state = match state {
            SupervisorState::Interrupting | SupervisorState::ForceKilled => SupervisorState::TimedOut,
            other => other,
        };
        debug!(?status, state = ?final_state, "Build action finished");

        Ok(Attempt {
            status,
            final_state,
            signals_sent,
        })
    }

    fn deliver(&self, kind: SignalKind, pid: Option<u32>, sent: &mut Vec<SignalKind>) {
        let Some(pid) = pid else {
            debug!(signal = %kind, "Process already reaped, nothing to signal");
            return;
        };

        let result = match kind {
            SignalKind::Interrupt => self.signaller.interrupt(pid),
            SignalKind::Kill => self.signaller.kill(pid),
        };
        match result {
            Ok(()) => sent.push(kind),
            Err(err) => warn!(pid, signal = %kind, error = %err, "Failed to deliver signal"),
        }
    }
}

/// Tool output is not guaranteed to be UTF-8; invalid bytes are replaced
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

fn signalled(state: SupervisorState) -> bool {
    matches!(
        state,
        SupervisorState::Interrupting | SupervisorState::ForceKilled
    )
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::planner::ActionKind;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSignaller {
        sent: Mutex<Vec<SignalKind>>,
    }

    impl Signaller for RecordingSignaller {
        fn interrupt(&self, pid: u32) -> std::io::Result<()> {
            self.sent.lock().unwrap().push(SignalKind::Interrupt);
            NixSignaller.interrupt(pid)
        }

        fn kill(&self, pid: u32) -> std::io::Result<()> {
            self.sent.lock().unwrap().push(SignalKind::Kill);
            NixSignaller.kill(pid)
        }
    }

    fn shell(script: &str) -> BuildAction {
        BuildAction {
            kind: ActionKind::Build,
            project: Some("App.iOS".to_string()),
            tool: PathBuf::from("sh"),
            subcommand: "-c".to_string(),
            args: vec![script.to_string()],
        }
    }

    fn config(retry_on_hang: bool) -> SupervisorConfig {
        SupervisorConfig {
            stall_marker: "Loading projects".to_string(),
            grace_timeout: Duration::from_millis(150),
            force_timeout: Duration::from_millis(200),
            retry_on_hang,
        }
    }

    fn supervisor(retry_on_hang: bool) -> (ProcessSupervisor, Arc<RecordingSignaller>) {
        let signaller = Arc::new(RecordingSignaller::default());
        let supervisor = ProcessSupervisor::with_signaller(config(retry_on_hang), signaller.clone());
        (supervisor, signaller)
    }

    #[tokio::test]
    async fn test_successful_run() {
        let (supervisor, signaller) = supervisor(true);

        let report = supervisor.run(&shell("echo building; echo done")).await.unwrap();

        assert_eq!(report.attempts, 1);
        assert!(report.signals_sent.is_empty());
        assert!(signaller.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_utf8_output_does_not_fail_build() {
        let (supervisor, signaller) = supervisor(true);

        let report = supervisor
            .run(&shell("printf 'Compiling Caf\\351.cs\\n'; echo done; exit 0"))
            .await
            .unwrap();

        assert_eq!(report.attempts, 1);
        assert!(signaller.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stall_marker_seen_in_non_utf8_line() {
        let (supervisor, signaller) = supervisor(false);

        let err = supervisor
            .run(&shell("printf 'Loading projects \\351\\n'; exec sleep 5"))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::TimedOut { attempts: 1 }));
        assert_eq!(*signaller.sent.lock().unwrap(), vec![SignalKind::Interrupt]);
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"Build succeeded.\r"), "Build succeeded.");
        assert_eq!(decode_line(b"Caf\xe9.cs"), "Caf\u{fffd}.cs");
    }

    #[tokio::test]
    async fn test_non_zero_exit_fails_without_retry() {
        let dir = TempDir::new().unwrap();
        let counter = dir.path().join("runs");
        let script = format!("echo run >> '{}'; exit 3", counter.display());
        let (supervisor, _) = supervisor(true);

        let err = supervisor.run(&shell(&script)).await.unwrap_err();

        assert!(matches!(err, SupervisorError::BuildFailed { status: Some(3) }));
        let runs = std::fs::read_to_string(&counter).unwrap();
        assert_eq!(runs.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_stall_is_interrupted() {
        let (supervisor, signaller) = supervisor(false);

        let err = supervisor
            .run(&shell("echo Loading projects; exec sleep 5"))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::TimedOut { attempts: 1 }));
        assert_eq!(*signaller.sent.lock().unwrap(), vec![SignalKind::Interrupt]);
    }

    #[tokio::test]
    async fn test_ignored_interrupt_is_force_killed() {
        let (supervisor, signaller) = supervisor(false);

        let err = supervisor
            .run(&shell("trap '' QUIT; echo Loading projects; exec sleep 5"))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::TimedOut { attempts: 1 }));
        assert_eq!(
            *signaller.sent.lock().unwrap(),
            vec![SignalKind::Interrupt, SignalKind::Kill]
        );
    }

    #[tokio::test]
    async fn test_hang_is_retried_exactly_once() {
        let (supervisor, signaller) = supervisor(true);

        let err = supervisor
            .run(&shell("trap '' QUIT; echo Loading projects; exec sleep 5"))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::TimedOut { attempts: 2 }));
        assert_eq!(
            *signaller.sent.lock().unwrap(),
            vec![
                SignalKind::Interrupt,
                SignalKind::Kill,
                SignalKind::Interrupt,
                SignalKind::Kill
            ]
        );
    }

    #[tokio::test]
    async fn test_retry_can_succeed() {
        let dir = TempDir::new().unwrap();
        let flag = dir.path().join("hung-once");
        let script = format!(
            "if [ -f '{flag}' ]; then echo Build succeeded; else touch '{flag}'; echo Loading projects; exec sleep 5; fi",
            flag = flag.display()
        );
        let (supervisor, _) = supervisor(true);

        let report = supervisor.run(&shell(&script)).await.unwrap();

        assert_eq!(report.attempts, 2);
        assert_eq!(report.signals_sent, vec![SignalKind::Interrupt]);
    }

    #[tokio::test]
    async fn test_output_after_marker_disarms_timer() {
        let (supervisor, signaller) = supervisor(false);

        let report = supervisor
            .run(&shell(
                "echo Loading projects; sleep 0.05; echo Building App.iOS; sleep 0.4; echo done",
            ))
            .await
            .unwrap();

        assert_eq!(report.attempts, 1);
        assert!(signaller.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_tool_fails_to_spawn() {
        let (supervisor, _) = supervisor(true);
        let mut action = shell("true");
        action.tool = PathBuf::from("/nonexistent/mdtool");

        let err = supervisor.run(&action).await.unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
    }
}
