use std::fmt;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use thiserror::Error;

/// Value returned by [`crate::execute_command`] for every failure mode.
pub const FAILURE_SENTINEL: i32 = -1;

/// How a child ended when it did not exit on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Signaled { signal: Signal, core_dumped: bool },
    Other(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Signaled {
                signal,
                core_dumped: true,
            } => write!(f, "killed by {} (core dumped)", signal),
            Termination::Signaled { signal, .. } => write!(f, "killed by {}", signal),
            Termination::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),
    #[error("fork failed: `{0}`")]
    ForkFailed(Errno),
    #[error("exec of `{program}` in child {pid} failed: `{source}`")]
    ExecFailed {
        pid: Pid,
        program: String,
        source: Errno,
    },
    #[error("waitpid failed: `{0}`")]
    WaitFailed(Errno),
    #[error("child {pid} terminated abnormally: {termination}")]
    AbnormalTermination { pid: Pid, termination: Termination },
    #[error("child {pid} did not finish within {after:?} and was killed")]
    TimedOut { pid: Pid, after: Duration },
}

impl ExecutionError {
    /// The OS error behind this failure, if there is one
    pub fn os_error(&self) -> Option<Errno> {
        match self {
            ExecutionError::ForkFailed(e) | ExecutionError::WaitFailed(e) => Some(*e),
            ExecutionError::ExecFailed { source, .. } => Some(*source),
            _ => None,
        }
    }

    /// Every failure collapses to the same status in the integer API.
    pub fn legacy_status(&self) -> i32 {
        FAILURE_SENTINEL
    }
}
