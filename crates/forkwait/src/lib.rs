//! Run a program to completion with fork, exec and wait.
//!
//! ```no_run
//! let code = forkwait::execute("sh", ["sh", "-c", "exit 42"]).unwrap();
//! assert_eq!(code.code(), 42);
//! ```
#[macro_use]
extern crate log;

pub mod config;
pub mod error;
mod executor;
mod util;

use std::ffi::OsStr;

pub use crate::config::{ExecOptions, ExecOptionsBuilder, Invocation};
pub use crate::error::{ExecutionError, Termination, FAILURE_SENTINEL};

/// Exit code of a child that exited on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitCode(pub(crate) u8);

impl ExitCode {
    pub fn code(self) -> u8 {
        self.0
    }

    pub fn success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitCode> for i32 {
    fn from(c: ExitCode) -> i32 {
        c.0 as i32
    }
}

/// Run `command` with argument vector `args` and block until it terminates.
///
/// `command` is looked up in `PATH` unless it contains a slash. `args[0]`
/// is passed to the program as its own name. The environment is inherited.
/// A non-zero exit code is a normal outcome, not an error.
pub fn execute<C, I, S>(command: C, args: I) -> Result<ExitCode, ExecutionError>
where
    C: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    execute_with(&Invocation::new(command, args), &ExecOptions::default())
}

/// Same as [`execute`], with options such as a timeout.
pub fn execute_with(
    invocation: &Invocation,
    options: &ExecOptions,
) -> Result<ExitCode, ExecutionError> {
    executor::ExecCore {
        invocation,
        options,
    }
    .run()
}

/// Integer form of [`execute`]: the exit code, or [`FAILURE_SENTINEL`] for
/// any failure, whatever its cause.
pub fn execute_command<C, I, S>(command: C, args: I) -> i32
where
    C: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    match execute(command, args) {
        Ok(code) => code.into(),
        Err(e) => e.legacy_status(),
    }
}
