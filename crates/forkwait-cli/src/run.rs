use std::ffi::OsString;

use forkwait::{ExecutionError, Invocation, Termination};
use nix::errno::Errno;

use crate::config::Config;
use crate::error::Error;

/// Shell convention for "command not found"
pub const STATUS_NOT_FOUND: i32 = 127;
/// Shell convention for "found but cannot execute"
pub const STATUS_CANNOT_EXECUTE: i32 = 126;
/// Same status coreutils `timeout` uses
pub const STATUS_TIMED_OUT: i32 = 124;
pub const STATUS_FAILURE: i32 = 1;

pub fn invocation(program: OsString, argv0: Option<OsString>, args: Vec<OsString>) -> Invocation {
    let mut inv = Invocation::new(&program, [argv0.unwrap_or_else(|| program.clone())]);
    for a in args {
        inv.arg(a);
    }
    inv
}

/// Run the program and return the status `forkwait` itself should exit with.
pub fn run(inv: &Invocation, config: &Config) -> i32 {
    match forkwait::execute_with(inv, &config.exec_options()) {
        Ok(code) => {
            debug!("{:?} exited with {}", inv.program(), code.code());
            code.into()
        }
        Err(e) => {
            let status = exit_status(&e);
            error!("{}", Error::from(e));
            status
        }
    }
}

/// Map a failure onto a process exit status; signals are propagated as 128+n.
pub fn exit_status(e: &ExecutionError) -> i32 {
    match e {
        ExecutionError::ExecFailed {
            source: Errno::ENOENT,
            ..
        } => STATUS_NOT_FOUND,
        ExecutionError::ExecFailed { .. } => STATUS_CANNOT_EXECUTE,
        ExecutionError::AbnormalTermination {
            termination: Termination::Signaled { signal, .. },
            ..
        } => 128 + *signal as i32,
        ExecutionError::TimedOut { .. } => STATUS_TIMED_OUT,
        _ => STATUS_FAILURE,
    }
}
