use std::ffi::{CString, OsStr};
use std::os::unix::io::RawFd;
use std::os::unix::prelude::OsStrExt;
use std::ptr;

use libc::c_char;
use nix::errno::Errno;
use nix::sys::wait::WaitStatus;

use crate::config::Invocation;
use crate::error::{ExecutionError, Termination};
use crate::ExitCode;

/// Program name and NULL-terminated argv, ready for `execvp`.
///
/// `ptrs` points into the heap buffers owned by `args`, so both must live
/// until the exec call.
pub(crate) struct CArgv {
    pub(crate) program: CString,
    args: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CArgv {
    pub(crate) fn new(inv: &Invocation) -> Result<Self, ExecutionError> {
        if inv.args().is_empty() {
            return Err(ExecutionError::InvalidInvocation(
                "argument vector is empty, argv[0] is required".into(),
            ));
        }
        let program = to_cstring(inv.program())?;
        let args = inv
            .args()
            .iter()
            .map(|a| to_cstring(a))
            .collect::<Result<Vec<_>, _>>()?;
        let mut ptrs: Vec<*const c_char> = args.iter().map(|a| a.as_ptr()).collect();
        ptrs.push(ptr::null());
        Ok(Self {
            program,
            args,
            ptrs,
        })
    }

    pub(crate) fn argv(&self) -> *const *const c_char {
        debug_assert_eq!(self.ptrs.len(), self.args.len() + 1);
        self.ptrs.as_ptr()
    }
}

fn to_cstring(s: &OsStr) -> Result<CString, ExecutionError> {
    CString::new(s.as_bytes()).map_err(|_| {
        ExecutionError::InvalidInvocation(format!("{:?} contains an interior NUL byte", s))
    })
}

/// Report a failed exec to the parent and leave.
///
/// Runs in the forked child: nothing here may allocate or take a lock.
pub(crate) fn report_exec_failure(fd: RawFd, errno: Errno, status: i32) -> ! {
    let bytes = (errno as i32).to_ne_bytes();
    let _ = nix::unistd::write(fd, &bytes);
    unsafe { libc::_exit(status) }
}

/// What the exec-error pipe said about the child's exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExecReport {
    /// EOF without data: the write end was closed by a successful exec.
    Replaced,
    Failed(Errno),
    /// The pipe could not be read; only the wait status is left to go on.
    Unreadable(Errno),
}

/// Read the errno a child sent over the exec-error pipe.
pub(crate) fn read_exec_report(fd: RawFd) -> ExecReport {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match nix::unistd::read(fd, &mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(Errno::EINTR) => continue,
            Err(e) => {
                warn!("reading exec status pipe failed: {}", e);
                return ExecReport::Unreadable(e);
            }
        }
    }
    if filled == buf.len() {
        ExecReport::Failed(Errno::from_i32(i32::from_ne_bytes(buf)))
    } else {
        ExecReport::Replaced
    }
}

/// Decide whether the exec failed, falling back on the child's exit status
/// when the pipe gave no answer.
///
/// Without the pipe, an exit with `launch_failure_status` is taken as a failed
/// exec whose errno is unknown.
pub(crate) fn exec_failure(
    report: ExecReport,
    status: &Result<WaitStatus, ExecutionError>,
    launch_failure_status: i32,
) -> Option<Errno> {
    match report {
        ExecReport::Replaced => None,
        ExecReport::Failed(errno) => Some(errno),
        ExecReport::Unreadable(_) => match status {
            Ok(WaitStatus::Exited(_, code)) if *code == launch_failure_status => {
                Some(Errno::UnknownErrno)
            }
            _ => None,
        },
    }
}

/// Translate a final wait status into an outcome.
pub(crate) fn decode_status(status: WaitStatus) -> Result<ExitCode, ExecutionError> {
    trace!("wait status: {:?}", status);
    match status {
        WaitStatus::Exited(_, code) => Ok(ExitCode((code & 0xff) as u8)),
        WaitStatus::Signaled(pid, signal, core_dumped) => Err(ExecutionError::AbnormalTermination {
            pid,
            termination: Termination::Signaled {
                signal,
                core_dumped,
            },
        }),
        other => {
            let pid = other.pid().unwrap_or_else(|| nix::unistd::Pid::from_raw(0));
            Err(ExecutionError::AbnormalTermination {
                pid,
                termination: Termination::Other(format!("{:?}", other)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    #[test]
    fn argv_is_null_terminated() {
        let inv = Invocation::new("echo", ["echo", "hello"]);
        let argv = CArgv::new(&inv).unwrap();
        assert_eq!(argv.program.as_bytes(), b"echo");
        let ptrs = unsafe { std::slice::from_raw_parts(argv.argv(), 3) };
        assert!(!ptrs[0].is_null());
        assert!(!ptrs[1].is_null());
        assert!(ptrs[2].is_null());
    }

    #[test]
    fn empty_argv_rejected() {
        let inv = Invocation::new("echo", Vec::<&str>::new());
        assert!(matches!(
            CArgv::new(&inv),
            Err(ExecutionError::InvalidInvocation(_))
        ));
    }

    #[test]
    fn interior_nul_rejected() {
        let inv = Invocation::new("echo", ["echo", "a\0b"]);
        assert!(matches!(
            CArgv::new(&inv),
            Err(ExecutionError::InvalidInvocation(_))
        ));
    }

    #[test]
    fn decode_exit_and_signal() {
        let pid = Pid::from_raw(7);
        assert_eq!(decode_status(WaitStatus::Exited(pid, 42)).unwrap().code(), 42);
        match decode_status(WaitStatus::Signaled(pid, Signal::SIGKILL, false)) {
            Err(ExecutionError::AbnormalTermination { pid: p, termination }) => {
                assert_eq!(p, pid);
                assert_eq!(
                    termination,
                    Termination::Signaled {
                        signal: Signal::SIGKILL,
                        core_dumped: false
                    }
                );
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            decode_status(WaitStatus::Stopped(pid, Signal::SIGSTOP)),
            Err(ExecutionError::AbnormalTermination {
                termination: Termination::Other(_),
                ..
            })
        ));
    }

    #[test]
    fn exec_failure_pipe_round_trip() {
        let (r, w) = nix::unistd::pipe().unwrap();
        nix::unistd::write(w, &(Errno::ENOENT as i32).to_ne_bytes()).unwrap();
        nix::unistd::close(w).unwrap();
        assert_eq!(read_exec_report(r), ExecReport::Failed(Errno::ENOENT));
        nix::unistd::close(r).unwrap();

        let (r, w) = nix::unistd::pipe().unwrap();
        nix::unistd::close(w).unwrap();
        assert_eq!(read_exec_report(r), ExecReport::Replaced);
        nix::unistd::close(r).unwrap();
    }

    #[test]
    fn unreadable_pipe() {
        assert_eq!(read_exec_report(-1), ExecReport::Unreadable(Errno::EBADF));
    }

    #[test]
    fn exec_failure_from_pipe() {
        let pid = Pid::from_raw(7);
        let exited = Ok(WaitStatus::Exited(pid, 127));
        assert_eq!(exec_failure(ExecReport::Replaced, &exited, 127), None);
        assert_eq!(
            exec_failure(ExecReport::Failed(Errno::EACCES), &exited, 127),
            Some(Errno::EACCES)
        );
    }

    #[test]
    fn exec_failure_from_launch_status() {
        let pid = Pid::from_raw(7);
        let unreadable = ExecReport::Unreadable(Errno::EIO);

        let exited = Ok(WaitStatus::Exited(pid, 127));
        assert_eq!(exec_failure(unreadable, &exited, 127), Some(Errno::UnknownErrno));
        assert_eq!(exec_failure(unreadable, &exited, 77), None);

        let exited = Ok(WaitStatus::Exited(pid, 77));
        assert_eq!(exec_failure(unreadable, &exited, 77), Some(Errno::UnknownErrno));

        let killed = Ok(WaitStatus::Signaled(pid, Signal::SIGKILL, false));
        assert_eq!(exec_failure(unreadable, &killed, 127), None);
        let lost = Err(ExecutionError::WaitFailed(Errno::ECHILD));
        assert_eq!(exec_failure(unreadable, &lost, 127), None);
    }
}
