use std::os::unix::io::RawFd;
use std::thread;
use std::time::Instant;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, fork, pipe2, ForkResult, Pid};

use crate::config::{ExecOptions, Invocation};
use crate::util::{self, CArgv};
use crate::{ExecutionError, ExitCode};

pub(crate) struct ExecCore<'a> {
    pub(crate) invocation: &'a Invocation,
    pub(crate) options: &'a ExecOptions,
}

impl ExecCore<'_> {
    pub(crate) fn run(&self) -> Result<ExitCode, ExecutionError> {
        debug!(
            "executing {:?} with args {:?}",
            self.invocation.program(),
            self.invocation.args()
        );

        // Everything the child touches is built here; it may not allocate.
        let argv = CArgv::new(self.invocation)?;

        let (read_fd, write_fd) = match pipe2(OFlag::O_CLOEXEC) {
            Ok(it) => it,
            Err(e) => {
                error!("cannot create exec status pipe: {}", e);
                return Err(ExecutionError::ForkFailed(e));
            }
        };

        // SAFETY: the child only calls async-signal-safe functions before
        // exec or _exit.
        let child = match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                let _ = close(read_fd);
                self.run_child(&argv, write_fd)
            }
            Ok(ForkResult::Parent { child }) => child,
            Err(e) => {
                error!("fork failed: {}", e);
                let _ = close(read_fd);
                let _ = close(write_fd);
                return Err(ExecutionError::ForkFailed(e));
            }
        };

        let _ = close(write_fd);
        let report = util::read_exec_report(read_fd);
        let _ = close(read_fd);

        let status = self.wait(child);

        let launch_failure_status = self.options.launch_failure_status();
        if let Some(errno) = util::exec_failure(report, &status, launch_failure_status) {
            let program = self.invocation.program().to_string_lossy().into_owned();
            error!("execvp failed: {}: {}", program, errno);
            if let Err(e) = &status {
                warn!("child {} not reaped: {}", child, e);
            }
            return Err(ExecutionError::ExecFailed {
                pid: child,
                program,
                source: errno,
            });
        }

        util::decode_status(status?)
    }

    fn run_child(&self, argv: &CArgv, write_fd: RawFd) -> ! {
        unsafe { libc::execvp(argv.program.as_ptr(), argv.argv()) };
        util::report_exec_failure(write_fd, Errno::last(), self.options.launch_failure_status())
    }

    fn wait(&self, child: Pid) -> Result<WaitStatus, ExecutionError> {
        match self.options.timeout() {
            None => waitpid(child, None).map_err(|e| {
                error!("waitpid failed: {}", e);
                ExecutionError::WaitFailed(e)
            }),
            Some(timeout) => self.wait_deadline(child, timeout),
        }
    }

    fn wait_deadline(
        &self,
        child: Pid,
        timeout: std::time::Duration,
    ) -> Result<WaitStatus, ExecutionError> {
        let started = Instant::now();
        loop {
            match waitpid(child, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {}
                Ok(status) => return Ok(status),
                Err(e) => {
                    error!("waitpid failed: {}", e);
                    return Err(ExecutionError::WaitFailed(e));
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                warn!("child {} exceeded {:?}, sending SIGKILL", child, timeout);
                if let Err(e) = kill(child, Signal::SIGKILL) {
                    warn!("kill {} failed: {}", child, e);
                }
                return match waitpid(child, None) {
                    Ok(WaitStatus::Signaled(_, Signal::SIGKILL, _)) => {
                        Err(ExecutionError::TimedOut {
                            pid: child,
                            after: elapsed,
                        })
                    }
                    // exited on its own before the signal landed
                    Ok(status) => Ok(status),
                    Err(e) => {
                        error!("waitpid failed: {}", e);
                        Err(ExecutionError::WaitFailed(e))
                    }
                };
            }
            thread::sleep(self.options.poll_interval().min(timeout - elapsed));
        }
    }
}
