use derive_builder::Builder;
use getset::{CopyGetters, Getters, Setters};
use std::ffi::{OsStr, OsString};
use std::time::Duration;

/// Exit status used by the child when `execvp` fails, as shells do for
/// "command not found".
pub const DEFAULT_LAUNCH_FAILURE_STATUS: i32 = 127;

/// Poll interval used while waiting with a timeout
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Getters, Setters, Default, Clone, Debug, PartialEq, Eq)]
/// A program to run and the argument vector to hand to it.
///
/// The first argument conventionally repeats the program name.
pub struct Invocation {
    #[getset(get = "pub", set = "pub")]
    /// Program to execute, resolved through `PATH` when it contains no slash.
    program: OsString,

    #[getset(get = "pub", set = "pub")]
    /// Argument vector, starting with argv[0].
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            program: program.as_ref().to_os_string(),
            args: args.into_iter().map(|a| a.as_ref().to_os_string()).collect(),
        }
    }

    /// Invocation whose argv[0] is the program name itself
    pub fn with_program_name<P, I, S>(program: P, rest: I) -> Self
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut inv = Self::new(&program, std::iter::once(program.as_ref()));
        inv.args
            .extend(rest.into_iter().map(|a| a.as_ref().to_os_string()));
        inv
    }

    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }
}

#[derive(Builder, Getters, Setters, CopyGetters, Clone, Debug)]
#[builder(default)]
pub struct ExecOptions {
    #[builder(setter(into, strip_option))]
    #[getset(get_copy = "pub", set = "pub")]
    /// Kill the child with SIGKILL once this much time has passed.
    /// `None` waits forever.
    timeout: Option<Duration>,

    #[getset(get_copy = "pub", set = "pub")]
    poll_interval: Duration,

    #[getset(get_copy = "pub", set = "pub")]
    /// Status the child exits with when the program image cannot be loaded.
    /// If the exec-error pipe cannot be read, an exit with this status is
    /// reported as a failed exec.
    launch_failure_status: i32,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            launch_failure_status: DEFAULT_LAUNCH_FAILURE_STATUS,
        }
    }
}
