#[macro_use]
extern crate log;
use std::ffi::OsString;

use clap::Parser;
use forkwait_cli::config::Config;
use forkwait_cli::run;

const DEBUG_ENV: bool = cfg!(debug_assertions);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Run a program, wait for it, and exit with its status
struct Cli {
    #[arg(short, long, value_name = "MS")]
    /// Kill the program with SIGKILL after this many milliseconds
    ///
    /// Overrides FORKWAIT_TIMEOUT_MS
    timeout: Option<u64>,

    #[arg(long, value_name = "N")]
    /// Status the child exits with when the program cannot be executed
    ///
    /// Overrides FORKWAIT_LAUNCH_FAILURE_STATUS
    launch_failure_status: Option<i32>,

    #[arg(long, value_name = "NAME")]
    /// Pass NAME as argv[0] instead of PROGRAM
    argv0: Option<OsString>,

    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    #[arg(value_name = "PROGRAM [ARGS]")]
    /// Program to run, looked up in PATH, and the arguments passed to it as-is
    command: Vec<OsString>,
}

fn main() {
    let mut logger: env_logger::Builder;
    if DEBUG_ENV {
        logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"));
    } else {
        logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    }
    logger.format_timestamp(None).init();
    if DEBUG_ENV {
        warn!("You are using dev build of forkwait compiled without optimization.")
    }

    let cli = Cli::parse();
    let config = match Config::build() {
        Ok(c) => c.merge(cli.timeout, cli.launch_failure_status),
        Err(e) => {
            error!("{}", e);
            std::process::exit(run::STATUS_FAILURE);
        }
    };

    let mut command = cli.command.into_iter();
    let Some(program) = command.next() else {
        unreachable!("clap requires at least one value")
    };
    let inv = run::invocation(program, cli.argv0, command.collect());
    std::process::exit(run::run(&inv, &config));
}
