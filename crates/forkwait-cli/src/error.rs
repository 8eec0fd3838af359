use thiserror::Error;
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot run command: `{0}`")]
    ExecutionFailed(#[from] forkwait::ExecutionError),
    #[error("bad value `{value}` for {key}")]
    BadConfig { key: String, value: String },
}
