use std::time::Duration;

use forkwait::config::DEFAULT_LAUNCH_FAILURE_STATUS;
use forkwait::{ExecOptions, ExecOptionsBuilder};

use crate::error::Error;

pub const TIMEOUT_ENV: &str = "FORKWAIT_TIMEOUT_MS";
pub const LAUNCH_FAILURE_STATUS_ENV: &str = "FORKWAIT_LAUNCH_FAILURE_STATUS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub timeout: Option<Duration>,
    pub launch_failure_status: i32,
}

impl Config {
    /// Read defaults from the environment.
    pub fn build() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout = match lookup(TIMEOUT_ENV) {
            Some(v) => Some(Duration::from_millis(parse_env(TIMEOUT_ENV, &v)?)),
            None => None,
        };
        let launch_failure_status = match lookup(LAUNCH_FAILURE_STATUS_ENV) {
            Some(v) => parse_env(LAUNCH_FAILURE_STATUS_ENV, &v)?,
            None => DEFAULT_LAUNCH_FAILURE_STATUS,
        };
        let s = Self {
            timeout,
            launch_failure_status,
        };
        debug!("{:#?}", s);
        Ok(s)
    }

    /// Command-line values win over the environment.
    pub fn merge(mut self, timeout_ms: Option<u64>, launch_failure_status: Option<i32>) -> Self {
        if let Some(ms) = timeout_ms {
            self.timeout = Some(Duration::from_millis(ms));
        }
        if let Some(status) = launch_failure_status {
            self.launch_failure_status = status;
        }
        self
    }

    pub fn exec_options(&self) -> ExecOptions {
        let mut builder = ExecOptionsBuilder::default();
        builder.launch_failure_status(self.launch_failure_status);
        if let Some(t) = self.timeout {
            builder.timeout(t);
        }
        // every field has a default
        builder.build().unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::BadConfig {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let c = Config::from_lookup(|_| None).unwrap();
        assert_eq!(c.timeout, None);
        assert_eq!(c.launch_failure_status, 127);
    }

    #[test]
    fn env_values() {
        let c = Config::from_lookup(|k| match k {
            TIMEOUT_ENV => Some("1500".into()),
            LAUNCH_FAILURE_STATUS_ENV => Some(" 1 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(c.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(c.launch_failure_status, 1);

        let opts = c.exec_options();
        assert_eq!(opts.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(opts.launch_failure_status(), 1);
    }

    #[test]
    fn bad_env_value() {
        let e = Config::from_lookup(|k| (k == TIMEOUT_ENV).then(|| "soon".to_string())).unwrap_err();
        assert!(matches!(e, Error::BadConfig { .. }));
    }

    #[test]
    fn flags_override_env() {
        let c = Config::from_lookup(|k| (k == TIMEOUT_ENV).then(|| "10".to_string()))
            .unwrap()
            .merge(Some(20), None);
        assert_eq!(c.timeout, Some(Duration::from_millis(20)));
        assert_eq!(c.launch_failure_status, 127);
    }
}
