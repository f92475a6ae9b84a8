//! Leveled front end over a set of policies.

use std::fmt;

use crate::policy::LogPolicy;
use crate::LogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats records and fans them out to every attached policy.
///
/// Records below `min_level` are dropped before formatting.
#[derive(Debug)]
pub struct Logger {
    min_level: Level,
    policies: Vec<LogPolicy>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl Logger {
    pub fn new(min_level: Level) -> Self {
        Self {
            min_level,
            policies: Vec::new(),
        }
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn set_min_level(&mut self, level: Level) {
        self.min_level = level;
    }

    pub fn attach(&mut self, policy: LogPolicy) {
        self.policies.push(policy);
    }

    pub fn policies(&self) -> &[LogPolicy] {
        &self.policies
    }

    /// Write one record as `[LEVEL] target: message\n` to every policy.
    ///
    /// Every policy is attempted; the first failure is returned.
    pub fn log(&mut self, level: Level, target: &str, message: &str) -> Result<(), LogError> {
        if level < self.min_level || self.policies.is_empty() {
            return Ok(());
        }

        let record = format!("[{}] {}: {}\n", level, target, message);
        let mut first_err = None;
        for policy in &mut self.policies {
            if let Err(err) = policy.write(record.as_bytes()) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn flush(&mut self) -> Result<(), LogError> {
        let mut first_err = None;
        for policy in &mut self.policies {
            if let Err(err) = policy.flush() {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Destroy and detach every policy.
    pub fn clear(&mut self) {
        for policy in &mut self.policies {
            policy.destroy();
        }
        self.policies.clear();
    }
}
