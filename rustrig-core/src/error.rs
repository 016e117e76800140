//! Error types for rustrig-core.

use std::fmt;
use thiserror::Error;

/// Result type alias for rustrig operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A configuration key that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedKey {
    /// The offending key.
    pub key: String,
    /// Why it was rejected.
    pub reason: String,
}

impl RejectedKey {
    /// Creates a rejection record.
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RejectedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.key, self.reason)
    }
}

/// Collection of rejected keys, displayed as a `; `-separated list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectedKeys(pub Vec<RejectedKey>);

impl fmt::Display for RejectedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rejected) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{rejected}")?;
        }
        Ok(())
    }
}

/// Core error types for rustrig operations.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more configuration keys were rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(RejectedKeys),

    /// Configuration document was not a JSON object.
    #[error("configuration must be a JSON object, got {0}")]
    ConfigNotObject(&'static str),

    /// Attempt to reconfigure a maker after it started consuming input.
    #[error("maker `{maker}` cannot be reconfigured after {processed} inputs were processed")]
    ConfigLocked {
        /// Maker name.
        maker: &'static str,
        /// Inputs already consumed.
        processed: u64,
    },

    /// No maker registered under the requested name.
    #[error("unknown maker `{0}`")]
    UnknownMaker(String),
}

impl Error {
    /// Returns the rejected keys if this is a validation error.
    #[must_use]
    pub fn rejected_keys(&self) -> &[RejectedKey] {
        match self {
            Self::InvalidConfig(keys) => &keys.0,
            _ => &[],
        }
    }
}
