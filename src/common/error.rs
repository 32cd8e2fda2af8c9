//! Error types for kraft-bootstrap

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing metadata attribute: {0}")]
    MissingAttribute(String),

    #[error("Cannot parse broker ordinal from instance name: {0}")]
    InvalidOrdinal(String),

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Peer address not yet resolvable: {name} (after {attempts} attempts)")]
    PeerUnresolved { name: String, attempts: u32 },

    // === Quorum Errors ===
    #[error("Incomplete quorum voter set: expected {expected} voters, derived {actual}")]
    IncompleteQuorum { expected: usize, actual: usize },

    #[error("Inconsistent quorum voter set: {0}")]
    QuorumInconsistent(String),

    // === Host Errors ===
    #[error("Command `{program}` failed with status {status}: {stderr}")]
    Command {
        program: String,
        status: i32,
        stderr: String,
    },

    // === State Errors ===
    #[error("State ledger error: {0}")]
    State(String),

    // === Generic ===
    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Is this a retryable error?
    ///
    /// `PeerUnresolved` is the "peer not yet ready" condition: retryable
    /// until the bounded retry policy is exhausted, terminal after.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout(_) | Error::PeerUnresolved { .. }
        )
    }

    /// Terminal status class this error maps onto.
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::InvalidConfig(_) | Error::MissingAttribute(_) | Error::InvalidOrdinal(_) => {
                Outcome::ConfigError
            }
            Error::PeerUnresolved { .. }
            | Error::IncompleteQuorum { .. }
            | Error::QuorumInconsistent(_) => Outcome::RaceDetected,
            _ => Outcome::TransientError,
        }
    }
}

/// Terminal bootstrap status class, surfaced in the status report so
/// external health checks can react without parsing logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Success,
    ConfigError,
    TransientError,
    RaceDetected,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::ConfigError => write!(f, "config-error"),
            Outcome::TransientError => write!(f, "transient-error"),
            Outcome::RaceDetected => write!(f, "race-detected"),
        }
    }
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::State(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::PeerUnresolved {
            name: "b-1".into(),
            attempts: 1
        }
        .is_retryable());
        assert!(Error::Timeout("probe".into()).is_retryable());
        assert!(!Error::InvalidConfig("bad".into()).is_retryable());
        assert!(!Error::IncompleteQuorum {
            expected: 3,
            actual: 2
        }
        .is_retryable());
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(
            Error::InvalidOrdinal("kafka-broker".into()).outcome(),
            Outcome::ConfigError
        );
        assert_eq!(
            Error::IncompleteQuorum {
                expected: 3,
                actual: 1
            }
            .outcome(),
            Outcome::RaceDetected
        );
        assert_eq!(
            Error::Command {
                program: "tar".into(),
                status: 2,
                stderr: String::new()
            }
            .outcome(),
            Outcome::TransientError
        );
    }
}
