//! Oracle error taxonomy.
//!
//! Formatter failures are data ([`pyfmt_bridge::Outcome::Failure`]) and never
//! appear here. Everything in this module stops the run, except
//! [`crate::adjudicate::Mismatch`], which stops only its property.

use thiserror::Error;

use pyfmt_bridge::{BridgeLoadError, MarshalError};

/// The reference worker could not be driven.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to spawn reference interpreter `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("reference worker pipe failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("reference worker exited")]
    Exited,
    #[error("malformed reference response {line:?}: {reason}")]
    Protocol { line: String, reason: String },
}

/// Anything that prevents adjudication from continuing.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    BridgeLoad(#[from] BridgeLoadError),
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("invalid generator grammar `{pattern}`: {reason}")]
    Grammar { pattern: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
