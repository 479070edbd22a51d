//! Bridge error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

/// The subject artifact could not be made usable. Always fatal for a run.
#[derive(Debug, Clone, Error)]
pub enum BridgeLoadError {
    /// No artifact path was configured.
    #[error("subject library not configured (set {env})")]
    NotConfigured { env: &'static str },
    /// `dlopen` failed.
    #[error("failed to load subject library {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },
    /// `dlsym` could not resolve a required entry point.
    #[error("subject library {} does not export `{symbol}`: {reason}", path.display())]
    MissingSymbol {
        path: PathBuf,
        symbol: &'static str,
        reason: String,
    },
}

/// An input the C calling convention cannot carry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarshalError {
    /// C strings end at the first NUL, so the argument would be truncated.
    #[error("{what} contains an interior NUL at byte {position}")]
    InteriorNul { what: &'static str, position: usize },
    /// The argument does not match the entry point's signature.
    #[error("entry point `{entry}` cannot take a {given} argument")]
    ArgumentShape {
        entry: &'static str,
        given: &'static str,
    },
}
