//! Success-or-failure result of formatting one case on one side.

use std::fmt;

/// Result of one formatter invocation.
///
/// Failure reasons are opaque: two failures are never compared by reason,
/// only by presence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Rendered bytes.
    Success(Vec<u8>),
    /// The formatter rejected the input.
    Failure(String),
}

impl Outcome {
    /// Build a failure from any displayable reason.
    #[must_use]
    pub fn failure(reason: impl fmt::Display) -> Self {
        Self::Failure(reason.to_string())
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Payload bytes, if this is a success.
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Success(bytes) => Some(bytes),
            Self::Failure(_) => None,
        }
    }

    /// Failure reason, if this is a failure.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(reason) => Some(reason),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(bytes) => write!(f, "Success(\"{}\")", bytes.escape_ascii()),
            Self::Failure(reason) => write!(f, "Failure({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_escapes_control_bytes() {
        let outcome = Outcome::Success(b"a\tb\n".to_vec());
        assert_eq!(outcome.to_string(), "Success(\"a\\tb\\n\")");
    }

    #[test]
    fn accessors_match_variant() {
        let ok = Outcome::Success(b"42".to_vec());
        assert!(ok.is_success());
        assert_eq!(ok.payload(), Some(&b"42"[..]));
        assert_eq!(ok.reason(), None);

        let err = Outcome::failure("bad spec");
        assert!(err.is_failure());
        assert_eq!(err.payload(), None);
        assert_eq!(err.reason(), Some("bad spec"));
    }
}
