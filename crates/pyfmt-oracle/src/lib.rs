//! Differential conformance oracle for pyfmt.
//!
//! Python's `str.format` is the reference; a compiled pyfmt shared object,
//! reached through [`pyfmt_bridge`], is the subject. This crate provides:
//! - Generators: grammar-constrained cases per entry point (proptest)
//! - Reference driver: a long-lived Python worker speaking JSON lines
//! - Adjudication: success/failure agreement plus payload equivalence
//! - Runner: seeded properties with proptest shrinking
//! - Reports: markdown + JSON, and a structured JSONL log

#![forbid(unsafe_code)]

pub mod adjudicate;
pub mod case;
pub mod config;
pub mod diff;
pub mod error;
pub mod generators;
pub mod reference;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod structured_log;
pub mod subject;
pub mod verify;

pub use adjudicate::{CarveOut, Mismatch, MismatchKind, Verdict, adjudicate};
pub use case::FormatCase;
pub use config::OracleConfig;
pub use error::{OracleError, ReferenceError};
pub use reference::{PythonReference, ReferenceFormatter, ReferenceOutcome};
pub use report::ConformanceReport;
pub use runner::PropertyRunner;
pub use subject::SubjectFormatter;
pub use verify::VerificationResult;
