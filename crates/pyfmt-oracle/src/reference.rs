//! The trusted reference formatter: Python's `str.format`.
//!
//! One interpreter runs for the whole oracle session and answers one JSON
//! line per request. Floats cross the pipe as IEEE-754 double bit patterns so
//! NaN survives; a single-precision value is widened exactly first, because
//! Python has no `float32`.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use pyfmt_bridge::{FormatArg, Outcome};

use crate::case::FormatCase;
use crate::error::ReferenceError;

const WORKER_SOURCE: &str = include_str!("reference_worker.py");

/// Something that renders a case the way the trusted implementation does.
pub trait ReferenceFormatter {
    /// Render `case`. Formatter failures are `Ok(Outcome::Failure(..))`.
    fn format(&self, case: &FormatCase) -> Result<ReferenceOutcome, ReferenceError>;
}

/// How the reference classified its own failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// `ValueError`: malformed specifier or template.
    MalformedSpecifier,
    /// `IndexError`: positional field out of range.
    FieldOutOfRange,
    /// `KeyError`: named field lookup failed.
    KeyLookup,
    /// Any other exception. Not a recognised formatter failure.
    Unexpected,
}

/// A reference outcome plus the failure classification, when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceOutcome {
    pub outcome: Outcome,
    pub kind: Option<FailureKind>,
}

impl ReferenceOutcome {
    #[must_use]
    pub fn success(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            outcome: Outcome::Success(bytes.into()),
            kind: None,
        }
    }

    #[must_use]
    pub fn failure(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure(reason.into()),
            kind: Some(kind),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WireArg {
    Int { value: i32 },
    Float { bits: String },
    String { value: String },
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    template: &'a str,
    arg: Option<WireArg>,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    ok: bool,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    kind: Option<FailureKind>,
    #[serde(default)]
    message: Option<String>,
}

fn wire_arg(value: &FormatArg) -> Option<WireArg> {
    match value {
        FormatArg::None => None,
        FormatArg::Int(v) => Some(WireArg::Int { value: *v }),
        FormatArg::Float32(v) => Some(WireArg::Float {
            bits: format!("{:#018x}", f64::from(*v).to_bits()),
        }),
        FormatArg::Float64(v) => Some(WireArg::Float {
            bits: format!("{:#018x}", v.to_bits()),
        }),
        FormatArg::Str(s) => Some(WireArg::String { value: s.clone() }),
    }
}

fn encode_request(case: &FormatCase) -> Result<String, ReferenceError> {
    let template = case.template();
    let request = WireRequest {
        template: &template,
        arg: wire_arg(&case.value),
    };
    serde_json::to_string(&request).map_err(|err| ReferenceError::Protocol {
        line: template.clone(),
        reason: err.to_string(),
    })
}

fn decode_response(line: &str) -> Result<ReferenceOutcome, ReferenceError> {
    let protocol = |reason: String| ReferenceError::Protocol {
        line: line.trim_end().to_string(),
        reason,
    };
    let response: WireResponse =
        serde_json::from_str(line).map_err(|err| protocol(err.to_string()))?;
    if response.ok {
        let value = response
            .value
            .ok_or_else(|| protocol("success without value".to_string()))?;
        return Ok(ReferenceOutcome::success(value));
    }
    let kind = response
        .kind
        .ok_or_else(|| protocol("failure without kind".to_string()))?;
    Ok(ReferenceOutcome::failure(
        kind,
        response.message.unwrap_or_default(),
    ))
}

struct Worker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// A long-lived Python interpreter answering format requests.
pub struct PythonReference {
    program: String,
    worker: Mutex<Worker>,
}

impl PythonReference {
    /// Spawn `program -u -c <worker>`.
    pub fn spawn(program: &str) -> Result<Self, ReferenceError> {
        let spawn_err = |source| ReferenceError::Spawn {
            program: program.to_string(),
            source,
        };
        let mut child = Command::new(program)
            .arg("-u")
            .arg("-c")
            .arg(WORKER_SOURCE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(spawn_err)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(spawn_err(std::io::Error::other("worker pipes unavailable")));
        };
        Ok(Self {
            program: program.to_string(),
            worker: Mutex::new(Worker {
                child,
                stdin,
                stdout: BufReader::new(stdout),
            }),
        })
    }

    /// Interpreter this worker was spawned from.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ReferenceFormatter for PythonReference {
    fn format(&self, case: &FormatCase) -> Result<ReferenceOutcome, ReferenceError> {
        let request = encode_request(case)?;
        let mut worker = self.worker.lock();
        writeln!(worker.stdin, "{request}")?;
        worker.stdin.flush()?;

        let mut line = String::new();
        if worker.stdout.read_line(&mut line)? == 0 {
            return Err(ReferenceError::Exited);
        }
        decode_response(&line)
    }
}

impl Drop for PythonReference {
    fn drop(&mut self) {
        let worker = self.worker.get_mut();
        let _ = worker.child.kill();
        let _ = worker.child.wait();
    }
}
