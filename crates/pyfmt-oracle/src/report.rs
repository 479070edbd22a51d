//! Report generation for oracle runs.

use std::io::Read;
use std::path::Path;

use pyfmt_bridge::Outcome;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::adjudicate::Mismatch;
use crate::case::CaseRecord;
use crate::verify::VerificationSummary;

/// Serializable view of an [`Outcome`].
///
/// Payload bytes are ASCII-escaped so that control characters and invalid
/// UTF-8 survive the round trip through JSON and markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// `success` or `failure`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&Outcome> for OutcomeRecord {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Success(bytes) => Self {
                status: "success".to_string(),
                payload: Some(bytes.escape_ascii().to_string()),
                reason: None,
            },
            Outcome::Failure(reason) => Self {
                status: "failure".to_string(),
                payload: None,
                reason: Some(reason.clone()),
            },
        }
    }
}

/// Serializable view of a [`Mismatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchRecord {
    pub kind: String,
    pub case: CaseRecord,
    /// Literal replay line, e.g. `"{:#x}".format(42)`.
    pub replay: String,
    pub reference: OutcomeRecord,
    pub subject: OutcomeRecord,
    /// Full human-readable rendering, diff included.
    pub detail: String,
}

impl From<&Mismatch> for MismatchRecord {
    fn from(mismatch: &Mismatch) -> Self {
        Self {
            kind: mismatch.kind.name().to_string(),
            case: mismatch.case.record(),
            replay: mismatch.case.to_string(),
            reference: OutcomeRecord::from(&mismatch.reference),
            subject: OutcomeRecord::from(&mismatch.subject),
            detail: mismatch.to_string(),
        }
    }
}

/// Final state of one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    /// Every generated case agreed.
    Pass,
    /// A mismatch was found (and minimized).
    Fail,
    /// The property could not finish, e.g. too many discards.
    Abort,
}

impl PropertyStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Abort => "ABORT",
        }
    }
}

/// Result of running one property for one entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyResult {
    pub entry_point: String,
    /// `differential` or `idempotence`.
    pub property: String,
    pub status: PropertyStatus,
    /// Cases that agreed before the run ended.
    pub passed: u64,
    /// Cases redrawn because a carve-out matched.
    pub discarded: u64,
    /// Mismatch as first observed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<MismatchRecord>,
    /// Mismatch after shrinking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimal_failure: Option<MismatchRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    pub duration_ms: u64,
}

impl PropertyResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == PropertyStatus::Pass
    }
}

/// The subject shared object a run was pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectArtifact {
    pub path: String,
    pub sha256: String,
}

impl SubjectArtifact {
    /// Hash the file at `path`.
    pub fn fingerprint(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            path: path.display().to_string(),
            sha256: sha256_file(path)?,
        })
    }
}

/// Lowercase hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

/// A conformance report for one oracle session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// Report title.
    pub title: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    /// Root seed, as `0x` hex; rerun with it to replay the session.
    pub seed: String,
    /// Reference interpreter.
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectArtifact>,
    /// Generated cases per property.
    pub cases_per_property: u32,
    pub properties: Vec<PropertyResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<VerificationSummary>,
}

impl ConformanceReport {
    #[must_use]
    pub fn new(title: impl Into<String>, seed: u64, reference: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            timestamp: crate::structured_log::now_utc(),
            seed: format!("{seed:#018x}"),
            reference: reference.into(),
            subject: None,
            cases_per_property: 0,
            properties: Vec::new(),
            scenarios: None,
        }
    }

    /// Returns true if every property and scenario passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.properties.iter().all(PropertyResult::passed)
            && self
                .scenarios
                .as_ref()
                .is_none_or(VerificationSummary::all_passed)
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Seed: {}\n", self.seed));
        out.push_str(&format!("- Reference: {}\n", self.reference));
        if let Some(subject) = &self.subject {
            out.push_str(&format!("- Subject: {} (sha256 {})\n", subject.path, subject.sha256));
        }
        out.push_str(&format!("- Cases per property: {}\n\n", self.cases_per_property));

        if !self.properties.is_empty() {
            out.push_str("| Entry | Property | Status | Passed | Discarded | ms |\n");
            out.push_str("|-------|----------|--------|--------|-----------|----|\n");
            for p in &self.properties {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    p.entry_point,
                    p.property,
                    p.status.label(),
                    p.passed,
                    p.discarded,
                    p.duration_ms
                ));
            }
        }

        for p in self.properties.iter().filter(|p| !p.passed()) {
            out.push_str(&format!("\n## {} / {}\n\n", p.entry_point, p.property));
            if let Some(reason) = &p.abort_reason {
                out.push_str(&format!("Aborted: {reason}\n"));
            }
            if let Some(minimal) = &p.minimal_failure {
                out.push_str(&format!("Minimal counterexample:\n\n```\n{}\n```\n", minimal.detail));
            }
            if let Some(first) = &p.first_failure {
                out.push_str(&format!("\nFirst observed:\n\n```\n{}\n```\n", first.detail));
            }
        }

        if let Some(scenarios) = &self.scenarios {
            out.push('\n');
            out.push_str(&scenarios.to_markdown("Fixed scenarios").replacen("# ", "## ", 1));
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjudicate::MismatchKind;
    use crate::case::FormatCase;
    use pyfmt_bridge::FormatArg;

    fn failing_property() -> PropertyResult {
        let mismatch = Mismatch {
            kind: MismatchKind::PayloadDiffers,
            case: FormatCase::new("", "#x", "", FormatArg::Int(42)),
            reference: Outcome::Success(b"0x2a".to_vec()),
            subject: Outcome::Success(b"2a".to_vec()),
        };
        PropertyResult {
            entry_point: "int".to_string(),
            property: "differential".to_string(),
            status: PropertyStatus::Fail,
            passed: 17,
            discarded: 2,
            first_failure: Some(MismatchRecord::from(&mismatch)),
            minimal_failure: Some(MismatchRecord::from(&mismatch)),
            abort_reason: None,
            duration_ms: 5,
        }
    }

    #[test]
    fn outcome_record_escapes_payload() {
        let record = OutcomeRecord::from(&Outcome::Success(b"a\tb\xff".to_vec()));
        assert_eq!(record.status, "success");
        assert_eq!(record.payload.as_deref(), Some("a\\tb\\xff"));
        let record = OutcomeRecord::from(&Outcome::failure("bad"));
        assert_eq!(record.status, "failure");
        assert_eq!(record.reason.as_deref(), Some("bad"));
        assert!(record.payload.is_none());
    }

    #[test]
    fn mismatch_record_carries_replay_line() {
        let property = failing_property();
        let record = property.minimal_failure.expect("recorded");
        assert_eq!(record.kind, "payload_differs");
        assert_eq!(record.replay, "\"{:#x}\".format(42)");
        assert_eq!(record.case.template, "{:#x}");
    }

    #[test]
    fn report_pass_state_follows_properties() {
        let mut report = ConformanceReport::new("pyfmt conformance", 0xABCD, "python3");
        assert!(report.all_passed());
        assert_eq!(report.seed, "0x000000000000abcd");
        report.properties.push(failing_property());
        assert!(!report.all_passed());
    }

    #[test]
    fn markdown_shows_seed_artifact_and_counterexample() {
        let mut report = ConformanceReport::new("pyfmt conformance", 7, "python3");
        report.subject = Some(SubjectArtifact {
            path: "/tmp/libpyfmt.so".to_string(),
            sha256: "00ff".to_string(),
        });
        report.cases_per_property = 100;
        report.properties.push(failing_property());
        let md = report.to_markdown();
        assert!(md.contains("- Seed: 0x0000000000000007"), "{md}");
        assert!(md.contains("/tmp/libpyfmt.so (sha256 00ff)"), "{md}");
        assert!(md.contains("| int | differential | FAIL | 17 | 2 | 5 |"), "{md}");
        assert!(md.contains("## int / differential"), "{md}");
        assert!(md.contains("payload_differs: \"{:#x}\".format(42)"), "{md}");
    }

    #[test]
    fn failed_scenario_fails_the_report() {
        let mut report = ConformanceReport::new("pyfmt conformance", 3, "python3");
        report.scenarios = Some(VerificationSummary::from_results(vec![
            crate::verify::VerificationResult {
                case_name: "\"{:#x}\".format(42)".to_string(),
                entry_point: "int".to_string(),
                passed: false,
                expected: "0x2a".to_string(),
                actual: "2a".to_string(),
                diff: None,
            },
        ]));
        assert!(!report.all_passed());
        let md = report.to_markdown();
        assert!(md.contains("## Fixed scenarios"), "{md}");
        assert!(md.contains("- Failed: 1"), "{md}");
        let parsed: ConformanceReport =
            serde_json::from_str(&report.to_json()).expect("valid json");
        assert_eq!(parsed.scenarios.map(|s| s.failed), Some(1));
    }

    #[test]
    fn json_round_trips() {
        let mut report = ConformanceReport::new("pyfmt conformance", 1, "python3");
        report.properties.push(failing_property());
        let parsed: ConformanceReport =
            serde_json::from_str(&report.to_json()).expect("valid json");
        assert_eq!(parsed.properties.len(), 1);
        assert_eq!(parsed.properties[0].status, PropertyStatus::Fail);
    }

    #[test]
    fn sha256_of_known_file() {
        let path = std::env::temp_dir().join(format!("pyfmt-sha-{}", std::process::id()));
        std::fs::write(&path, b"abc").expect("write");
        let digest = sha256_file(&path).expect("hash");
        let _ = std::fs::remove_file(&path);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
