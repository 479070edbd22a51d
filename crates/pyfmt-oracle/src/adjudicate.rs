//! Per-case equivalence decision between reference and subject.
//!
//! 1. Render with the reference.
//! 2. If a carve-out matches the reference outcome, discard the case.
//! 3. Reference failure: the subject's error probe must report rejection.
//! 4. Reference success: the subject must succeed with an equivalent payload.
//!
//! Equivalence is byte equality, except that a NaN-valued case compares
//! with every `nan` token folded to the canonical `NaN`.

use std::borrow::Cow;
use std::fmt;

use pyfmt_bridge::Outcome;
use serde::{Deserialize, Serialize};

use crate::case::FormatCase;
use crate::diff::render_diff;
use crate::error::OracleError;
use crate::reference::{ReferenceFormatter, ReferenceOutcome};
use crate::subject::SubjectFormatter;

/// A documented divergence that is accepted rather than reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarveOut {
    /// The reference forbids mixing `{}` with a later `{0}`; the subject
    /// supports it as a superset feature.
    AutomaticToManualFieldNumbering,
}

impl CarveOut {
    /// Every active carve-out.
    pub const ALL: &'static [Self] = &[Self::AutomaticToManualFieldNumbering];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AutomaticToManualFieldNumbering => "automatic_to_manual_field_numbering",
        }
    }

    /// Whether this carve-out covers the reference outcome of `case`.
    #[must_use]
    pub fn applies(self, _case: &FormatCase, reference: &ReferenceOutcome) -> bool {
        match self {
            Self::AutomaticToManualFieldNumbering => reference
                .outcome
                .reason()
                .is_some_and(|r| r.contains("cannot switch from automatic field numbering")),
        }
    }
}

/// First carve-out covering the reference outcome, if any.
#[must_use]
pub fn matching_carve_out(case: &FormatCase, reference: &ReferenceOutcome) -> Option<CarveOut> {
    CarveOut::ALL
        .iter()
        .copied()
        .find(|carve| carve.applies(case, reference))
}

/// Rewrite every ASCII case-insensitive `nan` to `NaN`.
#[must_use]
pub fn canonical_nan_tokens(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].get(..3).is_some_and(|w| w.eq_ignore_ascii_case(b"nan")) {
            out.extend_from_slice(b"NaN");
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    out
}

/// Payload as compared for `case`.
#[must_use]
pub fn normalize_payload<'a>(case: &FormatCase, bytes: &'a [u8]) -> Cow<'a, [u8]> {
    if case.value.is_nan() {
        Cow::Owned(canonical_nan_tokens(bytes))
    } else {
        Cow::Borrowed(bytes)
    }
}

/// Whether two successful payloads agree for `case`.
#[must_use]
pub fn payloads_equivalent(case: &FormatCase, reference: &[u8], subject: &[u8]) -> bool {
    normalize_payload(case, reference) == normalize_payload(case, subject)
}

/// Why a case failed adjudication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Reference failed, subject accepted.
    SubjectAccepted,
    /// Reference succeeded, subject failed.
    SubjectRejected,
    /// Both succeeded with different payloads.
    PayloadDiffers,
    /// Two subject calls on the same case disagreed.
    NonDeterministic,
}

impl MismatchKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SubjectAccepted => "subject_accepted",
            Self::SubjectRejected => "subject_rejected",
            Self::PayloadDiffers => "payload_differs",
            Self::NonDeterministic => "non_deterministic",
        }
    }
}

/// A reportable disagreement, complete enough to replay by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub kind: MismatchKind,
    pub case: FormatCase,
    /// Reference outcome (for `NonDeterministic`, the first subject call).
    pub reference: Outcome,
    /// Subject outcome (for `NonDeterministic`, the second subject call).
    pub subject: Outcome,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (left, right) = match self.kind {
            MismatchKind::NonDeterministic => ("first call", "second call"),
            _ => ("reference", "subject"),
        };
        writeln!(f, "{}: {}", self.kind.name(), self.case)?;
        writeln!(f, "  {left:<11} {}", self.reference)?;
        write!(f, "  {right:<11} {}", self.subject)?;
        if let (Some(a), Some(b)) = (self.reference.payload(), self.subject.payload()) {
            write!(f, "\n{}", render_diff(a, b))?;
        }
        Ok(())
    }
}

impl std::error::Error for Mismatch {}

/// Result of adjudicating one case.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Both sides agree.
    Agree,
    /// A carve-out matched; the case is redrawn, not asserted on.
    Discard(CarveOut),
    Mismatch(Box<Mismatch>),
}

/// Outcomes observed while adjudicating, for tracing.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub reference: ReferenceOutcome,
    pub subject: Outcome,
    pub verdict: Verdict,
}

/// Adjudicate one case.
pub fn adjudicate<R, S>(
    case: &FormatCase,
    reference: &R,
    subject: &S,
) -> Result<Observation, OracleError>
where
    R: ReferenceFormatter + ?Sized,
    S: SubjectFormatter + ?Sized,
{
    let reference_outcome = reference.format(case)?;

    if let Some(carve) = matching_carve_out(case, &reference_outcome) {
        return Ok(Observation {
            reference: reference_outcome,
            subject: Outcome::failure("not invoked: carve-out"),
            verdict: Verdict::Discard(carve),
        });
    }

    let (subject_outcome, mismatch_kind) = match &reference_outcome.outcome {
        Outcome::Failure(_) => {
            if subject.probe_error(case)? {
                (Outcome::failure("rejected by error probe"), None)
            } else {
                (subject.invoke(case)?, Some(MismatchKind::SubjectAccepted))
            }
        }
        Outcome::Success(expected) => {
            let outcome = subject.invoke(case)?;
            let kind = match &outcome {
                Outcome::Failure(_) => Some(MismatchKind::SubjectRejected),
                Outcome::Success(actual) if !payloads_equivalent(case, expected, actual) => {
                    Some(MismatchKind::PayloadDiffers)
                }
                Outcome::Success(_) => None,
            };
            (outcome, kind)
        }
    };

    let verdict = match mismatch_kind {
        None => Verdict::Agree,
        Some(kind) => Verdict::Mismatch(Box::new(Mismatch {
            kind,
            case: case.clone(),
            reference: reference_outcome.outcome.clone(),
            subject: subject_outcome.clone(),
        })),
    };
    Ok(Observation {
        reference: reference_outcome,
        subject: subject_outcome,
        verdict,
    })
}

/// Both subject answers for one case, and whether they agree.
#[derive(Debug, Clone, PartialEq)]
pub struct Rerun {
    pub first: Outcome,
    pub second: Outcome,
    pub verdict: Verdict,
}

/// Invoke the subject twice and require identical outcomes.
pub fn check_idempotent<S>(case: &FormatCase, subject: &S) -> Result<Rerun, OracleError>
where
    S: SubjectFormatter + ?Sized,
{
    let first = subject.invoke(case)?;
    let second = subject.invoke(case)?;
    let same = match (&first, &second) {
        (Outcome::Success(a), Outcome::Success(b)) => a == b,
        (Outcome::Failure(_), Outcome::Failure(_)) => true,
        _ => false,
    };
    let verdict = if same {
        Verdict::Agree
    } else {
        Verdict::Mismatch(Box::new(Mismatch {
            kind: MismatchKind::NonDeterministic,
            case: case.clone(),
            reference: first.clone(),
            subject: second.clone(),
        }))
    };
    Ok(Rerun {
        first,
        second,
        verdict,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::FailureKind;
    use pyfmt_bridge::FormatArg;

    #[test]
    fn nan_tokens_fold_to_canonical_case() {
        assert_eq!(canonical_nan_tokens(b"+nan"), b"+NaN");
        assert_eq!(canonical_nan_tokens(b"  NAN|nAn"), b"  NaN|NaN");
        assert_eq!(canonical_nan_tokens(b"na"), b"na");
        assert_eq!(canonical_nan_tokens(b"banana"), b"baNaNa");
    }

    #[test]
    fn nan_fold_applies_only_to_nan_values() {
        let nan_case = FormatCase::new("", "5.2f", "", FormatArg::Float64(f64::NAN));
        assert!(payloads_equivalent(&nan_case, b"  nan", b"  NaN"));
        assert!(!payloads_equivalent(&nan_case, b"  nan", b" NaN"));

        let finite = FormatCase::new("nan", "5.2f", "", FormatArg::Float64(1.0));
        assert!(!payloads_equivalent(&finite, b"nan 1.00", b"NaN 1.00"));
        assert!(payloads_equivalent(&finite, b"nan 1.00", b"nan 1.00"));
    }

    #[test]
    fn field_numbering_carve_out_matches_reference_message() {
        let case = FormatCase::new("{0}", "d", "", FormatArg::Int(1));
        let carved = ReferenceOutcome::failure(
            FailureKind::MalformedSpecifier,
            "cannot switch from automatic field numbering to manual field specification",
        );
        assert_eq!(
            matching_carve_out(&case, &carved),
            Some(CarveOut::AutomaticToManualFieldNumbering)
        );

        let reverse = ReferenceOutcome::failure(
            FailureKind::MalformedSpecifier,
            "cannot switch from manual field specification to automatic field numbering",
        );
        assert_eq!(matching_carve_out(&case, &reverse), None);
        assert_eq!(matching_carve_out(&case, &ReferenceOutcome::success("1")), None);
    }

    #[test]
    fn carve_outs_are_enumerable() {
        let names: Vec<&str> = CarveOut::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["automatic_to_manual_field_numbering"]);
    }

    #[test]
    fn mismatch_display_names_both_sides() {
        let mismatch = Mismatch {
            kind: MismatchKind::PayloadDiffers,
            case: FormatCase::new("", "<5", "", FormatArg::Str("ab".into())),
            reference: Outcome::Success(b"ab   ".to_vec()),
            subject: Outcome::Success(b"   ab".to_vec()),
        };
        let text = mismatch.to_string();
        assert!(text.starts_with("payload_differs: \"{:<5}\".format(\"ab\")"), "{text}");
        assert!(text.contains("reference   Success(\"ab   \")"), "{text}");
        assert!(text.contains("subject     Success(\"   ab\")"), "{text}");
        assert!(text.contains("--- reference"), "{text}");
    }

    struct Alternating(std::cell::Cell<u32>);

    impl SubjectFormatter for Alternating {
        fn invoke(&self, _case: &FormatCase) -> Result<Outcome, pyfmt_bridge::MarshalError> {
            self.0.set(self.0.get() + 1);
            Ok(Outcome::Success(format!("call {}", self.0.get() % 2).into_bytes()))
        }

        fn probe_error(&self, _case: &FormatCase) -> Result<bool, pyfmt_bridge::MarshalError> {
            Ok(false)
        }
    }

    #[test]
    fn rerun_keeps_both_answers() {
        let case = FormatCase::new("", "d", "", FormatArg::Int(1));
        let rerun = check_idempotent(&case, &Alternating(std::cell::Cell::new(0))).expect("runs");
        assert_eq!(rerun.first, Outcome::Success(b"call 1".to_vec()));
        assert_eq!(rerun.second, Outcome::Success(b"call 0".to_vec()));
        let Verdict::Mismatch(mismatch) = rerun.verdict else {
            panic!("expected a mismatch");
        };
        assert_eq!(mismatch.kind, MismatchKind::NonDeterministic);
        assert_eq!(mismatch.reference, rerun.first);
        assert_eq!(mismatch.subject, rerun.second);
    }
}
