//! Fixed scenario table.
//!
//! Deterministic cases adjudicated through the same engine as the generated
//! ones. The first rows carry a literal expectation; the matrix rows only
//! require agreement.

use pyfmt_bridge::{FormatArg, Outcome};

use crate::adjudicate::{Verdict, adjudicate, normalize_payload};
use crate::case::FormatCase;
use crate::error::OracleError;
use crate::reference::ReferenceFormatter;
use crate::subject::SubjectFormatter;
use crate::verify::{VerificationResult, VerificationSummary};

/// What a scenario demands beyond agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Both sides render exactly this text (after NaN folding).
    Renders(&'static str),
    /// Both sides reject the input.
    Rejected,
    /// Whatever the reference does, the subject does too.
    Agreement,
}

/// One row of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub case: FormatCase,
    pub expectation: Expectation,
}

impl Scenario {
    #[must_use]
    pub fn new(case: FormatCase, expectation: Expectation) -> Self {
        Self { case, expectation }
    }

    /// Name used in reports: the literal replay line.
    #[must_use]
    pub fn name(&self) -> String {
        self.case.to_string()
    }
}

const INT_SPECIFIERS: &[&str] = &["", "b", "x", "d", "X", "#x", "#X", "#d", "#b", "#o"];
const INT_VALUES: &[i32] = &[42, -10, 100_000, 0, i32::MAX];
const FLOAT_VALUES: &[f32] = &[1.2, -1.2, 0.75, -1.0, 0.0, f32::NAN];
const DOUBLE_VALUES: &[f64] = &[1.2, -1.2, 0.75, 1.0 / 11.0, -1.0, 0.0, f64::NAN];

/// The full table, expectations first.
#[must_use]
pub fn scenario_table() -> Vec<Scenario> {
    let mut table = vec![
        Scenario::new(
            FormatCase::new("", "#x", "", FormatArg::Int(42)),
            Expectation::Renders("0x2a"),
        ),
        Scenario::new(
            FormatCase::new("", "b", "", FormatArg::Int(-10)),
            Expectation::Renders("-1010"),
        ),
        Scenario::new(
            FormatCase::new("", ".6e", "", FormatArg::Float64(0.0)),
            Expectation::Renders("0.000000e+00"),
        ),
        Scenario::new(FormatCase::template_only("{}"), Expectation::Rejected),
        Scenario::new(
            FormatCase::new("", "<5", "", FormatArg::Str("ab".to_string())),
            Expectation::Renders("ab   "),
        ),
    ];

    for &value in INT_VALUES {
        for &spec in INT_SPECIFIERS {
            table.push(Scenario::new(
                FormatCase::new("", spec, "", FormatArg::Int(value)),
                Expectation::Agreement,
            ));
        }
    }
    for &value in FLOAT_VALUES {
        table.push(Scenario::new(
            FormatCase::new("", "", "", FormatArg::Float32(value)),
            Expectation::Agreement,
        ));
    }
    for &value in DOUBLE_VALUES {
        table.push(Scenario::new(
            FormatCase::new("", "", "", FormatArg::Float64(value)),
            Expectation::Agreement,
        ));
    }
    table
}

/// Adjudicate one scenario.
pub fn verify_scenario<R, S>(
    scenario: &Scenario,
    reference: &R,
    subject: &S,
) -> Result<VerificationResult, OracleError>
where
    R: ReferenceFormatter + ?Sized,
    S: SubjectFormatter + ?Sized,
{
    let case = &scenario.case;
    let observation = adjudicate(case, reference, subject)?;
    let actual = format!(
        "reference={} subject={}",
        observation.reference.outcome, observation.subject
    );

    let mut problems = Vec::new();
    match &observation.verdict {
        Verdict::Agree => {}
        Verdict::Discard(carve) => problems.push(format!("discarded by carve-out {}", carve.name())),
        Verdict::Mismatch(mismatch) => problems.push(mismatch.to_string()),
    }

    let expected = match &scenario.expectation {
        Expectation::Renders(text) => {
            if !renders(case, &observation.reference.outcome, text) {
                problems.push(format!("reference did not render {text:?}"));
            }
            if !renders(case, &observation.subject, text) {
                problems.push(format!("subject did not render {text:?}"));
            }
            text.escape_debug().to_string()
        }
        Expectation::Rejected => {
            if observation.reference.outcome.is_success() {
                problems.push("reference accepted".to_string());
            }
            if observation.subject.is_success() {
                problems.push("subject accepted".to_string());
            }
            "<rejected>".to_string()
        }
        Expectation::Agreement => "<agreement>".to_string(),
    };

    Ok(VerificationResult {
        case_name: scenario.name(),
        entry_point: case.entry_point().name().to_string(),
        passed: problems.is_empty(),
        expected,
        actual,
        diff: (!problems.is_empty()).then(|| problems.join("\n")),
    })
}

/// Adjudicate every scenario in `table`.
pub fn verify_scenarios<R, S>(
    table: &[Scenario],
    reference: &R,
    subject: &S,
) -> Result<VerificationSummary, OracleError>
where
    R: ReferenceFormatter + ?Sized,
    S: SubjectFormatter + ?Sized,
{
    let results = table
        .iter()
        .map(|scenario| verify_scenario(scenario, reference, subject))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(VerificationSummary::from_results(results))
}

fn renders(case: &FormatCase, outcome: &Outcome, text: &str) -> bool {
    outcome
        .payload()
        .is_some_and(|bytes| normalize_payload(case, bytes) == normalize_payload(case, text.as_bytes()))
}
