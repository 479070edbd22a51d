//! Property execution engine.
//!
//! Each property draws cases from the generator for one entry point, feeds
//! them to [`adjudicate`] (or [`check_idempotent`]), and lets proptest shrink
//! the first mismatch. Carve-out discards are proptest rejections, so they
//! are redrawn and never count toward the case budget.

use std::cell::{Cell, RefCell};
use std::time::Instant;

use proptest::test_runner::{Config, TestCaseError, TestError, TestRunner};
use pyfmt_bridge::EntryPoint;

use crate::adjudicate::{Mismatch, Verdict, adjudicate, check_idempotent};
use crate::case::FormatCase;
use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::generators::{case_strategy, seeded_rng};
use crate::reference::ReferenceFormatter;
use crate::report::{
    ConformanceReport, MismatchRecord, OutcomeRecord, PropertyResult, PropertyStatus,
};
use crate::scenarios::{Scenario, verify_scenarios};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, LogOutcome};
use crate::subject::SubjectFormatter;

/// Reference and subject must agree on every case.
pub const DIFFERENTIAL: &str = "differential";
/// Two subject calls on one case must agree.
pub const IDEMPOTENCE: &str = "idempotence";

const MIN_GLOBAL_REJECTS: u32 = 1024;

/// Pick a root seed when none was configured.
#[must_use]
pub fn fresh_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    (nanos as u64) ^ (u64::from(std::process::id()) << 32)
}

/// proptest settings for a property of `cases` cases.
#[must_use]
pub fn proptest_config(cases: u32) -> Config {
    let mut config = Config::with_cases(cases);
    config.max_global_rejects = MIN_GLOBAL_REJECTS.max(cases.saturating_mul(4));
    config.failure_persistence = None;
    config
}

/// Per-property bookkeeping shared with the proptest closure.
#[derive(Default)]
struct Tally {
    passed: Cell<u64>,
    discarded: Cell<u64>,
    first_failure: RefCell<Option<Mismatch>>,
    fatal: RefCell<Option<OracleError>>,
}

impl Tally {
    fn shrinking(&self) -> bool {
        self.first_failure.borrow().is_some()
    }

    fn bump(cell: &Cell<u64>) {
        cell.set(cell.get() + 1);
    }
}

/// Runs properties against one reference and one subject.
pub struct PropertyRunner<'a, R: ?Sized, S: ?Sized> {
    reference: &'a R,
    subject: &'a S,
    config: &'a OracleConfig,
    seed: u64,
    log: Option<RefCell<LogEmitter>>,
}

impl<'a, R, S> PropertyRunner<'a, R, S>
where
    R: ReferenceFormatter + ?Sized,
    S: SubjectFormatter + ?Sized,
{
    /// Create a runner; the seed is the configured one or a fresh one.
    #[must_use]
    pub fn new(reference: &'a R, subject: &'a S, config: &'a OracleConfig) -> Self {
        Self {
            reference,
            subject,
            config,
            seed: config.seed.unwrap_or_else(fresh_seed),
            log: None,
        }
    }

    /// Attach a structured log sink.
    #[must_use]
    pub fn with_log(mut self, emitter: LogEmitter) -> Self {
        self.log = Some(RefCell::new(emitter));
        self
    }

    /// Root seed of every property this runner executes.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Reference and subject agree on every generated case for `entry`.
    pub fn run_differential(&self, entry: EntryPoint) -> Result<PropertyResult, OracleError> {
        self.run_property(entry, DIFFERENTIAL, |case| {
            let observation = adjudicate(case, self.reference, self.subject)?;
            if self.config.verbose {
                self.emit(
                    LogEmitter::entry(LogLevel::Trace, "case")
                        .with_property(entry.name(), DIFFERENTIAL)
                        .with_case(case.record())
                        .with_outcomes(
                            OutcomeRecord::from(&observation.reference.outcome),
                            OutcomeRecord::from(&observation.subject),
                        )
                        .with_outcome(log_outcome(&observation.verdict)),
                )?;
            }
            Ok(observation.verdict)
        })
    }

    /// The subject answers identically when asked twice.
    pub fn run_idempotence(&self, entry: EntryPoint) -> Result<PropertyResult, OracleError> {
        self.run_property(entry, IDEMPOTENCE, |case| {
            let rerun = check_idempotent(case, self.subject)?;
            if self.config.verbose {
                // The first call fills the reference slot.
                self.emit(
                    LogEmitter::entry(LogLevel::Trace, "case")
                        .with_property(entry.name(), IDEMPOTENCE)
                        .with_case(case.record())
                        .with_outcomes(
                            OutcomeRecord::from(&rerun.first),
                            OutcomeRecord::from(&rerun.second),
                        )
                        .with_outcome(log_outcome(&rerun.verdict)),
                )?;
            }
            Ok(rerun.verdict)
        })
    }

    /// Run both properties for every entry point in `entries`.
    pub fn run_all(&self, entries: &[EntryPoint]) -> Result<Vec<PropertyResult>, OracleError> {
        let mut results = Vec::with_capacity(entries.len() * 2);
        for &entry in entries {
            results.push(self.run_differential(entry)?);
            results.push(self.run_idempotence(entry)?);
        }
        Ok(results)
    }

    /// Run both properties for `entries`, then `table`, into one report.
    ///
    /// The subject artifact is left unset; only the caller knows where the
    /// subject came from.
    pub fn conformance_report(
        &self,
        title: &str,
        reference_name: &str,
        entries: &[EntryPoint],
        table: &[Scenario],
    ) -> Result<ConformanceReport, OracleError> {
        let mut report = ConformanceReport::new(title, self.seed, reference_name);
        report.cases_per_property = self.config.cases;
        report.properties = self.run_all(entries)?;
        report.scenarios = Some(verify_scenarios(table, self.reference, self.subject)?);
        Ok(report)
    }

    fn run_property<F>(
        &self,
        entry: EntryPoint,
        property: &str,
        check: F,
    ) -> Result<PropertyResult, OracleError>
    where
        F: Fn(&FormatCase) -> Result<Verdict, OracleError>,
    {
        let started = Instant::now();
        self.emit(
            LogEmitter::entry(LogLevel::Info, "property_start")
                .with_property(entry.name(), property)
                .with_details(serde_json::json!({
                    "seed": format!("{:#018x}", self.seed),
                    "cases": self.config.cases,
                })),
        )?;

        let strategy = case_strategy(entry, self.config)?;
        let mut runner =
            TestRunner::new_with_rng(proptest_config(self.config.cases), seeded_rng(self.seed));
        let tally = Tally::default();

        let run = runner.run(&strategy, |case| {
            if tally.fatal.borrow().is_some() {
                return Err(TestCaseError::fail("aborted"));
            }
            match check(&case) {
                Ok(Verdict::Agree) => {
                    if !tally.shrinking() {
                        Tally::bump(&tally.passed);
                    }
                    Ok(())
                }
                Ok(Verdict::Discard(carve)) => {
                    if !tally.shrinking() {
                        Tally::bump(&tally.discarded);
                    }
                    Err(TestCaseError::reject(carve.name()))
                }
                Ok(Verdict::Mismatch(mismatch)) => {
                    let reason = mismatch.kind.name();
                    tally.first_failure.borrow_mut().get_or_insert(*mismatch);
                    Err(TestCaseError::fail(reason))
                }
                Err(err) => {
                    let reason = err.to_string();
                    *tally.fatal.borrow_mut() = Some(err);
                    Err(TestCaseError::fail(reason))
                }
            }
        });

        if let Some(err) = tally.fatal.take() {
            return Err(err);
        }

        let first_failure = tally.first_failure.take();
        let (status, minimal, abort_reason) = match run {
            Ok(()) => (PropertyStatus::Pass, None, None),
            Err(TestError::Fail(_, minimal_case)) => {
                let minimal = match check(&minimal_case)? {
                    Verdict::Mismatch(m) => Some(*m),
                    _ => first_failure.clone(),
                };
                (PropertyStatus::Fail, minimal, None)
            }
            Err(TestError::Abort(reason)) => (PropertyStatus::Abort, None, Some(reason.to_string())),
        };

        let result = PropertyResult {
            entry_point: entry.name().to_string(),
            property: property.to_string(),
            status,
            passed: tally.passed.get(),
            discarded: tally.discarded.get(),
            first_failure: first_failure.as_ref().map(MismatchRecord::from),
            minimal_failure: minimal.as_ref().map(MismatchRecord::from),
            abort_reason,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        let mut end = LogEmitter::entry(level_for(status), "property_end")
            .with_property(entry.name(), property)
            .with_outcome(match status {
                PropertyStatus::Pass => LogOutcome::Pass,
                PropertyStatus::Fail => LogOutcome::Fail,
                PropertyStatus::Abort => LogOutcome::Abort,
            })
            .with_duration_ms(result.duration_ms)
            .with_details(serde_json::json!({
                "passed": result.passed,
                "discarded": result.discarded,
                "abort_reason": result.abort_reason,
            }));
        if let Some(m) = &minimal {
            end = end
                .with_case(m.case.record())
                .with_outcomes(OutcomeRecord::from(&m.reference), OutcomeRecord::from(&m.subject));
        }
        self.emit(end)?;
        Ok(result)
    }

    fn emit(&self, entry: LogEntry) -> Result<(), OracleError> {
        let Some(log) = &self.log else {
            return Ok(());
        };
        let mut log = log.borrow_mut();
        log.emit_entry(entry)?;
        log.flush()?;
        Ok(())
    }
}

fn log_outcome(verdict: &Verdict) -> LogOutcome {
    match verdict {
        Verdict::Agree => LogOutcome::Pass,
        Verdict::Discard(_) => LogOutcome::Discard,
        Verdict::Mismatch(_) => LogOutcome::Fail,
    }
}

const fn level_for(status: PropertyStatus) -> LogLevel {
    match status {
        PropertyStatus::Pass => LogLevel::Info,
        PropertyStatus::Fail | PropertyStatus::Abort => LogLevel::Error,
    }
}
