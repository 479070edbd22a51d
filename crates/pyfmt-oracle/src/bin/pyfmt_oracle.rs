//! CLI entrypoint for the pyfmt conformance oracle.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pyfmt_bridge::{Bridge, EntryPoint};
use pyfmt_oracle::case::{FormatCase, parse_value};
use pyfmt_oracle::config::{OracleConfig, oracle_config, parse_seed};
use pyfmt_oracle::report::SubjectArtifact;
use pyfmt_oracle::scenarios::{scenario_table, verify_scenarios};
use pyfmt_oracle::structured_log::LogEmitter;
use pyfmt_oracle::{PropertyRunner, PythonReference, Verdict, adjudicate};

/// Differential conformance oracle: Python `str.format` versus pyfmt.
#[derive(Debug, Parser)]
#[command(name = "pyfmt-oracle")]
#[command(about = "Check a compiled pyfmt library against Python str.format")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Where the two formatters come from.
#[derive(Debug, Args)]
struct Sides {
    /// Subject shared object (overrides PYFMT_BRIDGE_LIB).
    #[arg(long)]
    bridge_lib: Option<PathBuf>,
    /// Reference interpreter (overrides PYFMT_ORACLE_PYTHON).
    #[arg(long)]
    python: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the generated properties for each entry point, then the fixed
    /// scenario table.
    Run {
        #[command(flatten)]
        sides: Sides,
        /// Entry point to test (repeatable; default all).
        #[arg(long = "entry")]
        entries: Vec<String>,
        /// Generated cases per property.
        #[arg(long)]
        cases: Option<u32>,
        /// Root seed (decimal or 0x...).
        #[arg(long)]
        seed: Option<String>,
        /// Log every case and both outcomes.
        #[arg(long)]
        verbose: bool,
        /// JSONL log destination.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Output report path (markdown).
        #[arg(long)]
        report_md: Option<PathBuf>,
        /// Output report path (JSON).
        #[arg(long)]
        report_json: Option<PathBuf>,
    },
    /// Adjudicate the fixed scenario table.
    Scenarios {
        #[command(flatten)]
        sides: Sides,
        /// Output report path (markdown).
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Format one case on both sides and print the verdict.
    Probe {
        #[command(flatten)]
        sides: Sides,
        /// Entry point (`no_args`, `int`, `float`, `double`, `string`).
        entry: String,
        /// Value to substitute (floats also accept `0x` bit patterns).
        #[arg(default_value = "", allow_hyphen_values = true)]
        value: String,
        /// Format specifier placed inside `{:...}`.
        #[arg(long, default_value = "")]
        spec: String,
        /// Literal text before the placeholder (the whole template for `no_args`).
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        prefix: String,
        /// Literal text after the placeholder.
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        suffix: String,
    },
    /// Render the byte diff between two payloads.
    Diff {
        /// Reference payload.
        expected: String,
        /// Subject payload.
        actual: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            sides,
            entries,
            cases,
            seed,
            verbose,
            log,
            report_md,
            report_json,
        } => {
            let mut config = configure(&sides);
            if let Some(cases) = cases {
                config.cases = cases.max(1);
            }
            if let Some(seed) = seed {
                config.seed =
                    Some(parse_seed(&seed).ok_or_else(|| format!("Invalid seed '{seed}'"))?);
            }
            config.verbose |= verbose;
            config.log_path = log;
            let entries = parse_entries(&entries)?;

            let bridge = Bridge::global(config.bridge_lib.as_deref())?;
            let reference = PythonReference::spawn(&config.python)?;
            let mut runner = PropertyRunner::new(&reference, bridge, &config);
            let run_id = format!("run-{:016x}", runner.seed());
            if let Some(path) = &config.log_path {
                runner = runner.with_log(LogEmitter::to_file(path, &run_id)?);
            } else if config.verbose {
                runner = runner.with_log(LogEmitter::to_stderr(&run_id));
            }

            eprintln!(
                "Running {} entry point(s), {} cases per property, seed {:#018x}",
                entries.len(),
                config.cases,
                runner.seed()
            );
            let mut report = runner.conformance_report(
                "pyfmt Conformance Report",
                reference.program(),
                &entries,
                &scenario_table(),
            )?;
            report.subject = Some(SubjectArtifact::fingerprint(bridge.artifact_path())?);

            for p in &report.properties {
                eprintln!(
                    "[{}] {} / {}: passed={}, discarded={}",
                    p.status.label(),
                    p.entry_point,
                    p.property,
                    p.passed,
                    p.discarded
                );
                if let Some(minimal) = &p.minimal_failure {
                    eprintln!("{}", minimal.detail);
                }
                if let Some(reason) = &p.abort_reason {
                    eprintln!("aborted: {reason}");
                }
            }
            if let Some(summary) = &report.scenarios {
                eprintln!(
                    "Scenarios: total={}, passed={}, failed={}",
                    summary.total, summary.passed, summary.failed
                );
            }

            if let Some(path) = report_md {
                std::fs::write(&path, report.to_markdown())?;
                eprintln!("Wrote report to {}", path.display());
            }
            if let Some(path) = report_json {
                std::fs::write(&path, report.to_json())?;
                eprintln!("Wrote report to {}", path.display());
            }

            if !report.all_passed() {
                return Err(format!(
                    "Conformance failed (replay with --seed {})",
                    report.seed
                )
                .into());
            }
        }
        Command::Scenarios { sides, report } => {
            let config = configure(&sides);
            let bridge = Bridge::global(config.bridge_lib.as_deref())?;
            let reference = PythonReference::spawn(&config.python)?;
            let summary = verify_scenarios(&scenario_table(), &reference, bridge)?;
            let body = summary.to_markdown("pyfmt Fixed Scenarios");
            match report {
                Some(path) => {
                    std::fs::write(&path, &body)?;
                    eprintln!("Wrote report to {}", path.display());
                }
                None => print!("{body}"),
            }
            eprintln!(
                "Scenarios complete: total={}, passed={}, failed={}",
                summary.total, summary.passed, summary.failed
            );
            if !summary.all_passed() {
                return Err("Scenario verification failed".into());
            }
        }
        Command::Probe {
            sides,
            entry,
            value,
            spec,
            prefix,
            suffix,
        } => {
            let entry = EntryPoint::from_str_loose(&entry)
                .ok_or_else(|| format!("Unsupported entry point '{entry}'"))?;
            let value = parse_value(entry, &value)?;
            let case = FormatCase::new(prefix, spec, suffix, value);

            let config = configure(&sides);
            let bridge = Bridge::global(config.bridge_lib.as_deref())?;
            let reference = PythonReference::spawn(&config.python)?;
            let observation = adjudicate(&case, &reference, bridge)?;

            println!("case:      {case}");
            println!("reference: {}", observation.reference.outcome);
            println!("subject:   {}", observation.subject);
            match observation.verdict {
                Verdict::Agree => println!("verdict:   agree"),
                Verdict::Discard(carve) => println!("verdict:   discard ({})", carve.name()),
                Verdict::Mismatch(mismatch) => {
                    println!("verdict:   {}", mismatch.kind.name());
                    let err: Box<dyn std::error::Error> = mismatch;
                    return Err(err);
                }
            }
        }
        Command::Diff { expected, actual } => {
            print!(
                "{}",
                pyfmt_oracle::diff::render_diff(expected.as_bytes(), actual.as_bytes())
            );
        }
    }

    Ok(())
}

/// Environment configuration with the shared CLI overrides applied.
fn configure(sides: &Sides) -> OracleConfig {
    let mut config = oracle_config().clone();
    if let Some(path) = &sides.bridge_lib {
        config.bridge_lib = Some(path.clone());
    }
    if let Some(python) = &sides.python {
        config.python = python.clone();
    }
    config
}

fn parse_entries(names: &[String]) -> Result<Vec<EntryPoint>, String> {
    if names.is_empty() {
        return Ok(EntryPoint::ALL.to_vec());
    }
    names
        .iter()
        .map(|name| {
            EntryPoint::from_str_loose(name).ok_or_else(|| {
                format!("Unsupported entry point '{name}', expected no_args|int|float|double|string")
            })
        })
        .collect()
}
