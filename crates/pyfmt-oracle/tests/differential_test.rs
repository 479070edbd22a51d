//! Integration test: live differential run.
//!
//! Validates that:
//! 1. The fixed scenario table passes against the configured subject.
//! 2. Every entry point passes the differential and idempotence properties
//!    with the configured case volume and seed, and the full report passes.
//!
//! Skips unless PYFMT_BRIDGE_LIB names an existing subject artifact and the
//! reference interpreter spawns.
//!
//! Run: PYFMT_BRIDGE_LIB=/path/libpyfmt.so cargo test -p pyfmt-oracle --test differential_test

use pyfmt_bridge::{Bridge, EntryPoint};
use pyfmt_oracle::config::oracle_config;
use pyfmt_oracle::report::SubjectArtifact;
use pyfmt_oracle::scenarios::{scenario_table, verify_scenarios};
use pyfmt_oracle::{PropertyRunner, PythonReference};

fn live_sides() -> Option<(&'static Bridge, PythonReference)> {
    let config = oracle_config();
    let Some(path) = config.bridge_lib.as_deref().filter(|p| p.exists()) else {
        eprintln!("skipping: PYFMT_BRIDGE_LIB does not name an existing subject");
        return None;
    };
    let bridge = Bridge::global(Some(path)).expect("subject loads");
    match PythonReference::spawn(&config.python) {
        Ok(reference) => Some((bridge, reference)),
        Err(err) => {
            eprintln!("skipping: {err}");
            None
        }
    }
}

#[test]
fn fixed_scenarios_pass() {
    let Some((bridge, reference)) = live_sides() else {
        return;
    };
    let summary = verify_scenarios(&scenario_table(), &reference, bridge).expect("table runs");
    assert!(
        summary.all_passed(),
        "{}",
        summary.to_markdown("pyfmt Fixed Scenarios")
    );
}

#[test]
fn every_entry_point_conforms() {
    let Some((bridge, reference)) = live_sides() else {
        return;
    };
    let config = oracle_config();
    let runner = PropertyRunner::new(&reference, bridge, config);
    let mut report = runner
        .conformance_report(
            "pyfmt Conformance Report",
            reference.program(),
            &EntryPoint::ALL,
            &scenario_table(),
        )
        .expect("run completes");
    report.subject = SubjectArtifact::fingerprint(bridge.artifact_path()).ok();
    assert!(report.all_passed(), "{}", report.to_markdown());
}
