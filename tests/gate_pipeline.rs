//! Raw backend payload through normalization and gate evaluation.

use serde_json::json;

use gatecheck::config::GateConfig;
use gatecheck::findings::BackendMode;
use gatecheck::gate::{self, GateStatus, PreflightDecision};
use gatecheck::normalize;
use gatecheck::report;

#[test]
fn clean_payload_passes_all_gates() {
    // 19 minors: index 38 under the limit of 50, ratio 0, and total
    // below the warning band of the total-findings gate
    let findings: Vec<_> = (0..19)
        .map(|i| json!({"rule": "lint", "severity": "warning", "message": format!("m{}", i), "file": "a.rs", "line": i}))
        .collect();
    let raw = json!({ "findings": findings });

    let result = normalize::normalize(&raw, BackendMode::Binary, "a.rs");
    let report = gate::evaluate(&result, &GateConfig::default());

    assert_eq!(report.metrics.weighted_index, 38);
    assert_eq!(report.overall, GateStatus::Passed);
    assert!(report.gates.iter().all(|g| g.status == GateStatus::Passed));
    assert_eq!(gate::preflight(&report), PreflightDecision::Proceed);
}

#[test]
fn single_critical_fails_regardless_of_everything_else() {
    // one critical finding forces overall failure
    let raw = json!({
        "findings": [
            {"rule": "bug", "severity": "critical", "message": "use after free", "file": "a.c", "line": 9}
        ]
    });

    let result = normalize::normalize(&raw, BackendMode::Service, "a.c");
    let report = gate::evaluate(&result, &GateConfig::default());

    assert_eq!(report.gates[0].name, "critical-issues");
    assert_eq!(report.gates[0].status, GateStatus::Failed);
    assert_eq!(report.overall, GateStatus::Failed);
    assert_eq!(gate::preflight(&report), PreflightDecision::Block);
}

#[test]
fn markdown_report_carries_thresholds_and_actuals() {
    let raw = json!({
        "findings": [
            {"rule": "banned-api", "severity": "medium", "message": "forbidden call", "file": "a.rs", "line": 1}
        ]
    });

    let result = normalize::normalize(&raw, BackendMode::Binary, "a.rs");
    let report = gate::evaluate(&result, &GateConfig::default());
    let md = report::gate_report_markdown(&report);

    // compliance marker present, so the conditional gate ran and failed
    assert_eq!(report.overall, GateStatus::Failed);
    assert!(md.contains("| domain-compliance | ✗ failed |"));
    assert!(md.contains("## Metrics"));
    assert!(md.contains("## Gates"));
    // weighted-index row shows its threshold and actual value
    assert!(md.contains("| weighted-index | ✓ passed |"));
    assert!(md.contains("| 50 | 2 |"));
}

#[test]
fn warning_band_yields_proceed_with_warning() {
    // 2 majors among 9 findings: ratio 0.22 sits in the 0.20..0.25
    // warning band while index (2*5 + 7*2 = 24) and total (9) pass.
    let mut findings = vec![
        json!({"rule": "bug", "severity": "error", "message": "m1", "file": "a.rs", "line": 1}),
        json!({"rule": "bug", "severity": "error", "message": "m2", "file": "a.rs", "line": 2}),
    ];
    for i in 0..7 {
        findings.push(json!({"rule": "lint", "severity": "warning", "message": format!("n{}", i), "file": "a.rs", "line": i}));
    }
    let raw = json!({ "findings": findings });

    let result = normalize::normalize(&raw, BackendMode::Binary, "a.rs");
    let report = gate::evaluate(&result, &GateConfig::default());

    let ratio_gate = report
        .gates
        .iter()
        .find(|g| g.name == "high-severity-ratio")
        .unwrap();
    assert_eq!(ratio_gate.status, GateStatus::Warning);
    assert_eq!(report.overall, GateStatus::Warning);
    assert_eq!(gate::preflight(&report), PreflightDecision::ProceedWithWarning);
}
