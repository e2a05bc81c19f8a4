//! Quality-gate evaluation over normalized analysis results.
//!
//! Computes severity-weighted metrics and runs a fixed, ordered gate
//! list. The overall verdict is the worst individual gate status, so
//! adding findings can only move a report toward `Failed`.

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;
use crate::findings::{AnalysisResult, Severity};

/// Verdict of one gate, ordered best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    Passed,
    Warning,
    Failed,
}

impl GateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStatus::Passed => "passed",
            GateStatus::Warning => "warning",
            GateStatus::Failed => "failed",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            GateStatus::Passed => "✓",
            GateStatus::Warning => "⚠",
            GateStatus::Failed => "✗",
        }
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Verdict of one named gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityGateResult {
    pub name: String,
    pub status: GateStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
}

/// Derived metrics a gate run is based on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
    pub info: usize,
    pub total: usize,
    /// Sum of severity weights over all findings.
    pub weighted_index: u32,
    /// 100 - min(weighted_index, 100).
    pub quality_score: f64,
}

impl QualityMetrics {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let mut metrics = QualityMetrics::default();
        for finding in &result.findings {
            match finding.severity {
                Severity::Critical => metrics.critical += 1,
                Severity::Major => metrics.major += 1,
                Severity::Minor => metrics.minor += 1,
                Severity::Info => metrics.info += 1,
            }
            metrics.weighted_index += finding.severity.weight();
        }
        metrics.total = result.findings.len();
        metrics.quality_score = 100.0 - (metrics.weighted_index.min(100) as f64);
        metrics
    }
}

/// Full gate run: metrics, per-gate verdicts, worst-of overall status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateReport {
    pub overall: GateStatus,
    pub metrics: QualityMetrics,
    pub gates: Vec<QualityGateResult>,
}

impl GateReport {
    pub fn passed(&self) -> bool {
        self.overall != GateStatus::Failed
    }
}

/// What a downstream workflow step should do with a gate report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightDecision {
    Proceed,
    ProceedWithWarning,
    Block,
}

/// Pre-action check: whether a subsequent workflow step may run.
pub fn preflight(report: &GateReport) -> PreflightDecision {
    match report.overall {
        GateStatus::Passed => PreflightDecision::Proceed,
        GateStatus::Warning => PreflightDecision::ProceedWithWarning,
        GateStatus::Failed => PreflightDecision::Block,
    }
}

/// Evaluate the fixed gate list against a result.
pub fn evaluate(result: &AnalysisResult, config: &GateConfig) -> GateReport {
    let metrics = QualityMetrics::from_result(result);
    let mut gates = Vec::with_capacity(5);

    gates.push(critical_issues_gate(&metrics));
    gates.push(weighted_index_gate(&metrics, config.weighted_index_limit));
    gates.push(high_severity_ratio_gate(&metrics, config.high_severity_ratio));
    gates.push(total_findings_gate(&metrics, config.total_low, config.total_high));

    // Conditional: only when domain-violation markers are present.
    let compliance_count = result
        .findings
        .iter()
        .filter(|f| f.kind.is_compliance())
        .count();
    if compliance_count > 0 {
        gates.push(domain_compliance_gate(compliance_count, metrics.critical));
    }

    let overall = gates
        .iter()
        .map(|g| g.status)
        .max()
        .unwrap_or(GateStatus::Passed);

    GateReport {
        overall,
        metrics,
        gates,
    }
}

fn critical_issues_gate(metrics: &QualityMetrics) -> QualityGateResult {
    let status = if metrics.critical > 0 {
        GateStatus::Failed
    } else {
        GateStatus::Passed
    };
    QualityGateResult {
        name: "critical-issues".to_string(),
        status,
        message: match status {
            GateStatus::Failed => format!("{} critical finding(s) present", metrics.critical),
            _ => "no critical findings".to_string(),
        },
        threshold: Some(0.0),
        actual: Some(metrics.critical as f64),
    }
}

fn weighted_index_gate(metrics: &QualityMetrics, limit: f64) -> QualityGateResult {
    let index = metrics.weighted_index as f64;
    let status = if index < limit {
        GateStatus::Passed
    } else if index < limit * 1.5 {
        GateStatus::Warning
    } else {
        GateStatus::Failed
    };
    QualityGateResult {
        name: "weighted-index".to_string(),
        status,
        message: format!("weighted severity index {} (limit {})", index, limit),
        threshold: Some(limit),
        actual: Some(index),
    }
}

fn high_severity_ratio_gate(metrics: &QualityMetrics, limit: f64) -> QualityGateResult {
    let ratio = if metrics.total == 0 {
        0.0
    } else {
        (metrics.critical + metrics.major) as f64 / metrics.total as f64
    };
    let status = if ratio < limit {
        GateStatus::Passed
    } else if ratio < limit * 1.25 {
        GateStatus::Warning
    } else {
        GateStatus::Failed
    };
    QualityGateResult {
        name: "high-severity-ratio".to_string(),
        status,
        message: format!(
            "{:.0}% of findings are critical or major (limit {:.0}%)",
            ratio * 100.0,
            limit * 100.0
        ),
        threshold: Some(limit),
        actual: Some(ratio),
    }
}

fn total_findings_gate(metrics: &QualityMetrics, low: usize, high: usize) -> QualityGateResult {
    let status = if metrics.total < low {
        GateStatus::Passed
    } else if metrics.total < high {
        GateStatus::Warning
    } else {
        GateStatus::Failed
    };
    QualityGateResult {
        name: "total-findings".to_string(),
        status,
        message: format!("{} finding(s) (warn at {}, fail at {})", metrics.total, low, high),
        threshold: Some(low as f64),
        actual: Some(metrics.total as f64),
    }
}

fn domain_compliance_gate(violations: usize, critical: usize) -> QualityGateResult {
    // Active only when violation markers exist, so any activation with
    // violations or critical findings fails.
    let status = if violations > 0 || critical > 0 {
        GateStatus::Failed
    } else {
        GateStatus::Passed
    };
    QualityGateResult {
        name: "domain-compliance".to_string(),
        status,
        message: format!("{} compliance violation(s)", violations),
        threshold: Some(0.0),
        actual: Some(violations as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{BackendMode, Finding, FindingKind};

    fn finding(severity: Severity, kind: FindingKind) -> Finding {
        Finding {
            id: "t".to_string(),
            kind,
            severity,
            message: "test".to_string(),
            file: "a.rs".to_string(),
            line: 1,
            column: None,
            suggestion: None,
            origin: BackendMode::Binary,
        }
    }

    fn result_of(findings: Vec<Finding>) -> AnalysisResult {
        AnalysisResult::new(findings)
    }

    #[test]
    fn test_metrics_weighted_index() {
        let result = result_of(vec![
            finding(Severity::Critical, FindingKind::Correctness), // 10
            finding(Severity::Major, FindingKind::Security),       // 5
            finding(Severity::Minor, FindingKind::Style),          // 2
            finding(Severity::Info, FindingKind::General),         // 1
        ]);
        let metrics = QualityMetrics::from_result(&result);
        assert_eq!(metrics.weighted_index, 18);
        assert_eq!(metrics.quality_score, 82.0);
    }

    #[test]
    fn test_clean_result_passes_all_gates() {
        // no criticals, index below the limit
        let result = result_of(vec![
            finding(Severity::Major, FindingKind::Correctness); 8 // index 40
        ]);
        let config = GateConfig::default();
        let report = evaluate(&result, &config);

        assert_eq!(report.metrics.weighted_index, 40);
        // ratio gate fails here (all findings are major), so build the
        // clean case explicitly instead
        let clean = result_of(vec![
            finding(Severity::Info, FindingKind::Style),
            finding(Severity::Info, FindingKind::Style),
        ]);
        let report = evaluate(&clean, &config);
        assert_eq!(report.overall, GateStatus::Passed);
        assert!(report.gates.iter().all(|g| g.status == GateStatus::Passed));
    }

    #[test]
    fn test_single_critical_fails_overall() {
        // one critical fails the critical gate and the overall
        // verdict regardless of everything else
        let result = result_of(vec![finding(Severity::Critical, FindingKind::Correctness)]);
        let report = evaluate(&result, &GateConfig::default());

        let critical_gate = &report.gates[0];
        assert_eq!(critical_gate.name, "critical-issues");
        assert_eq!(critical_gate.status, GateStatus::Failed);
        assert_eq!(report.overall, GateStatus::Failed);
        assert_eq!(preflight(&report), PreflightDecision::Block);
    }

    #[test]
    fn test_weighted_index_bands() {
        let config = GateConfig::default(); // limit 50
        // 9 majors = 45 -> passed
        let report = evaluate(&result_of(vec![finding(Severity::Major, FindingKind::General); 9]), &config);
        assert_eq!(report.gates[1].status, GateStatus::Passed);
        // 12 majors = 60 -> warning (50..75)
        let report = evaluate(&result_of(vec![finding(Severity::Major, FindingKind::General); 12]), &config);
        assert_eq!(report.gates[1].status, GateStatus::Warning);
        // 16 majors = 80 -> failed
        let report = evaluate(&result_of(vec![finding(Severity::Major, FindingKind::General); 16]), &config);
        assert_eq!(report.gates[1].status, GateStatus::Failed);
    }

    #[test]
    fn test_ratio_gate_zero_findings_passes() {
        let report = evaluate(&result_of(vec![]), &GateConfig::default());
        assert_eq!(report.overall, GateStatus::Passed);
    }

    #[test]
    fn test_total_findings_bands() {
        let config = GateConfig::default(); // warn 20, fail 50
        let report = evaluate(
            &result_of(vec![finding(Severity::Info, FindingKind::Style); 19]),
            &config,
        );
        assert_eq!(report.gates[3].status, GateStatus::Passed);

        let report = evaluate(
            &result_of(vec![finding(Severity::Info, FindingKind::Style); 25]),
            &config,
        );
        assert_eq!(report.gates[3].status, GateStatus::Warning);

        let report = evaluate(
            &result_of(vec![finding(Severity::Info, FindingKind::Style); 50]),
            &config,
        );
        assert_eq!(report.gates[3].status, GateStatus::Failed);
    }

    #[test]
    fn test_compliance_gate_conditional() {
        let config = GateConfig::default();

        // absent without compliance findings
        let report = evaluate(&result_of(vec![finding(Severity::Info, FindingKind::Style)]), &config);
        assert!(report.gates.iter().all(|g| g.name != "domain-compliance"));

        // present and failed when markers exist
        let report = evaluate(
            &result_of(vec![finding(Severity::Minor, FindingKind::Compliance)]),
            &config,
        );
        let gate = report.gates.iter().find(|g| g.name == "domain-compliance").unwrap();
        assert_eq!(gate.status, GateStatus::Failed);
        assert_eq!(report.overall, GateStatus::Failed);
    }

    #[test]
    fn test_overall_monotonic_in_criticals() {
        let config = GateConfig::default();
        let base = vec![finding(Severity::Info, FindingKind::Style); 3];
        let before = evaluate(&result_of(base.clone()), &config);

        let mut worse = base;
        worse.push(finding(Severity::Critical, FindingKind::Correctness));
        let after = evaluate(&result_of(worse), &config);

        // adding a critical can only move the verdict toward failed
        assert!(after.overall >= before.overall);
        assert_eq!(after.overall, GateStatus::Failed);
    }
}
