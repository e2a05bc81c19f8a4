//! Output formatting for analysis and gate results.
//!
//! Three formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//! - Markdown: the gate report shape consumed by CI tooling

use colored::*;
use serde::Serialize;

use crate::findings::{AnalysisResult, BackendMode, Finding, Severity, WorkspaceResult};
use crate::gate::{GateReport, GateStatus};
use crate::orchestrator::BackendHealth;
use crate::probe::AnalyzerAvailability;

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON report.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: String,
    pub path: String,
    pub channel: String,
    pub from_cache: bool,
    pub result: &'a AnalysisResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_report: Option<&'a GateReport>,
}

/// Write a single-artifact result as JSON to stdout.
pub fn write_json(
    path: &str,
    channel: BackendMode,
    from_cache: bool,
    result: &AnalysisResult,
    gate_report: Option<&GateReport>,
) -> anyhow::Result<()> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        channel: channel.as_str().to_string(),
        from_cache,
        result,
        gate_report,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Write a workspace result as JSON to stdout.
pub fn write_workspace_json(
    path: &str,
    workspace: &WorkspaceResult,
    gate_report: Option<&GateReport>,
) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct WorkspaceJson<'a> {
        version: String,
        path: String,
        workspace: &'a WorkspaceResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        gate_report: Option<&'a GateReport>,
    }
    let report = WorkspaceJson {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        workspace,
        gate_report,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// =============================================================================
// Markdown gate report
// =============================================================================

/// Render the quality-gate report as Markdown.
pub fn gate_report_markdown(report: &GateReport) -> String {
    let mut out = String::new();

    out.push_str("# Quality Gate Report\n\n");
    out.push_str(&format!(
        "**Overall status:** {} {}\n\n",
        report.overall.icon(),
        report.overall
    ));

    out.push_str("## Metrics\n\n");
    out.push_str(&format!(
        "- Findings: {} total ({} critical, {} major, {} minor, {} info)\n",
        report.metrics.total,
        report.metrics.critical,
        report.metrics.major,
        report.metrics.minor,
        report.metrics.info,
    ));
    out.push_str(&format!(
        "- Weighted severity index: {}\n",
        report.metrics.weighted_index
    ));
    out.push_str(&format!(
        "- Quality score: {:.0}/100\n\n",
        report.metrics.quality_score
    ));

    out.push_str("## Gates\n\n");
    out.push_str("| Gate | Status | Message | Threshold | Actual |\n");
    out.push_str("|------|--------|---------|-----------|--------|\n");
    for gate in &report.gates {
        out.push_str(&format!(
            "| {} | {} {} | {} | {} | {} |\n",
            gate.name,
            gate.status.icon(),
            gate.status,
            gate.message,
            gate.threshold.map(fmt_number).unwrap_or_else(|| "-".to_string()),
            gate.actual.map(fmt_number).unwrap_or_else(|| "-".to_string()),
        ));
    }

    out
}

fn fmt_number(v: f64) -> String {
    if v.fract().abs() < f64::EPSILON {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a single-artifact result for human consumption.
pub fn write_pretty(
    path: &str,
    channel: BackendMode,
    from_cache: bool,
    result: &AnalysisResult,
    gate_report: Option<&GateReport>,
) {
    println!();
    print!("  {}", "gatecheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Analyzing: ".dimmed());
    println!("{}", path);
    print!("  {}", "Channel:   ".dimmed());
    print!("{}", channel);
    if from_cache {
        print!(" {}", "(cached)".dimmed());
    }
    println!();
    println!();

    if result.findings.is_empty() {
        println!("  {}", "No findings.".green());
    } else {
        write_findings(&result.findings);
    }
    if result.summary.skipped > 0 {
        println!(
            "  {}",
            format!("({} malformed entries skipped)", result.summary.skipped).dimmed()
        );
    }
    println!();

    if let Some(report) = gate_report {
        write_gate_summary(report);
        println!();
    }
}

/// Write a workspace summary for human consumption.
pub fn write_workspace_pretty(
    path: &str,
    workspace: &WorkspaceResult,
    gate_report: Option<&GateReport>,
) {
    println!();
    print!("  {}", "gatecheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Workspace: ".dimmed());
    println!("{}", path);
    println!(
        "  {} analyzed, {} unchanged (served from cache), {} findings",
        workspace.files_analyzed, workspace.files_skipped, workspace.total_findings
    );
    println!(
        "  Average quality score: {:.1}/100",
        workspace.average_quality_score
    );
    println!();

    for (file, result) in &workspace.files {
        if result.findings.is_empty() {
            continue;
        }
        println!("  {}", file.blue());
        write_findings(&result.findings);
        println!();
    }

    if let Some(report) = gate_report {
        write_gate_summary(report);
        println!();
    }
}

fn write_findings(findings: &[Finding]) {
    for f in findings {
        write_severity_tag(f.severity);
        print!("   ");
        print!("{:<14}", f.kind.as_str().dimmed());
        print!("{}", f.file.blue());
        if f.line > 0 {
            print!("{}", format!(":{}", f.line).dimmed());
        }
        println!();
        println!("            {}", f.message);
        if let Some(suggestion) = &f.suggestion {
            println!(
                "            {}",
                format!("suggestion: {}", suggestion).dimmed()
            );
        }
    }
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Critical => print!("    {} ", "CRIT ".red().bold()),
        Severity::Major => print!("    {} ", "MAJOR".red()),
        Severity::Minor => print!("    {} ", "MINOR".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

fn write_gate_summary(report: &GateReport) {
    match report.overall {
        GateStatus::Passed => println!("  {}", "✓ GATES PASSED".green()),
        GateStatus::Warning => println!("  {}", "⚠ GATES PASSED WITH WARNINGS".yellow()),
        GateStatus::Failed => println!("  {}", "✗ GATES FAILED".red()),
    }
    for gate in &report.gates {
        let status = match gate.status {
            GateStatus::Passed => gate.status.as_str().green(),
            GateStatus::Warning => gate.status.as_str().yellow(),
            GateStatus::Failed => gate.status.as_str().red(),
        };
        println!(
            "    {:<22} {:<8} {}",
            gate.name,
            status,
            gate.message.dimmed()
        );
    }
}

/// Write probe results for the probe command.
pub fn write_availability_pretty(availability: &AnalyzerAvailability, health: &BackendHealth) {
    println!();
    println!("  {}", "Backend availability".bold());
    match availability.mode {
        BackendMode::None => println!("    mode:     {}", "none".red()),
        mode => println!("    mode:     {}", mode.as_str().green()),
    }
    if let Some(endpoint) = &availability.endpoint {
        println!("    endpoint: {}", endpoint);
    }
    if let Some(state) = &health.service_state {
        println!("    service:  {}", state);
    }
    if !availability.reasons.is_empty() {
        println!("    failed attempts:");
        for reason in &availability.reasons {
            println!("      {}", reason.dimmed());
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::findings::FindingKind;
    use crate::gate;

    fn failing_report() -> GateReport {
        let findings = vec![Finding {
            id: "x".to_string(),
            kind: FindingKind::Correctness,
            severity: Severity::Critical,
            message: "boom".to_string(),
            file: "a.rs".to_string(),
            line: 3,
            column: None,
            suggestion: None,
            origin: BackendMode::Binary,
        }];
        gate::evaluate(&AnalysisResult::new(findings), &GateConfig::default())
    }

    #[test]
    fn test_markdown_report_shape() {
        let md = gate_report_markdown(&failing_report());

        assert!(md.starts_with("# Quality Gate Report"));
        assert!(md.contains("**Overall status:** ✗ failed"));
        assert!(md.contains("| critical-issues | ✗ failed |"));
        assert!(md.contains("| Gate | Status | Message | Threshold | Actual |"));
        assert!(md.contains("Weighted severity index: 10"));
    }

    #[test]
    fn test_markdown_passing_report() {
        let report = gate::evaluate(&AnalysisResult::default(), &GateConfig::default());
        let md = gate_report_markdown(&report);
        assert!(md.contains("**Overall status:** ✓ passed"));
        // the conditional compliance gate must be absent
        assert!(!md.contains("domain-compliance"));
    }

    #[test]
    fn test_fmt_number() {
        assert_eq!(fmt_number(50.0), "50");
        assert_eq!(fmt_number(0.2), "0.20");
    }
}
