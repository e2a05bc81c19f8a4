//! Normalization of raw backend output into the canonical finding model.
//!
//! Every backend speaks a slightly different schema: findings may live
//! under `findings`, `diagnostics`, or `issues`; severities and rule
//! identifiers use each tool's own vocabulary. This module folds all of
//! them into one shape through two fixed, total lookup tables. A
//! malformed individual entry is skipped and counted, never fatal to
//! the whole result.

use phf::phf_map;
use serde::Deserialize;
use serde_json::Value;

use crate::findings::{AnalysisResult, BackendMode, Finding, FindingKind, FindingSummary, Severity};

/// Severity vocabulary across backends. Total: unknown input lowers to
/// `Info` rather than failing.
static SEVERITY_MAP: phf::Map<&'static str, Severity> = phf_map! {
    "critical" => Severity::Critical,
    "blocker" => Severity::Critical,
    "fatal" => Severity::Critical,
    "high" => Severity::Major,
    "error" => Severity::Major,
    "major" => Severity::Major,
    "medium" => Severity::Minor,
    "warning" => Severity::Minor,
    "warn" => Severity::Minor,
    "minor" => Severity::Minor,
    "low" => Severity::Info,
    "info" => Severity::Info,
    "note" => Severity::Info,
    "hint" => Severity::Info,
};

/// Backend rule identifiers folded into canonical categories.
/// Unrecognized identifiers land in `General`, never dropped.
static KIND_MAP: phf::Map<&'static str, FindingKind> = phf_map! {
    // canonical names map to themselves so normalization is idempotent
    "correctness" => FindingKind::Correctness,
    "security" => FindingKind::Security,
    "performance" => FindingKind::Performance,
    "style" => FindingKind::Style,
    "complexity" => FindingKind::Complexity,
    "compliance" => FindingKind::Compliance,
    "general" => FindingKind::General,
    // common backend vocabularies
    "bug" => FindingKind::Correctness,
    "logic-error" => FindingKind::Correctness,
    "null-deref" => FindingKind::Correctness,
    "type-error" => FindingKind::Correctness,
    "vulnerability" => FindingKind::Security,
    "injection" => FindingKind::Security,
    "unsafe-usage" => FindingKind::Security,
    "hardcoded-secret" => FindingKind::Security,
    "slow-loop" => FindingKind::Performance,
    "allocation" => FindingKind::Performance,
    "perf" => FindingKind::Performance,
    "convention" => FindingKind::Style,
    "naming" => FindingKind::Style,
    "formatting" => FindingKind::Style,
    "lint" => FindingKind::Style,
    "cognitive-complexity" => FindingKind::Complexity,
    "cyclomatic-complexity" => FindingKind::Complexity,
    "nesting-depth" => FindingKind::Complexity,
    "license-violation" => FindingKind::Compliance,
    "policy-violation" => FindingKind::Compliance,
    "banned-api" => FindingKind::Compliance,
    "safety-violation" => FindingKind::Compliance,
};

/// Map a backend severity string to the canonical severity.
pub fn map_severity(raw: &str) -> Severity {
    SEVERITY_MAP
        .get(raw.to_lowercase().as_str())
        .copied()
        .unwrap_or(Severity::Info)
}

/// Map a backend rule/type identifier to a canonical kind.
pub fn map_kind(raw: &str) -> FindingKind {
    KIND_MAP
        .get(raw.to_lowercase().as_str())
        .copied()
        .unwrap_or(FindingKind::General)
}

/// One raw finding as backends emit it. Field names vary per tool, so
/// everything optional beyond the message is defaulted.
#[derive(Debug, Deserialize)]
struct RawFinding {
    #[serde(default, alias = "rule_id", alias = "check")]
    id: Option<String>,
    #[serde(default, alias = "type", alias = "rule", alias = "category")]
    kind: Option<String>,
    #[serde(default, alias = "level")]
    severity: Option<String>,
    #[serde(alias = "description", alias = "text")]
    message: String,
    #[serde(default, alias = "path", alias = "filename")]
    file: Option<String>,
    #[serde(default, alias = "line_number", alias = "start_line")]
    line: Option<usize>,
    #[serde(default, alias = "col")]
    column: Option<usize>,
    #[serde(default, alias = "fix", alias = "remediation")]
    suggestion: Option<String>,
}

/// Keys under which backends nest their finding arrays, tried in order.
const FINDING_KEYS: &[&str] = &["findings", "diagnostics", "issues", "violations", "results"];

/// Normalize a raw backend payload into an [`AnalysisResult`].
///
/// `fallback_file` fills in the file field when a backend omits it
/// (single-file backends usually do). Malformed entries are skipped
/// and surface in `summary.skipped`.
pub fn normalize(raw: &Value, origin: BackendMode, fallback_file: &str) -> AnalysisResult {
    let (entries, metrics) = split_payload(raw);

    let mut findings = Vec::new();
    let mut skipped = 0usize;

    for (index, entry) in entries.iter().enumerate() {
        match normalize_entry(entry, origin, fallback_file, index) {
            Some(f) => findings.push(f),
            None => skipped += 1,
        }
    }

    let mut summary = FindingSummary::from_findings(&findings);
    summary.skipped = skipped;

    AnalysisResult {
        findings,
        summary,
        metrics,
    }
}

/// Locate the finding array and any extended metrics in a raw payload.
fn split_payload(raw: &Value) -> (Vec<Value>, Option<Value>) {
    // A bare array is already the finding list.
    if let Some(arr) = raw.as_array() {
        return (arr.clone(), None);
    }

    if let Some(obj) = raw.as_object() {
        let metrics = obj.get("metrics").cloned();
        for key in FINDING_KEYS {
            if let Some(arr) = obj.get(*key).and_then(Value::as_array) {
                return (arr.clone(), metrics);
            }
        }
        return (Vec::new(), metrics);
    }

    (Vec::new(), None)
}

fn normalize_entry(
    entry: &Value,
    origin: BackendMode,
    fallback_file: &str,
    index: usize,
) -> Option<Finding> {
    let raw: RawFinding = serde_json::from_value(entry.clone()).ok()?;

    let kind = raw.kind.as_deref().map(map_kind).unwrap_or(FindingKind::General);
    let severity = raw.severity.as_deref().map(map_severity).unwrap_or(Severity::Info);

    Some(Finding {
        id: raw.id.unwrap_or_else(|| format!("{}-{}", origin, index)),
        kind,
        severity,
        message: raw.message,
        file: raw
            .file
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| fallback_file.to_string()),
        line: raw.line.unwrap_or(0),
        column: raw.column,
        suggestion: raw.suggestion,
        origin,
    })
}

/// Re-normalize an already-normalized result. Used to assert the
/// idempotence property in tests and when replaying persisted data.
pub fn renormalize(result: &AnalysisResult) -> AnalysisResult {
    let raw = serde_json::to_value(result).unwrap_or(Value::Null);
    let mut out = normalize(&raw, BackendMode::None, "");
    // Origins survive the round trip through the serialized findings.
    for (fresh, old) in out.findings.iter_mut().zip(result.findings.iter()) {
        fresh.origin = old.origin;
        fresh.id = old.id.clone();
    }
    out.summary.skipped = result.summary.skipped;
    out
}
