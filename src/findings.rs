//! Canonical finding model shared by every backend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity levels for findings.
///
/// The set is closed and total: normalization lowers anything it does
/// not recognize to `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Major,
        Severity::Minor,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
            Severity::Info => "info",
        }
    }

    /// Weight used by the quality-gate weighted index.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::Major => 5,
            Severity::Minor => 2,
            Severity::Info => 1,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "major" => Ok(Severity::Major),
            "minor" => Ok(Severity::Minor),
            "info" => Ok(Severity::Info),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Canonical finding categories.
///
/// Backend-specific rule identifiers are folded into these buckets by
/// the normalizer; anything unrecognized lands in `General` rather
/// than being dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Correctness,
    Security,
    Performance,
    Style,
    Complexity,
    Compliance,
    General,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Correctness => "correctness",
            FindingKind::Security => "security",
            FindingKind::Performance => "performance",
            FindingKind::Style => "style",
            FindingKind::Complexity => "complexity",
            FindingKind::Compliance => "compliance",
            FindingKind::General => "general",
        }
    }

    /// Compliance findings are the domain-violation markers that
    /// activate the conditional compliance gate.
    pub fn is_compliance(&self) -> bool {
        matches!(self, FindingKind::Compliance)
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The channel a result was obtained through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Service,
    Binary,
    #[serde(rename = "script-entry")]
    ScriptEntry,
    Degraded,
    None,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Service => "service",
            BackendMode::Binary => "binary",
            BackendMode::ScriptEntry => "script-entry",
            BackendMode::Degraded => "degraded",
            BackendMode::None => "none",
        }
    }
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One normalized unit of analysis output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub kind: FindingKind,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub origin: BackendMode,
}

impl Finding {
    /// Stable key for deduplication across re-runs (line numbers shift).
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.kind, self.file, self.message)
    }
}

/// Per-severity counts for a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingSummary {
    pub total: usize,
    pub by_severity: HashMap<String, usize>,
    /// Raw entries the normalizer had to skip as malformed.
    #[serde(default)]
    pub skipped: usize,
}

impl FindingSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut by_severity = HashMap::new();
        for f in findings {
            *by_severity.entry(f.severity.as_str().to_string()).or_insert(0) += 1;
        }
        Self {
            total: findings.len(),
            by_severity,
            skipped: 0,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(severity.as_str()).copied().unwrap_or(0)
    }
}

/// Normalized result of analyzing one artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub findings: Vec<Finding>,
    pub summary: FindingSummary,
    /// Extended backend-specific metrics, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<serde_json::Value>,
}

impl AnalysisResult {
    pub fn new(findings: Vec<Finding>) -> Self {
        let summary = FindingSummary::from_findings(&findings);
        Self {
            findings,
            summary,
            metrics: None,
        }
    }

    pub fn has_critical(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity == Severity::Critical)
    }
}

/// Aggregate result of a workspace run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceResult {
    /// Per-file results keyed by path, in walk order.
    pub files: Vec<(String, AnalysisResult)>,
    pub files_analyzed: usize,
    pub files_skipped: usize,
    pub total_findings: usize,
    /// Quality score averaged across analyzed files (0-100).
    pub average_quality_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_weights() {
        assert_eq!(Severity::Critical.weight(), 10);
        assert_eq!(Severity::Major.weight(), 5);
        assert_eq!(Severity::Minor.weight(), 2);
        assert_eq!(Severity::Info.weight(), 1);
    }

    #[test]
    fn test_severity_round_trip() {
        for s in Severity::ALL {
            assert_eq!(s.as_str().parse::<Severity>().unwrap(), s);
        }
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_summary_counts() {
        let findings = vec![
            make(Severity::Critical),
            make(Severity::Minor),
            make(Severity::Minor),
        ];
        let summary = FindingSummary::from_findings(&findings);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.count(Severity::Critical), 1);
        assert_eq!(summary.count(Severity::Minor), 2);
        assert_eq!(summary.count(Severity::Major), 0);
    }

    fn make(severity: Severity) -> Finding {
        Finding {
            id: "f1".to_string(),
            kind: FindingKind::General,
            severity,
            message: "test".to_string(),
            file: "main.rs".to_string(),
            line: 1,
            column: None,
            suggestion: None,
            origin: BackendMode::Binary,
        }
    }
}
