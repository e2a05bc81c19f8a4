//! Best-effort local analysis used when no real backend is reachable.
//!
//! A deliberately shallow heuristic scan: unfinished-work markers and
//! oversized files. It emits the same raw JSON shape as the external
//! backends so its output flows through the normal normalization path,
//! just flagged with the degraded origin.

use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Markers that indicate unfinished work, paired with the severity the
/// raw schema uses for them.
const MARKERS: &[(&str, &str)] = &[
    ("TODO", "info"),
    ("FIXME", "warning"),
    ("XXX", "warning"),
    ("unimplemented!", "warning"),
    ("HACK", "info"),
];

/// Files beyond this many lines get flagged as a maintainability risk.
const OVERSIZED_LINES: usize = 1_000;

/// Produce a degraded raw analysis for one file.
pub fn analyze(path: &Path) -> std::io::Result<Value> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let file_str = path.to_string_lossy().to_string();

    let mut findings = Vec::new();
    let mut line_count = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line.unwrap_or_default();
        line_count = index + 1;

        for (marker, severity) in MARKERS {
            if let Some(pos) = line.find(marker) {
                findings.push(json!({
                    "rule": "general",
                    "severity": severity,
                    "message": format!("unfinished-work marker {:?} found", marker),
                    "file": file_str,
                    "line": index + 1,
                    "column": pos + 1,
                }));
            }
        }
    }

    if line_count > OVERSIZED_LINES {
        findings.push(json!({
            "rule": "complexity",
            "severity": "warning",
            "message": format!("file has {} lines, consider splitting it", line_count),
            "file": file_str,
            "line": 1,
        }));
    }

    Ok(json!({
        "findings": findings,
        "metrics": { "lines": line_count, "degraded": true },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_markers() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("main.rs");
        std::fs::write(&path, "fn main() {}\n// TODO: finish\n// FIXME bug\n").unwrap();

        let raw = analyze(&path).unwrap();
        let findings = raw["findings"].as_array().unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0]["line"], 2);
        assert_eq!(findings[0]["severity"], "info");
        assert_eq!(findings[1]["severity"], "warning");
    }

    #[test]
    fn test_clean_file_has_no_findings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("clean.rs");
        std::fs::write(&path, "fn add(a: i32, b: i32) -> i32 { a + b }\n").unwrap();

        let raw = analyze(&path).unwrap();
        assert!(raw["findings"].as_array().unwrap().is_empty());
        assert_eq!(raw["metrics"]["degraded"], true);
    }

    #[test]
    fn test_oversized_file_flagged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.rs");
        let content = "// line\n".repeat(OVERSIZED_LINES + 1);
        std::fs::write(&path, content).unwrap();

        let raw = analyze(&path).unwrap();
        let findings = raw["findings"].as_array().unwrap();
        assert!(findings
            .iter()
            .any(|f| f["rule"] == "complexity" && f["severity"] == "warning"));
    }
}
