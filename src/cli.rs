//! Command-line interface for gatecheck.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache;
use crate::config::{self, Config};
use crate::findings::AnalysisResult;
use crate::gate;
use crate::orchestrator::Orchestrator;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Resilient code-analysis client with backend fallback and quality gates.
///
/// Gatecheck obtains analysis results from whichever backend is
/// reachable (an HTTP analysis service, a standalone analyzer
/// executable, or a Python entry point), caches them by content hash,
/// and evaluates quality gates over the normalized findings.
#[derive(Parser)]
#[command(name = "gatecheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a file or workspace through the backend fallback chain
    #[command(visible_alias = "check")]
    Analyze(AnalyzeArgs),
    /// Probe backend availability and print health
    Probe(ProbeArgs),
    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Path to analyze (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty, json, or markdown
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Evaluate quality gates and exit non-zero when they fail
    #[arg(short, long)]
    pub gate: bool,

    /// Bypass the result cache for this run
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the probe command.
#[derive(Parser)]
pub struct ProbeArgs {
    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "gatecheck.yaml")]
    pub output: PathBuf,
}

/// Load configuration, from an explicit path or by discovery. A
/// missing config is not an error: defaults apply.
fn load_config(explicit: &Option<PathBuf>) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(p) => Some(p.clone()),
        None => Config::discover(),
    };

    let config = match path {
        Some(p) => Config::parse_file(&p)?,
        None => Config::default(),
    };
    config::validate(&config)?;
    Ok(config)
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" && args.format != "markdown" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty', 'json', or 'markdown'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let mut config = match load_config(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: invalid config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    if args.no_cache {
        config.cache.bypass = true;
        config.cache.persist = false;
    }

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    let gate_config = config.gates.clone();
    let sweep_interval = Duration::from_secs(config.cache.sweep_interval_secs);
    let cache_bypass = config.cache.bypass;
    let want_gates = args.gate || args.format == "markdown";
    let path_str = args.path.to_string_lossy().to_string();

    let runtime = tokio::runtime::Runtime::new()?;
    let orchestrator = Orchestrator::new(config);
    let _sweeper = (!cache_bypass).then(|| {
        runtime.block_on(async { cache::spawn_sweeper(orchestrator.cache(), sweep_interval) })
    });

    let exit_code = if metadata.is_dir() {
        let spinner = analysis_spinner(&path_str);
        let workspace = runtime.block_on(orchestrator.analyze_workspace(&args.path))?;
        spinner.finish_and_clear();

        // gates evaluate the merged workspace findings
        let merged = merge_results(workspace.files.iter().map(|(_, r)| r));
        let gate_report = want_gates.then(|| gate::evaluate(&merged, &gate_config));

        match args.format.as_str() {
            "json" => report::write_workspace_json(&path_str, &workspace, gate_report.as_ref())?,
            "markdown" => {
                if let Some(r) = &gate_report {
                    print!("{}", report::gate_report_markdown(r));
                }
            }
            _ => report::write_workspace_pretty(&path_str, &workspace, gate_report.as_ref()),
        }
        gate_exit_code(args.gate, gate_report.as_ref())
    } else {
        let outcome = runtime.block_on(orchestrator.analyze_file(&args.path))?;
        let gate_report = want_gates.then(|| gate::evaluate(&outcome.result, &gate_config));

        match args.format.as_str() {
            "json" => report::write_json(
                &path_str,
                outcome.channel,
                outcome.from_cache,
                &outcome.result,
                gate_report.as_ref(),
            )?,
            "markdown" => {
                if let Some(r) = &gate_report {
                    print!("{}", report::gate_report_markdown(r));
                }
            }
            _ => report::write_pretty(
                &path_str,
                outcome.channel,
                outcome.from_cache,
                &outcome.result,
                gate_report.as_ref(),
            ),
        }
        gate_exit_code(args.gate, gate_report.as_ref())
    };

    orchestrator.shutdown();
    Ok(exit_code)
}

/// Run the probe command.
pub fn run_probe(args: &ProbeArgs) -> anyhow::Result<i32> {
    let config = match load_config(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: invalid config: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let orchestrator = Orchestrator::new(config);
    runtime.block_on(orchestrator.reprobe());
    let availability = runtime.block_on(orchestrator.availability());

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&availability)?);
    } else {
        report::write_availability_pretty(&availability, &orchestrator.health());
    }
    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    let config = Config::default();
    let yaml = serde_yaml::to_string(&config)?;
    std::fs::write(&args.output, yaml)?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize thresholds", args.output.display());
    println!("  2. Run: gatecheck analyze . --gate");
    Ok(EXIT_SUCCESS)
}

fn analysis_spinner(path: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("  {spinner} analyzing {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(path.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Merge per-file results for workspace-wide gate evaluation,
/// dropping findings that repeat across files or re-runs.
fn merge_results<'a, I: Iterator<Item = &'a AnalysisResult>>(results: I) -> AnalysisResult {
    let mut seen = std::collections::HashSet::new();
    let findings = results
        .flat_map(|r| r.findings.iter())
        .filter(|f| seen.insert(f.key()))
        .cloned()
        .collect();
    AnalysisResult::new(findings)
}

fn gate_exit_code(gating: bool, report: Option<&gate::GateReport>) -> i32 {
    match report {
        Some(r) if gating && !r.passed() => EXIT_FAILED,
        _ => EXIT_SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{BackendMode, Finding, FindingKind, Severity};
    use tempfile::TempDir;

    #[test]
    fn test_load_config_defaults_when_missing() {
        let config = load_config(&None).unwrap();
        assert_eq!(config.cache.max_entries, 100);
    }

    #[test]
    fn test_load_config_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gc.yaml");
        std::fs::write(&path, "cache:\n  ttl_secs: 7\n").unwrap();

        let config = load_config(&Some(path)).unwrap();
        assert_eq!(config.cache.ttl_secs, 7);
    }

    #[test]
    fn test_merge_results() {
        let a = AnalysisResult::new(vec![finding("a.rs")]);
        let b = AnalysisResult::new(vec![finding("b.rs"), finding("b.rs")]);
        let merged = merge_results([&a, &b].into_iter());
        // the repeated b.rs finding collapses to one
        assert_eq!(merged.summary.total, 2);
    }

    #[test]
    fn test_merge_dedup_survives_line_shifts() {
        // the dedup key ignores line numbers, so the same finding
        // reported at a shifted position still counts once
        let mut f1 = finding("b.rs");
        f1.line = 1;
        let mut f2 = finding("b.rs");
        f2.line = 9;
        let a = AnalysisResult::new(vec![f1]);
        let b = AnalysisResult::new(vec![f2]);

        let merged = merge_results([&a, &b].into_iter());
        assert_eq!(merged.summary.total, 1);
    }

    #[test]
    fn test_gate_exit_code() {
        let failing = gate::evaluate(
            &AnalysisResult::new(vec![critical()]),
            &crate::config::GateConfig::default(),
        );
        assert_eq!(gate_exit_code(true, Some(&failing)), EXIT_FAILED);
        // reporting without --gate never fails the process
        assert_eq!(gate_exit_code(false, Some(&failing)), EXIT_SUCCESS);
        assert_eq!(gate_exit_code(true, None), EXIT_SUCCESS);
    }

    fn finding(file: &str) -> Finding {
        Finding {
            id: "t".to_string(),
            kind: FindingKind::Style,
            severity: Severity::Info,
            message: "m".to_string(),
            file: file.to_string(),
            line: 1,
            column: None,
            suggestion: None,
            origin: BackendMode::Binary,
        }
    }

    fn critical() -> Finding {
        Finding {
            severity: Severity::Critical,
            ..finding("a.rs")
        }
    }
}
