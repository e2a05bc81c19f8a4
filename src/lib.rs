//! Gatecheck - resilient code-analysis client with quality gates.
//!
//! Gatecheck never assumes a particular analysis backend is present.
//! It probes the available channels (HTTP service, standalone
//! executable, Python entry point), invokes them in order with
//! bounded timeouts until one succeeds, normalizes whatever schema
//! the winner speaks into one canonical finding model, caches results
//! by content hash, and evaluates threshold-based quality gates over
//! the outcome.
//!
//! # Architecture
//!
//! - `probe`: backend availability probing with a short TTL
//! - `backend`: the interchangeable channels and their call contract
//! - `orchestrator`: cache-first lookup, ordered fallback, health
//! - `cache`: content-addressed result cache + modification tracker
//! - `normalize`: raw backend schemas into the canonical model
//! - `gate`: quality-gate evaluation over normalized findings
//! - `report`: output formatting (pretty, JSON, Markdown)
//! - `config`: YAML configuration surface

pub mod artifact;
pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod findings;
pub mod gate;
pub mod normalize;
pub mod orchestrator;
pub mod probe;
pub mod report;

pub use artifact::Artifact;
pub use cache::{AnalysisKind, ModificationTracker, ResultCache};
pub use config::Config;
pub use findings::{AnalysisResult, BackendMode, Finding, FindingKind, Severity, WorkspaceResult};
pub use gate::{GateReport, GateStatus, PreflightDecision, QualityMetrics};
pub use orchestrator::{AnalysisOutcome, BackendHealth, Orchestrator, OrchestratorError};
pub use probe::{AnalyzerAvailability, Prober};
