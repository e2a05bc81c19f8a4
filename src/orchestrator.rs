//! Backend orchestration: cache-first lookup, ordered fallback across
//! channels, normalization, and health bookkeeping.
//!
//! Candidates are tried strictly in sequence: the next one starts
//! only after the previous definitively failed or timed out. The
//! richest channel wins when it is up and worst-case latency is
//! bounded by the sum of candidate timeouts. Shared mutable state
//! (cache, health record, event log) is owned here and only exposed
//! as read-only snapshots.

use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

use crate::artifact::Artifact;
use crate::backend::{self, AnalyzeRequest, BackendError, ServiceChannel};
use crate::cache::{AnalysisKind, ModificationTracker, ResultCache};
use crate::config::Config;
use crate::findings::{AnalysisResult, BackendMode, WorkspaceResult};
use crate::gate::QualityMetrics;
use crate::normalize;
use crate::probe::{AnalyzerAvailability, Prober};

/// Terminal orchestration errors. Per-candidate failures never appear
/// here; only total exhaustion (with degraded fallback disabled) does.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("no analysis backend available: {}", reasons.join("; "))]
    Exhausted { reasons: Vec<String> },
    #[error("cannot read artifact: {0}")]
    Artifact(#[from] std::io::Error),
}

/// One invocable backend candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub mode: BackendMode,
    pub endpoint: String,
}

/// Process-wide backend health, mutated only by the orchestrator.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BackendHealth {
    pub active: Option<BackendMode>,
    pub service_state: Option<String>,
    pub binary_reachable: bool,
    pub script_reachable: bool,
    pub last_error: Option<String>,
}

/// Emitted after every completed analysis.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisEvent {
    pub path: String,
    pub channel: BackendMode,
    pub from_cache: bool,
    pub findings: usize,
}

/// Result of one orchestrated analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub channel: BackendMode,
    pub from_cache: bool,
}

/// Cap on the retained event log.
const EVENT_LOG_CAP: usize = 100;

/// The orchestration service. Construct once at process start, call
/// [`Orchestrator::shutdown`] before exit to flush the cache.
pub struct Orchestrator {
    config: Config,
    prober: Prober,
    cache: Arc<ResultCache>,
    tracker: ModificationTracker,
    service: ServiceChannel,
    health: RwLock<BackendHealth>,
    events: RwLock<Vec<AnalysisEvent>>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let prober = Prober::new(&config.timeouts);
        let cache = Arc::new(ResultCache::new(&config.cache));
        let service = ServiceChannel::new(config.service.clone());
        Self {
            config,
            prober,
            cache,
            tracker: ModificationTracker::new(),
            service,
            health: RwLock::new(BackendHealth::default()),
            events: RwLock::new(Vec::new()),
        }
    }

    /// Shared handle to the result cache, e.g. for spawning the sweep.
    pub fn cache(&self) -> Arc<ResultCache> {
        Arc::clone(&self.cache)
    }

    pub fn tracker(&self) -> &ModificationTracker {
        &self.tracker
    }

    /// Read-only snapshot of backend health.
    pub fn health(&self) -> BackendHealth {
        self.health.read().map(|h| h.clone()).unwrap_or_default()
    }

    /// Read-only snapshot of recent analysis events, oldest first.
    pub fn recent_events(&self) -> Vec<AnalysisEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// Flush durable state. Call once at process end.
    pub fn shutdown(&self) {
        self.cache.flush();
    }

    /// Force the next probe to re-run and reset health.
    pub async fn reprobe(&self) {
        self.prober.reset();
        if let Ok(mut health) = self.health.write() {
            *health = BackendHealth::default();
        }
        let _ = self.prober.probe().await;
    }

    /// Current backend availability (cached within the probe TTL).
    pub async fn availability(&self) -> AnalyzerAvailability {
        self.prober.probe().await
    }

    /// Analyze a single artifact: cache first, then the fallback
    /// sequence, then (if allowed) the degraded local analysis.
    pub async fn analyze_file<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<AnalysisOutcome, OrchestratorError> {
        let path = path.as_ref();
        let artifact = Artifact::from_file(path)?;
        let use_cache = !self.config.cache.bypass;

        if use_cache {
            if let Some(result) =
                self.cache
                    .get(&artifact.path, AnalysisKind::File, &artifact.content_hash)
            {
                self.tracker.mark_consumed(&artifact.path);
                self.record_event(&artifact.path, BackendMode::None, true, result.summary.total);
                return Ok(AnalysisOutcome {
                    result,
                    channel: BackendMode::None,
                    from_cache: true,
                });
            }
        }

        let candidates = self.build_candidates().await;
        let request = AnalyzeRequest::from_config(&artifact.path, &self.config);
        let process_timeout = Duration::from_millis(self.config.timeouts.process_ms);
        let wall_clock = Duration::from_millis(self.config.timeouts.wall_clock_ms);

        let attempt = try_candidates(&candidates, |candidate| {
            let request = request.clone();
            async move {
                let invocation = self.invoke(candidate, &request, process_timeout);
                match tokio::time::timeout(wall_clock, invocation).await {
                    Ok(result) => result,
                    Err(_) => Err(BackendError::Timeout(wall_clock)),
                }
            }
        })
        .await;

        match attempt {
            Ok((raw, mode)) => {
                let result = normalize::normalize(&raw, mode, &artifact.path);
                if use_cache {
                    self.cache.set(
                        &artifact.path,
                        AnalysisKind::File,
                        result.clone(),
                        &artifact.content_hash,
                    );
                }
                self.tracker.mark_consumed(&artifact.path);
                self.mark_success(mode);
                self.record_event(&artifact.path, mode, false, result.summary.total);
                Ok(AnalysisOutcome {
                    result,
                    channel: mode,
                    from_cache: false,
                })
            }
            Err(reasons) => self.degrade(path, &artifact, reasons),
        }
    }

    /// Analyze every matching file under a root and aggregate.
    pub async fn analyze_workspace<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Result<WorkspaceResult, OrchestratorError> {
        let files = collect_files(root.as_ref(), &self.config)?;

        let mut workspace = WorkspaceResult::default();
        let mut score_sum = 0.0;

        for file in &files {
            let path_str = file.to_string_lossy().to_string();

            // Unchanged artifacts with a valid cache entry are served
            // without touching a backend.
            if !self.config.cache.bypass && !self.tracker.is_dirty(&path_str) {
                if let Ok(artifact) = Artifact::from_file(file) {
                    if let Some(result) =
                        self.cache
                            .get(&artifact.path, AnalysisKind::File, &artifact.content_hash)
                    {
                        score_sum += QualityMetrics::from_result(&result).quality_score;
                        workspace.total_findings += result.summary.total;
                        workspace.files.push((path_str, result));
                        workspace.files_skipped += 1;
                        continue;
                    }
                }
            }

            let outcome = self.analyze_file(file).await?;
            score_sum += QualityMetrics::from_result(&outcome.result).quality_score;
            workspace.total_findings += outcome.result.summary.total;
            workspace.files.push((path_str, outcome.result));
            workspace.files_analyzed += 1;
        }

        let counted = workspace.files.len();
        workspace.average_quality_score = if counted == 0 {
            100.0
        } else {
            score_sum / counted as f64
        };
        Ok(workspace)
    }

    /// Candidate order: service first (only when enabled and
    /// connected), then whichever process channel the prober resolved.
    async fn build_candidates(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        if self.service.enabled() {
            let probe_timeout = Duration::from_millis(self.config.timeouts.probe_ms);
            let state = self.service.ensure_connected(probe_timeout).await;
            if let Ok(mut health) = self.health.write() {
                health.service_state = Some(state.as_str().to_string());
            }
            if state == backend::ChannelState::Connected {
                candidates.push(Candidate {
                    mode: BackendMode::Service,
                    endpoint: self.config.service.endpoint.clone(),
                });
            }
        }

        let availability = self.prober.probe().await;
        if let Some(endpoint) = availability.endpoint {
            candidates.push(Candidate {
                mode: availability.mode,
                endpoint,
            });
        }

        candidates
    }

    async fn invoke(
        &self,
        candidate: &Candidate,
        request: &AnalyzeRequest,
        timeout: Duration,
    ) -> Result<Value, BackendError> {
        match candidate.mode {
            BackendMode::Service => self.service.analyze(request, timeout).await,
            BackendMode::Binary => backend::binary::analyze(&candidate.endpoint, request, timeout).await,
            BackendMode::ScriptEntry => {
                let interpreter = backend::scripting::interpreter_from_endpoint(&candidate.endpoint);
                backend::scripting::analyze(interpreter, request, timeout).await
            }
            BackendMode::Degraded | BackendMode::None => Err(BackendError::NotConnected),
        }
    }

    /// All candidates exhausted. Either degrade locally or surface a
    /// terminal error carrying every collected reason.
    fn degrade(
        &self,
        path: &Path,
        artifact: &Artifact,
        reasons: Vec<String>,
    ) -> Result<AnalysisOutcome, OrchestratorError> {
        if let Ok(mut health) = self.health.write() {
            health.last_error = reasons.last().cloned();
        }

        if !self.config.allow_degraded {
            return Err(OrchestratorError::Exhausted { reasons });
        }

        let raw = backend::degraded::analyze(path)?;
        let result = normalize::normalize(&raw, BackendMode::Degraded, &artifact.path);
        // Degraded results are not cached: a recovered backend should
        // win the next request, not a stale heuristic.
        self.mark_success(BackendMode::Degraded);
        self.record_event(&artifact.path, BackendMode::Degraded, false, result.summary.total);
        Ok(AnalysisOutcome {
            result,
            channel: BackendMode::Degraded,
            from_cache: false,
        })
    }

    fn mark_success(&self, mode: BackendMode) {
        if let Ok(mut health) = self.health.write() {
            health.active = Some(mode);
            match mode {
                BackendMode::Binary => health.binary_reachable = true,
                BackendMode::ScriptEntry => health.script_reachable = true,
                _ => {}
            }
            if mode != BackendMode::Degraded {
                health.last_error = None;
            }
        }
    }

    fn record_event(&self, path: &str, channel: BackendMode, from_cache: bool, findings: usize) {
        if let Ok(mut events) = self.events.write() {
            if events.len() >= EVENT_LOG_CAP {
                events.remove(0);
            }
            events.push(AnalysisEvent {
                path: path.to_string(),
                channel,
                from_cache,
                findings,
            });
        }
    }
}

/// Try candidates in order until one succeeds. Returns the raw result
/// and the winning mode, or one tagged reason per failed candidate.
async fn try_candidates<'a, F, Fut>(
    candidates: &'a [Candidate],
    mut invoke: F,
) -> Result<(Value, BackendMode), Vec<String>>
where
    F: FnMut(&'a Candidate) -> Fut,
    Fut: std::future::Future<Output = Result<Value, BackendError>>,
{
    let mut reasons = Vec::new();

    for candidate in candidates {
        match invoke(candidate).await {
            Ok(raw) => return Ok((raw, candidate.mode)),
            Err(e) => reasons.push(format!("{}: {}", candidate.mode, e)),
        }
    }

    if reasons.is_empty() {
        reasons.push("no backend candidates available".to_string());
    }
    Err(reasons)
}

/// Walk a workspace collecting analyzable files, honoring the
/// configured include/exclude globs.
fn collect_files(root: &Path, config: &Config) -> std::io::Result<Vec<std::path::PathBuf>> {
    use globset::{Glob, GlobSet, GlobSetBuilder};

    const SUPPORTED_EXTENSIONS: &[&str] = &[
        "go", "rs", "py", "js", "ts", "jsx", "tsx", "java", "kt", "c", "cpp", "h", "hpp",
    ];

    fn build_set(patterns: &[String]) -> Option<GlobSet> {
        if patterns.is_empty() {
            return None;
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
        builder.build().ok()
    }

    let include = build_set(&config.include);
    let exclude = build_set(&config.exclude);

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir()
                && (name.starts_with('.')
                    || name == "vendor"
                    || name == "node_modules"
                    || name == "target"
                    || name == "__pycache__")
            {
                return false;
            }
            true
        })
    {
        let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !SUPPORTED_EXTENSIONS.contains(&ext) {
            continue;
        }

        let path_str = path.to_string_lossy();
        if let Some(include) = &include {
            if !include.is_match(&*path_str) {
                continue;
            }
        }
        if let Some(exclude) = &exclude {
            if exclude.is_match(&*path_str) {
                continue;
            }
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}
