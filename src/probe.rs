//! Backend availability probing.
//!
//! Determines which analysis channels are reachable without ever
//! failing: every unsuccessful attempt appends a human-readable reason
//! and probing continues. Results are cached for a short TTL so
//! repeated requests do not re-spawn probe processes.

use serde::Serialize;
use std::process::Stdio;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::config::TimeoutConfig;
use crate::findings::BackendMode;

/// Well-known analyzer executable names, tried in order.
pub const ENGINE_NAMES: &[&str] = &["gatecheck-engine", "quality-engine"];

/// Python module providing the scripting entry point.
pub const SCRIPT_MODULE: &str = "gatecheck_engine";

/// Python interpreters, tried in order.
const PYTHON_NAMES: &[&str] = &["python3", "python"];

/// Outcome of a probe pass.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerAvailability {
    pub mode: BackendMode,
    /// Resolved executable name or module invocation for the chosen mode.
    pub endpoint: Option<String>,
    /// Unix timestamp (seconds) of the probe.
    pub checked_at: u64,
    /// One reason per failed attempt, in attempt order.
    pub reasons: Vec<String>,
}

impl AnalyzerAvailability {
    pub fn unavailable(reasons: Vec<String>) -> Self {
        Self {
            mode: BackendMode::None,
            endpoint: None,
            checked_at: unix_now(),
            reasons,
        }
    }
}

/// Probes executables and the scripting entry point, caching the
/// result for a TTL.
pub struct Prober {
    probe_timeout: Duration,
    ttl: Duration,
    cached: RwLock<Option<(Instant, AnalyzerAvailability)>>,
}

impl Prober {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        Self {
            probe_timeout: Duration::from_millis(timeouts.probe_ms),
            ttl: Duration::from_secs(timeouts.availability_ttl_secs),
            cached: RwLock::new(None),
        }
    }

    /// Determine availability, serving a cached result while fresh.
    /// Never returns an error; total failure is mode `None` with the
    /// full reason list.
    pub async fn probe(&self) -> AnalyzerAvailability {
        if let Ok(guard) = self.cached.read() {
            if let Some((at, availability)) = guard.as_ref() {
                if at.elapsed() < self.ttl {
                    return availability.clone();
                }
            }
        }

        let availability = self.probe_uncached().await;

        if let Ok(mut guard) = self.cached.write() {
            *guard = Some((Instant::now(), availability.clone()));
        }
        availability
    }

    /// Drop the cached result so the next `probe()` re-runs attempts.
    pub fn reset(&self) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
    }

    async fn probe_uncached(&self) -> AnalyzerAvailability {
        let mut reasons = Vec::new();

        for name in ENGINE_NAMES {
            let executable = platform_executable(name);
            match try_version(&executable, &[], self.probe_timeout).await {
                Ok(()) => {
                    return AnalyzerAvailability {
                        mode: BackendMode::Binary,
                        endpoint: Some(executable),
                        checked_at: unix_now(),
                        reasons,
                    };
                }
                Err(reason) => reasons.push(format!("binary {}: {}", executable, reason)),
            }
        }

        for python in PYTHON_NAMES {
            match try_version(python, &["-m", SCRIPT_MODULE], self.probe_timeout).await {
                Ok(()) => {
                    return AnalyzerAvailability {
                        mode: BackendMode::ScriptEntry,
                        endpoint: Some(format!("{} -m {}", python, SCRIPT_MODULE)),
                        checked_at: unix_now(),
                        reasons,
                    };
                }
                Err(reason) => {
                    reasons.push(format!("script-entry {} -m {}: {}", python, SCRIPT_MODULE, reason))
                }
            }
        }

        AnalyzerAvailability::unavailable(reasons)
    }
}

/// Run `<program> [prefix-args] --version` under the probe timeout.
async fn try_version(program: &str, prefix_args: &[&str], timeout: Duration) -> Result<(), String> {
    let mut command = Command::new(program);
    command
        .args(prefix_args)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(c) => c,
        Err(e) => return Err(format!("failed to spawn: {}", e)),
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Err(_) => Err(format!("version check timed out after {:?}", timeout)),
        Ok(Err(e)) => Err(format!("wait failed: {}", e)),
        Ok(Ok(output)) if output.status.success() => Ok(()),
        Ok(Ok(output)) => Err(format!("exited with {}", output.status)),
    }
}

/// Append the platform executable suffix.
fn platform_executable(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_timeouts() -> TimeoutConfig {
        TimeoutConfig {
            probe_ms: 500,
            process_ms: 1_000,
            wall_clock_ms: 1_500,
            availability_ttl_secs: 30,
        }
    }

    #[tokio::test]
    async fn test_probe_never_fails() {
        // No analyzer is installed in the test environment, so this
        // exercises the total-failure path: mode none, reasons for
        // every attempt, no panic.
        let prober = Prober::new(&test_timeouts());
        let availability = prober.probe().await;

        if availability.mode == BackendMode::None {
            assert!(!availability.reasons.is_empty());
        } else {
            assert!(availability.endpoint.is_some());
        }
    }

    #[tokio::test]
    async fn test_probe_result_cached() {
        let prober = Prober::new(&test_timeouts());
        let first = prober.probe().await;
        let second = prober.probe().await;
        // within the TTL both calls observe the same probe pass
        assert_eq!(first.checked_at, second.checked_at);
        assert_eq!(first.mode, second.mode);
    }

    #[tokio::test]
    async fn test_missing_executable_reason() {
        let err = try_version("definitely-not-a-real-binary-x9", &[], Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.contains("failed to spawn"));
    }

    #[test]
    fn test_platform_executable_suffix() {
        let name = platform_executable("gatecheck-engine");
        if cfg!(windows) {
            assert!(name.ends_with(".exe"));
        } else {
            assert_eq!(name, "gatecheck-engine");
        }
    }
}
