//! Backend channels: interchangeable ways of obtaining a raw analysis.
//!
//! Every channel implements the same call contract (analyze a target
//! path under a profile, return raw JSON) and signals failure
//! through [`BackendError`]. Failures are recovered per-candidate by
//! the orchestrator; they only become caller-visible when the whole
//! candidate list is exhausted.

pub mod binary;
pub mod degraded;
pub mod scripting;
pub mod service;

pub use service::{ChannelState, ServiceChannel};

use thiserror::Error;

use crate::config::Config;

/// Errors from invoking one backend candidate.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("exited with {status}: {stderr}")]
    NonZeroExit {
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("malformed output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("service not connected")]
    NotConnected,
    #[error("service request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Parameters forwarded to every backend invocation.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub target: String,
    pub profile: String,
    pub depth: String,
    pub max_diagnostics: usize,
    pub confidence_threshold: f64,
}

impl AnalyzeRequest {
    pub fn from_config(target: &str, config: &Config) -> Self {
        Self {
            target: target.to_string(),
            profile: config.safety_profile.as_str().to_string(),
            depth: config.analysis_depth.as_str().to_string(),
            max_diagnostics: config.max_diagnostics,
            confidence_threshold: config.confidence_threshold,
        }
    }

    /// Common command-line shape shared by the binary and scripting
    /// channels.
    pub(crate) fn to_args(&self) -> Vec<String> {
        vec![
            "analyze".to_string(),
            self.target.clone(),
            "--profile".to_string(),
            self.profile.clone(),
            "--depth".to_string(),
            self.depth.clone(),
            "--max-diagnostics".to_string(),
            self.max_diagnostics.to_string(),
            "--confidence-threshold".to_string(),
            format!("{}", self.confidence_threshold),
            "--format".to_string(),
            "json".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_args_shape() {
        let config = Config::default();
        let request = AnalyzeRequest::from_config("src/lib.rs", &config);
        let args = request.to_args();

        assert_eq!(args[0], "analyze");
        assert_eq!(args[1], "src/lib.rs");
        assert!(args.contains(&"--profile".to_string()));
        assert!(args.contains(&"standard".to_string()));
        assert_eq!(args.last().unwrap(), "json");
    }
}
