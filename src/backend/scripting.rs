//! Scripting-runtime entry point channel.
//!
//! Same call contract as the binary channel, reached through
//! `python -m gatecheck_engine`. The prober resolves which interpreter
//! to use; this module only executes the resolved invocation.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{AnalyzeRequest, BackendError};
use crate::probe::SCRIPT_MODULE;

/// Invoke the Python entry point and parse its JSON stdout.
pub async fn analyze(
    interpreter: &str,
    request: &AnalyzeRequest,
    timeout: Duration,
) -> Result<serde_json::Value, BackendError> {
    let child = Command::new(interpreter)
        .arg("-m")
        .arg(SCRIPT_MODULE)
        .args(request.to_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| BackendError::Spawn {
            program: format!("{} -m {}", interpreter, SCRIPT_MODULE),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Err(_) => return Err(BackendError::Timeout(timeout)),
        Ok(result) => result?,
    };

    if !output.status.success() {
        return Err(BackendError::NonZeroExit {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Split a resolved endpoint like `python3 -m gatecheck_engine` back
/// into its interpreter.
pub fn interpreter_from_endpoint(endpoint: &str) -> &str {
    endpoint.split_whitespace().next().unwrap_or("python3")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_interpreter_from_endpoint() {
        assert_eq!(
            interpreter_from_endpoint("python3 -m gatecheck_engine"),
            "python3"
        );
        assert_eq!(interpreter_from_endpoint(""), "python3");
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let request = AnalyzeRequest::from_config("x.rs", &Config::default());
        let err = analyze("no-such-python-x9", &request, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }
}
