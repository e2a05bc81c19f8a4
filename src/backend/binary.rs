//! Standalone analyzer executable channel.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{AnalyzeRequest, BackendError};

/// Invoke the analyzer executable and parse its JSON stdout.
///
/// The child is killed when the timeout elapses (`kill_on_drop`), so a
/// hung analyzer becomes a soft per-candidate failure rather than a
/// leaked process.
pub async fn analyze(
    executable: &str,
    request: &AnalyzeRequest,
    timeout: Duration,
) -> Result<serde_json::Value, BackendError> {
    let output = run(executable, &request.to_args(), timeout).await?;
    Ok(serde_json::from_slice(&output)?)
}

async fn run(program: &str, args: &[String], timeout: Duration) -> Result<Vec<u8>, BackendError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| BackendError::Spawn {
            program: program.to_string(),
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

    Ok(output.stdout)
}
