//! Long-lived analysis service channel.
//!
//! Connectivity is an explicit state machine (Disconnected,
//! Connecting, Connected, Degraded) driven by a health probe with
//! capped exponential retries, instead of ad hoc reconnect timers.
//! `Degraded` means the last health check or request failed after the
//! channel had been connected; the next `ensure_connected` retries
//! from scratch.

use serde_json::json;
use std::sync::RwLock;
use std::time::Duration;

use super::{AnalyzeRequest, BackendError};
use crate::config::ServiceConfig;

/// Connection lifecycle of the service channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Degraded,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client for the HTTP analysis service.
pub struct ServiceChannel {
    http: reqwest::Client,
    config: ServiceConfig,
    state: RwLock<ChannelState>,
}

impl ServiceChannel {
    pub fn new(config: ServiceConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gatecheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            config,
            state: RwLock::new(ChannelState::Disconnected),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn state(&self) -> ChannelState {
        self.state
            .read()
            .map(|s| *s)
            .unwrap_or(ChannelState::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    fn set_state(&self, state: ChannelState) {
        if let Ok(mut guard) = self.state.write() {
            *guard = state;
        }
    }

    /// Drive the channel to Connected if possible. Health-checks the
    /// endpoint with capped exponential backoff; gives up after the
    /// configured attempt budget and reports the final state.
    pub async fn ensure_connected(&self, probe_timeout: Duration) -> ChannelState {
        if !self.config.enabled {
            return ChannelState::Disconnected;
        }
        if self.is_connected() {
            return ChannelState::Connected;
        }

        self.set_state(ChannelState::Connecting);

        let mut delay = Duration::from_millis(self.config.retry_base_ms);
        let cap = Duration::from_millis(self.config.retry_cap_ms);

        for attempt in 0..self.config.retry_max_attempts {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(cap);
            }
            if self.health_check(probe_timeout).await {
                self.set_state(ChannelState::Connected);
                return ChannelState::Connected;
            }
        }

        self.set_state(ChannelState::Disconnected);
        ChannelState::Disconnected
    }

    async fn health_check(&self, timeout: Duration) -> bool {
        let url = format!("{}/health", self.config.endpoint);
        matches!(
            self.http.get(&url).timeout(timeout).send().await,
            Ok(response) if response.status().is_success()
        )
    }

    /// Submit an analysis request. Requires a Connected channel; a
    /// failed request moves the channel to Degraded so the
    /// orchestrator skips it until the next reconnect.
    pub async fn analyze(
        &self,
        request: &AnalyzeRequest,
        timeout: Duration,
    ) -> Result<serde_json::Value, BackendError> {
        if !self.is_connected() {
            return Err(BackendError::NotConnected);
        }

        let url = format!("{}/analyze", self.config.endpoint);
        let body = json!({
            "target": request.target,
            "profile": request.profile,
            "depth": request.depth,
            "max_diagnostics": request.max_diagnostics,
            "confidence_threshold": request.confidence_threshold,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                self.set_state(ChannelState::Degraded);
                if e.is_timeout() {
                    BackendError::Timeout(timeout)
                } else {
                    BackendError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            self.set_state(ChannelState::Degraded);
            return Err(BackendError::NotConnected);
        }

        let value = response.json::<serde_json::Value>().await.map_err(|e| {
            self.set_state(ChannelState::Degraded);
            BackendError::Http(e)
        })?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> ServiceConfig {
        ServiceConfig::default()
    }

    fn fast_config() -> ServiceConfig {
        ServiceConfig {
            enabled: true,
            // nothing listens here; reserved port keeps this a fast refusal
            endpoint: "http://127.0.0.1:1".to_string(),
            retry_base_ms: 10,
            retry_cap_ms: 20,
            retry_max_attempts: 2,
        }
    }

    #[tokio::test]
    async fn test_disabled_channel_stays_disconnected() {
        let channel = ServiceChannel::new(disabled_config());
        let state = channel.ensure_connected(Duration::from_millis(100)).await;
        assert_eq!(state, ChannelState::Disconnected);
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_exhausts_retries() {
        let channel = ServiceChannel::new(fast_config());
        let state = channel.ensure_connected(Duration::from_millis(200)).await;
        assert_eq!(state, ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn test_analyze_requires_connection() {
        let channel = ServiceChannel::new(fast_config());
        let request = AnalyzeRequest::from_config("x.rs", &crate::config::Config::default());
        let err = channel
            .analyze(&request, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotConnected));
    }
}
