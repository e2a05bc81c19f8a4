//! Configuration schema for gatecheck.
//!
//! Loaded from a YAML file; every section has working defaults so an
//! empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["gatecheck.yaml", ".gatecheck.yaml"];

/// Schema version stamped on cache entries; bump when the normalized
/// result shape changes so stale caches self-invalidate.
pub const SCHEMA_VERSION: &str = "1";

/// How aggressively the backend analyzer should flag issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SafetyProfile {
    Strict,
    #[default]
    Standard,
    Permissive,
}

impl SafetyProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyProfile::Strict => "strict",
            SafetyProfile::Standard => "standard",
            SafetyProfile::Permissive => "permissive",
        }
    }
}

/// How deep the backend analyzer should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Surface,
    #[default]
    Standard,
    Deep,
    Comprehensive,
}

impl AnalysisDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisDepth::Surface => "surface",
            AnalysisDepth::Standard => "standard",
            AnalysisDepth::Deep => "deep",
            AnalysisDepth::Comprehensive => "comprehensive",
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub safety_profile: SafetyProfile,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub analysis_depth: AnalysisDepth,
    #[serde(default = "default_max_diagnostics")]
    pub max_diagnostics: usize,
    #[serde(default)]
    pub parallel_processing: bool,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Glob patterns for paths to include (empty = everything).
    #[serde(default)]
    pub include: Vec<String>,
    /// Glob patterns for paths to exclude (e.g. "**/vendor/**").
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub gates: GateConfig,
    /// Fall back to a local best-effort analysis when every real
    /// backend is unreachable, instead of failing the request.
    #[serde(default = "default_true")]
    pub allow_degraded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            safety_profile: SafetyProfile::default(),
            confidence_threshold: default_confidence_threshold(),
            analysis_depth: AnalysisDepth::default(),
            max_diagnostics: default_max_diagnostics(),
            parallel_processing: false,
            max_workers: default_max_workers(),
            include: Vec::new(),
            exclude: Vec::new(),
            cache: CacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            service: ServiceConfig::default(),
            gates: GateConfig::default(),
            allow_degraded: true,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    /// Write entries through to the on-disk cache file.
    #[serde(default)]
    pub persist: bool,
    /// Skip cache lookups and stores entirely (the `--no-cache` flag).
    #[serde(default)]
    pub bypass: bool,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            max_entries: default_cache_max_entries(),
            persist: false,
            bypass: false,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Every timeout in one place. The source of truth for the otherwise
/// scattered 30s/35s-style constants.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutConfig {
    /// Per-attempt bound for availability probing.
    #[serde(default = "default_probe_ms")]
    pub probe_ms: u64,
    /// Bound for a single backend process or request.
    #[serde(default = "default_process_ms")]
    pub process_ms: u64,
    /// Total wall-clock bound for one backend attempt including spawn
    /// and parse overhead. Must be >= process_ms.
    #[serde(default = "default_wall_clock_ms")]
    pub wall_clock_ms: u64,
    /// How long a probe result stays fresh.
    #[serde(default = "default_availability_ttl_secs")]
    pub availability_ttl_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_ms: default_probe_ms(),
            process_ms: default_process_ms(),
            wall_clock_ms: default_wall_clock_ms(),
            availability_ttl_secs: default_availability_ttl_secs(),
        }
    }
}

/// Long-lived analysis service channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// The service channel is only considered when explicitly enabled.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_service_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_retry_cap_ms")]
    pub retry_cap_ms: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_service_endpoint(),
            retry_base_ms: default_retry_base_ms(),
            retry_cap_ms: default_retry_cap_ms(),
            retry_max_attempts: default_retry_max_attempts(),
        }
    }
}

/// Quality-gate thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GateConfig {
    /// T: weighted index below T passes, T..1.5T warns, above fails.
    #[serde(default = "default_weighted_index_limit")]
    pub weighted_index_limit: f64,
    /// R: (critical+major)/total below R passes, R..1.25R warns.
    #[serde(default = "default_high_severity_ratio")]
    pub high_severity_ratio: f64,
    /// Total-findings gate bounds.
    #[serde(default = "default_total_low")]
    pub total_low: usize,
    #[serde(default = "default_total_high")]
    pub total_high: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            weighted_index_limit: default_weighted_index_limit(),
            high_severity_ratio: default_high_severity_ratio(),
            total_low: default_total_low(),
            total_high: default_total_high(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.7
}
fn default_max_diagnostics() -> usize {
    500
}
fn default_max_workers() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_cache_max_entries() -> usize {
    100
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_probe_ms() -> u64 {
    2_000
}
fn default_process_ms() -> u64 {
    30_000
}
fn default_wall_clock_ms() -> u64 {
    35_000
}
fn default_availability_ttl_secs() -> u64 {
    30
}
fn default_service_endpoint() -> String {
    "http://127.0.0.1:7432".to_string()
}
fn default_retry_base_ms() -> u64 {
    500
}
fn default_retry_cap_ms() -> u64 {
    10_000
}
fn default_retry_max_attempts() -> u32 {
    5
}
fn default_weighted_index_limit() -> f64 {
    50.0
}
fn default_high_severity_ratio() -> f64 {
    0.2
}
fn default_total_low() -> usize {
    20
}
fn default_total_high() -> usize {
    50
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Discover a config file in the current directory.
    pub fn discover() -> Option<std::path::PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(std::path::PathBuf::from)
            .find(|p| p.exists())
    }
}

/// Validate a parsed configuration.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if !(0.0..=1.0).contains(&config.confidence_threshold) {
        anyhow::bail!(
            "confidence_threshold must be between 0.0 and 1.0, got {}",
            config.confidence_threshold
        );
    }
    if config.max_workers == 0 {
        anyhow::bail!("max_workers must be at least 1");
    }
    if config.timeouts.wall_clock_ms < config.timeouts.process_ms {
        anyhow::bail!(
            "wall_clock_ms ({}) must be >= process_ms ({})",
            config.timeouts.wall_clock_ms,
            config.timeouts.process_ms
        );
    }
    if config.cache.max_entries == 0 {
        anyhow::bail!("cache.max_entries must be at least 1");
    }
    if config.gates.weighted_index_limit <= 0.0 {
        anyhow::bail!("gates.weighted_index_limit must be positive");
    }
    if !(0.0..=1.0).contains(&config.gates.high_severity_ratio) {
        anyhow::bail!("gates.high_severity_ratio must be between 0.0 and 1.0");
    }
    if config.gates.total_high < config.gates.total_low {
        anyhow::bail!("gates.total_high must be >= gates.total_low");
    }
    for pattern in config.include.iter().chain(config.exclude.iter()) {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid glob pattern {:?}: {}", pattern, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_valid() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.timeouts.process_ms, 30_000);
        assert_eq!(config.timeouts.wall_clock_ms, 35_000);
        assert!(!config.service.enabled);
        assert!(config.allow_degraded);
        validate(&config).unwrap();
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
safety_profile: strict
analysis_depth: deep
cache:
  ttl_secs: 60
gates:
  weighted_index_limit: 30
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.safety_profile, SafetyProfile::Strict);
        assert_eq!(config.analysis_depth, AnalysisDepth::Deep);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.gates.weighted_index_limit, 30.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.confidence_threshold = 1.5;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.timeouts.wall_clock_ms = 1_000;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.exclude = vec!["[invalid".to_string()];
        assert!(validate(&config).is_err());
    }
}
