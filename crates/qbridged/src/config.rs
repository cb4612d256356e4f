//! Bridge configuration loading.
//!
//! Parses the YAML bridge configuration, merges per-endpoint TLS settings
//! with the shared defaults, and validates the safety limits before the
//! control loop is allowed to start.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use qkd_common::SafetyLimits;

/// Default config file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "configs/bridge.yaml";

/// Resolved TLS settings for a single endpoint.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub enable: bool,
    pub ca: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

/// Per-endpoint TLS overrides inside the shared `tls:` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsOverride {
    #[serde(default)]
    pub enable: Option<bool>,
    #[serde(default)]
    pub ca: Option<PathBuf>,
    #[serde(default)]
    pub cert: Option<PathBuf>,
    #[serde(default)]
    pub key: Option<PathBuf>,
}

/// The `tls:` section: shared defaults plus `qcs:`/`plugin:` overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsSection {
    #[serde(default)]
    pub enable: Option<bool>,
    #[serde(default)]
    pub ca: Option<PathBuf>,
    #[serde(default)]
    pub cert: Option<PathBuf>,
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub qcs: Option<TlsOverride>,
    #[serde(default)]
    pub plugin: Option<TlsOverride>,
}

impl TlsSection {
    fn merged(&self, overrides: Option<&TlsOverride>) -> TlsConfig {
        TlsConfig {
            enable: overrides
                .and_then(|o| o.enable)
                .or(self.enable)
                .unwrap_or(false),
            ca: overrides.and_then(|o| o.ca.clone()).or_else(|| self.ca.clone()),
            cert: overrides
                .and_then(|o| o.cert.clone())
                .or_else(|| self.cert.clone()),
            key: overrides
                .and_then(|o| o.key.clone())
                .or_else(|| self.key.clone()),
        }
    }

    pub fn qcs_tls(&self) -> TlsConfig {
        self.merged(self.qcs.as_ref())
    }

    pub fn plugin_tls(&self) -> TlsConfig {
        self.merged(self.plugin.as_ref())
    }
}

/// Advisory endpoint mapping consumed by the domain-policy publisher.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainMapping {
    #[serde(default)]
    pub urlcc_dscp: Option<u32>,
    #[serde(default)]
    pub embb_dscp: Option<u32>,
    #[serde(default)]
    pub srv6_bsid_urlcc: Option<String>,
    #[serde(default)]
    pub srv6_bsid_embb: Option<String>,
    #[serde(default)]
    pub mlo_prefer_6ghz: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RootConfig {
    bridge: BridgeSection,
}

#[derive(Debug, Clone, Deserialize)]
struct BridgeSection {
    qcs_endpoint: String,
    plugin_endpoint: String,
    #[serde(default = "default_cycle_period_ms")]
    cycle_period_ms: u64,
    #[serde(default = "default_telemetry_period_ms")]
    telemetry_period_ms: u64,
    #[serde(default)]
    tls: TlsSection,
    #[serde(default)]
    safety: SafetyLimits,
    #[serde(default)]
    mapping: DomainMapping,
}

fn default_cycle_period_ms() -> u64 {
    500
}

fn default_telemetry_period_ms() -> u64 {
    250
}

/// Immutable bridge configuration, owned by the runtime for its lifetime.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub qcs_endpoint: String,
    pub plugin_endpoint: String,
    pub cycle_period_ms: u64,
    pub telemetry_period_ms: u64,
    pub qcs_tls: TlsConfig,
    pub plugin_tls: TlsConfig,
    pub safety: SafetyLimits,
    pub mapping: DomainMapping,
}

impl BridgeConfig {
    /// Load and validate the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("invalid bridge config: {}", path.display()))?;
        info!("loaded bridge config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a YAML configuration document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let root: RootConfig = serde_yaml::from_str(content)?;
        let bridge = root.bridge;
        if bridge.qcs_endpoint.is_empty() {
            bail!("bridge.qcs_endpoint must be set");
        }
        if bridge.plugin_endpoint.is_empty() {
            bail!("bridge.plugin_endpoint must be set");
        }
        bridge.safety.validate()?;
        Ok(Self {
            qcs_tls: bridge.tls.qcs_tls(),
            plugin_tls: bridge.tls.plugin_tls(),
            qcs_endpoint: bridge.qcs_endpoint,
            plugin_endpoint: bridge.plugin_endpoint,
            cycle_period_ms: bridge.cycle_period_ms,
            telemetry_period_ms: bridge.telemetry_period_ms,
            safety: bridge.safety,
            mapping: bridge.mapping,
        })
    }
}

/// Resolve the `--config` argument to an existing file.
pub fn resolve_config_path(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    bail!("config file not found: {}", path.display())
}
