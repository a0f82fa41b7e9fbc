//! Build and daemon configuration loaded from a YAML file outside the
//! core. Recognized keys are documented in `SPEC_FULL.md` §6.

use docbuilder_core::config::{ForgeNamespacing, RepositoryConfig};
use docbuilder_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_max_concurrent() -> usize {
    4
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_cleanup_after() -> usize {
    50
}

fn default_site_generator_binary() -> String {
    "hugo".to_string()
}

/// Pipeline tuning and forge-namespacing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub namespace_forges: ForgeNamespacing,
    pub detect_deletions: bool,
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub retry_attempts: u32,
    #[serde(rename = "retry_delay")]
    pub retry_delay_secs: u64,
    pub cleanup_after: usize,
    /// Path or bare name of the external Hugo-compatible site
    /// generator binary invoked at stage 5.
    #[serde(default = "default_site_generator_binary")]
    pub site_generator_binary: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            namespace_forges: ForgeNamespacing::default(),
            detect_deletions: false,
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            retry_attempts: 0,
            retry_delay_secs: default_retry_delay_secs(),
            cleanup_after: default_cleanup_after(),
            site_generator_binary: default_site_generator_binary(),
        }
    }
}

impl BuildConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// TLS policy for a listening daemon surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TlsConfig {
    /// Certificates are provisioned automatically (e.g. ACME).
    Auto,
    /// Explicit cert/key file paths, which must differ.
    Manual { cert_path: String, key_path: String },
}

/// Host/port/TLS triple shared by every listening daemon mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            requests_per_minute: 60,
            burst: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub path: String,
    pub secret: Option<String>,
    pub max_payload_bytes: u64,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Exactly one of `cron` or `interval`, mirroring
/// `docbuilder_state::ScheduleTrigger`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleTriggerConfig {
    Cron { expression: String },
    Interval { seconds: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntryConfig {
    pub name: String,
    pub trigger: ScheduleTriggerConfig,
}

/// Daemon surface selection; each variant carries the sub-config its
/// mode requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DaemonMode {
    Http {
        listener: ListenerConfig,
    },
    Webhook {
        listener: ListenerConfig,
        webhook: WebhookConfig,
    },
    Scheduled {
        schedules: Vec<ScheduleEntryConfig>,
    },
    Api {
        listener: ListenerConfig,
        webhook: WebhookConfig,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(flatten)]
    pub mode: DaemonMode,
}

/// The full on-disk configuration file: `build`, optional `daemon`,
/// and the repository list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub build: BuildConfig,
    pub daemon: Option<DaemonConfig>,
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
}

/// Load and validate a configuration file from disk.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let bytes = std::fs::read(path)?;
    let config: ConfigFile = serde_yaml::from_slice(&bytes)
        .map_err(|e| Error::configuration(format!("invalid config file: {e}")))?;
    if let Some(daemon) = &config.daemon {
        validate_daemon_config(daemon)?;
    }
    Ok(config)
}

/// Validate a daemon mode's sub-config against the constraints in
/// `SPEC_FULL.md` §4.6.
pub fn validate_daemon_config(config: &DaemonConfig) -> Result<()> {
    match &config.mode {
        DaemonMode::Http { listener } => validate_listener(listener),
        DaemonMode::Webhook { listener, webhook } => {
            validate_listener(listener)?;
            validate_webhook(webhook)
        }
        DaemonMode::Api { listener, webhook } => {
            validate_listener(listener)?;
            validate_webhook(webhook)
        }
        DaemonMode::Scheduled { schedules } => {
            if schedules.is_empty() {
                return Err(Error::validation(
                    "scheduled mode requires at least one schedule entry",
                ));
            }
            Ok(())
        }
    }
}

fn validate_listener(listener: &ListenerConfig) -> Result<()> {
    validate_host(&listener.host)?;
    if listener.port == 0 {
        return Err(Error::validation("listener port must be between 1 and 65535")
            .with_context("port", listener.port.to_string()));
    }
    if let Some(TlsConfig::Manual {
        cert_path,
        key_path,
    }) = &listener.tls
    {
        if cert_path == key_path {
            return Err(Error::validation(
                "tls cert_path and key_path must be distinct files",
            ));
        }
    }
    Ok(())
}

fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Error::validation("host must not be empty"));
    }
    if host.parse::<std::net::IpAddr>().is_ok() {
        return Ok(());
    }
    if is_rfc1123_hostname(host) {
        return Ok(());
    }
    Err(Error::validation(format!("invalid host: {host:?}")))
}

/// A permissive RFC-1123 hostname check: dot-separated labels of
/// alphanumerics and hyphens, no empty labels, no leading/trailing
/// hyphen within a label.
fn is_rfc1123_hostname(host: &str) -> bool {
    if host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

const MIN_PAYLOAD_BYTES: u64 = 1024;
const MAX_PAYLOAD_BYTES: u64 = 100 * 1024 * 1024;

fn validate_webhook(webhook: &WebhookConfig) -> Result<()> {
    if !webhook.path.starts_with('/') {
        return Err(Error::validation("webhook path must begin with '/'"));
    }
    if !(MIN_PAYLOAD_BYTES..=MAX_PAYLOAD_BYTES).contains(&webhook.max_payload_bytes) {
        return Err(Error::validation(
            "webhook max_payload_bytes must fall within [1 KiB, 100 MiB]",
        ));
    }
    if !(1..=10_000).contains(&webhook.rate_limit.requests_per_minute) {
        return Err(Error::validation(
            "rate limit requests_per_minute must fall within [1, 10000]",
        ));
    }
    if !(1..=1_000).contains(&webhook.rate_limit.burst) {
        return Err(Error::validation(
            "rate limit burst must fall within [1, 1000]",
        ));
    }
    Ok(())
}
