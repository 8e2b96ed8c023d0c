// src/config/client.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const ENV_BACKEND_URL: &str = "DIGEST_BACKEND_URL";
pub const ENV_STORAGE_PATH: &str = "DIGEST_STORAGE_PATH";
pub const ENV_LOG_JSON: &str = "DIGEST_LOG_JSON";

fn default_backend_url() -> String {
    "http://localhost:8001".to_string()
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("state/client.json")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    /// Built-in editorial sample data.
    #[default]
    Curated,
    /// `/api/trending-topics` and friends through the resilient client.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagesCfg {
    pub articles: u32,
}

impl Default for PagesCfg {
    fn default() -> Self {
        Self { articles: 20 }
    }
}

/// Periods of the recurring timers, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshCfg {
    pub market_secs: u64,
    pub topics_secs: u64,
    pub alerts_secs: u64,
    pub keep_alive_secs: u64,
}

impl Default for RefreshCfg {
    fn default() -> Self {
        Self {
            market_secs: 60,
            topics_secs: 600,
            alerts_secs: 120,
            keep_alive_secs: 300,
        }
    }
}

/// Delays of the secondary startup tier, in milliseconds from process start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupCfg {
    pub trending_ms: u64,
    pub alerts_ms: u64,
    pub reading_list_ms: u64,
    pub institutional_ms: u64,
    pub policy_ms: u64,
    pub live_streams_ms: u64,
}

impl Default for StartupCfg {
    fn default() -> Self {
        Self {
            trending_ms: 1000,
            alerts_ms: 1500,
            reading_list_ms: 2000,
            institutional_ms: 2500,
            policy_ms: 3000,
            live_streams_ms: 3500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub backend_url: String,
    pub storage_path: PathBuf,
    pub pages: PagesCfg,
    pub refresh: RefreshCfg,
    pub startup: StartupCfg,
    pub feeds: FeedMode,
    /// Absent means no client-side timeout; the transport's own limits apply.
    pub request_timeout_secs: Option<u64>,
    /// e.g. "127.0.0.1:9464"; absent disables the Prometheus endpoint.
    pub metrics_addr: Option<String>,
    pub log_json: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            storage_path: default_storage_path(),
            pages: PagesCfg::default(),
            refresh: RefreshCfg::default(),
            startup: StartupCfg::default(),
            feeds: FeedMode::default(),
            request_timeout_secs: None,
            metrics_addr: None,
            log_json: false,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    /// Environment wins over file values.
    pub fn apply_env(&mut self) {
        if let Some(url) = env_nonempty(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(p) = env_nonempty(ENV_STORAGE_PATH) {
            self.storage_path = PathBuf::from(p);
        }
        if let Some(v) = env_nonempty(ENV_LOG_JSON) {
            self.log_json = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }

    /// Zero periods or page sizes would spin or fetch nothing; put defaults back.
    pub fn sanitize(&mut self) {
        let d = RefreshCfg::default();
        for (v, def) in [
            (&mut self.refresh.market_secs, d.market_secs),
            (&mut self.refresh.topics_secs, d.topics_secs),
            (&mut self.refresh.alerts_secs, d.alerts_secs),
            (&mut self.refresh.keep_alive_secs, d.keep_alive_secs),
        ] {
            if *v == 0 {
                *v = def;
            }
        }
        if self.pages.articles == 0 {
            self.pages.articles = PagesCfg::default().articles;
        }
        if self.backend_url.trim().is_empty() {
            self.backend_url = default_backend_url();
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_from(path: &Path) -> Result<ClientConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading client config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing client config {}", path.display()))?;
    cfg.apply_env();
    cfg.sanitize();
    Ok(cfg)
}

/// Load config using env var + fallbacks:
/// 1) $DIGEST_CONFIG_PATH
/// 2) config/client.toml
/// 3) config/client.json
/// 4) built-in defaults
pub fn load_default() -> Result<ClientConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/client.toml");
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    let json_p = PathBuf::from("config/client.json");
    if json_p.exists() {
        return load_from(&json_p);
    }
    let mut cfg = ClientConfig::default();
    cfg.apply_env();
    Ok(cfg)
}

fn parse_config(s: &str, hint_ext: &str) -> Result<ClientConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    if hint_ext == "toml" {
        return Ok(toml::from_str(s)?);
    }
    // Unknown extension: JSON documents start with a brace.
    if s.trim_start().starts_with('{') {
        Ok(serde_json::from_str(s)?)
    } else {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = parse_config(
            r#"
feeds = "remote"

[refresh]
market_secs = 30
"#,
            "toml",
        )
        .unwrap();
        assert_eq!(cfg.feeds, FeedMode::Remote);
        assert_eq!(cfg.refresh.market_secs, 30);
        assert_eq!(cfg.refresh.alerts_secs, 120);
        assert_eq!(cfg.startup.live_streams_ms, 3500);
        assert_eq!(cfg.pages.articles, 20);
    }

    #[test]
    fn zero_periods_are_sanitized() {
        let mut cfg: ClientConfig =
            parse_config(r#"{"refresh":{"market_secs":0},"pages":{"articles":0}}"#, "").unwrap();
        cfg.sanitize();
        assert_eq!(cfg.refresh.market_secs, 60);
        assert_eq!(cfg.pages.articles, 20);
    }

    #[test]
    fn timeout_is_optional() {
        let mut cfg = ClientConfig::default();
        assert_eq!(cfg.request_timeout(), None);
        cfg.request_timeout_secs = Some(0);
        assert_eq!(cfg.request_timeout(), None);
        cfg.request_timeout_secs = Some(15);
        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(15)));
    }
}
