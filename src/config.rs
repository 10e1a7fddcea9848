use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub dev_mode: bool,
    /// Per-IP request budget. Unset or 0 leaves the endpoints unlimited.
    #[serde(default)]
    pub rate_limit_per_minute: Option<usize>,
    #[serde(default = "default_port")]
    pub port: u16,
}
fn default_api_base() -> String { "https://api.openai.com/v1".into() }
fn default_model() -> String { "gpt-3.5-turbo".into() }
fn default_port() -> u16 { 3000 }

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let dev_mode = std::env::var("DEV_MODE").map(|v| v == "true").unwrap_or(false);
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        if api_key.is_none() && !dev_mode {
            anyhow::bail!("OPENAI_API_KEY must be set unless DEV_MODE=true");
        }
        let api_base = std::env::var("LLM_API_BASE").unwrap_or_else(|_| default_api_base());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| default_model());
        let rate_limit_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok().and_then(|v| v.parse().ok()).filter(|&n: &usize| n > 0);
        let port = std::env::var("PORT")
            .ok().and_then(|v| v.parse().ok()).unwrap_or(default_port());
        Ok(Self { api_key, api_base, model, dev_mode, rate_limit_per_minute, port })
    }

    /// Settings for running without a provider key.
    pub fn dev() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            dev_mode: true,
            rate_limit_per_minute: None,
            port: default_port(),
        }
    }
}

/// Settings for the page-side summarizer core.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub proxy_url: String,
    pub cache_path: PathBuf,
    pub quiet_period: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: "http://localhost:3000".into(),
            cache_path: PathBuf::from("summary_cache.json"),
            quiet_period: Duration::from_millis(500),
        }
    }
}

impl ClientConfig {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            proxy_url: std::env::var("SUMMARIZER_PROXY_URL").unwrap_or(defaults.proxy_url),
            cache_path: std::env::var("SUMMARY_CACHE_PATH").map(PathBuf::from).unwrap_or(defaults.cache_path),
            quiet_period: defaults.quiet_period,
        }
    }
}
