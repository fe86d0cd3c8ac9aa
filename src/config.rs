// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const DEFAULT_CONFIG_PATH: &str = "config/news.toml";
pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_HF_TOKEN: &str = "HF_API_TOKEN";

pub const DEFAULT_FETCH_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_MODEL: &str = "valhalla/distilbart-mnli-12-3";

fn default_interval() -> u64 {
    DEFAULT_FETCH_INTERVAL_SECS
}
fn default_database_url() -> String {
    "sqlite://news.db".to_string()
}
fn default_user_agent() -> String {
    "it-news-ranker/0.1".to_string()
}
fn default_provider() -> String {
    "huggingface".to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_sources() -> Vec<SourceConfig> {
    [
        ("reddit-sysadmin", "https://www.reddit.com/r/sysadmin.rss"),
        (
            "ars-technica",
            "https://feeds.arstechnica.com/arstechnica/technology-lab",
        ),
        (
            "the-hacker-news",
            "https://feeds.feedburner.com/TheHackersNews",
        ),
        ("toms-hardware", "https://www.tomshardware.com/feeds/all"),
    ]
    .into_iter()
    .map(|(slug, url)| SourceConfig {
        slug: slug.to_string(),
        url: url.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_interval")]
    pub fetch_interval_secs: u64,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_user_agent")]
    pub http_user_agent: String,
    #[serde(default)]
    pub scorer: ScorerConfig,
    /// Feed registry, visited in this order on every cycle.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// "huggingface" | "disabled" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from HF_API_TOKEN.
    #[serde(default)]
    pub api_key: String,
    /// Base URL override, e.g. a self-hosted inference server.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub slug: String,
    pub url: String,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            endpoint: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fetch_interval_secs: default_interval(),
            database_url: default_database_url(),
            http_user_agent: default_user_agent(),
            scorer: ScorerConfig::default(),
            sources: default_sources(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing news config")?;
        cfg.sanitize()?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg = Self::from_toml_str(&data)?;
        cfg.apply_env()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $NEWS_CONFIG_PATH (must exist)
    /// 2) config/news.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from_file(&default_path);
        }
        let mut cfg = AppConfig::default();
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn sanitize(&mut self) -> Result<()> {
        if self.fetch_interval_secs == 0 {
            self.fetch_interval_secs = default_interval();
        }
        self.scorer.provider = self.scorer.provider.trim().to_lowercase();

        let mut seen = HashSet::new();
        for s in &mut self.sources {
            s.slug = s.slug.trim().to_string();
            if s.slug.is_empty() {
                bail!("source with url {} has an empty slug", s.url);
            }
            if !seen.insert(s.slug.clone()) {
                bail!("duplicate source slug `{}`", s.slug);
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var(ENV_DATABASE_URL) {
            if !url.trim().is_empty() {
                self.database_url = url;
            }
        }
        if self.scorer.api_key.trim().eq_ignore_ascii_case("env") {
            self.scorer.api_key = match self.scorer.provider.as_str() {
                "huggingface" => env::var(ENV_HF_TOKEN)
                    .map_err(|_| anyhow!("Missing {ENV_HF_TOKEN} env var"))?,
                _ => String::new(),
            };
        }
        Ok(())
    }
}
