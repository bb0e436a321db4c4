//! Pipeline configuration and credentials.
//!
//! Tunables live in an optional YAML file; every field has a default, so an
//! empty file (or no file) yields a working configuration:
//!
//! ```yaml
//! mode: map
//! topic_phrase: "thiên tai bão lũ sạt lở động đất"
//! per_site_limit: 3
//! sampled_domains: 6
//! body_char_budget: 2000
//! model: gemini-2.5-flash
//! ```
//!
//! Credentials are kept separate and passed explicitly into the pipeline;
//! nothing here reads the environment after startup.

use crate::error::ConfigError;
use clap::ValueEnum;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument};

/// How candidate articles are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Map each trusted site's entry point, then batch-scrape the links.
    #[default]
    Map,
    /// One web search that returns scraped pages directly.
    Search,
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: DiscoveryMode,
    /// Query passed to each site map.
    pub topic_phrase: String,
    /// Article links kept per site after classification.
    pub per_site_limit: usize,
    /// Links requested from each site map.
    pub map_result_limit: usize,
    /// Crawl a random subset of this many domains; all when unset.
    pub sampled_domains: Option<usize>,
    /// Characters of article body sent to the model.
    pub body_char_budget: usize,
    /// Query for search mode.
    pub search_query: String,
    pub search_limit: usize,
    pub model: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub batch_poll_interval_ms: u64,
    pub batch_poll_attempts: u32,
    pub llm_max_retries: usize,
    pub llm_base_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: DiscoveryMode::Map,
            topic_phrase: "thiên tai bão lũ sạt lở động đất".to_string(),
            per_site_limit: 3,
            map_result_limit: 10,
            sampled_domains: None,
            body_char_budget: 2000,
            search_query: "tin tức thiên tai bão lũ sạt lở động đất Việt Nam mới nhất hôm nay"
                .to_string(),
            search_limit: 8,
            model: "gemini-2.5-flash".to_string(),
            temperature: 0.1,
            request_timeout_secs: 60,
            batch_poll_interval_ms: 2000,
            batch_poll_attempts: 30,
            llm_max_retries: 3,
            llm_base_delay_ms: 1000,
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.batch_poll_interval_ms)
    }

    pub fn llm_base_delay(&self) -> Duration {
        Duration::from_millis(self.llm_base_delay_ms)
    }
}

/// Load a [`PipelineConfig`] from a YAML file.
#[instrument(level = "info")]
pub async fn load_config(path: &str) -> Result<PipelineConfig, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
    let config = parse_config(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })?;
    info!(?config.mode, per_site_limit = config.per_site_limit, "Loaded pipeline configuration");
    Ok(config)
}

fn parse_config(raw: &str) -> Result<PipelineConfig, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    serde_yaml::from_str(raw)
}

/// The two API keys the pipeline needs.
#[derive(Clone, Default)]
pub struct Credentials {
    pub firecrawl_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("firecrawl_api_key", &self.firecrawl_api_key.as_ref().map(|_| "<set>"))
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl Credentials {
    pub fn new(firecrawl_api_key: Option<String>, gemini_api_key: Option<String>) -> Self {
        let non_blank = |key: Option<String>| key.filter(|k| !k.trim().is_empty());
        Self {
            firecrawl_api_key: non_blank(firecrawl_api_key),
            gemini_api_key: non_blank(gemini_api_key),
        }
    }

    /// Both keys are present.
    pub fn is_complete(&self) -> bool {
        self.firecrawl_api_key.is_some() && self.gemini_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), PipelineConfig::default());
        assert_eq!(parse_config("  \n").unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = parse_config("mode: search\nper_site_limit: 2\nsampled_domains: 5\n").unwrap();
        assert_eq!(config.mode, DiscoveryMode::Search);
        assert_eq!(config.per_site_limit, 2);
        assert_eq!(config.sampled_domains, Some(5));
        assert_eq!(config.body_char_budget, 2000);
        assert_eq!(config.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(parse_config("per_site_limit: many").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_config("/nonexistent/vn_disaster_news.yaml").await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_credentials_completeness() {
        assert!(Credentials::new(Some("fc".into()), Some("g".into())).is_complete());
        assert!(!Credentials::new(Some("fc".into()), None).is_complete());
        assert!(!Credentials::new(Some("  ".into()), Some("g".into())).is_complete());
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let printed = format!("{:?}", Credentials::new(Some("fc-secret".into()), None));
        assert!(!printed.contains("fc-secret"));
        assert!(printed.contains("<set>"));
    }
}
