//! End-to-end orchestration of one run.
//!
//! ```text
//! map mode:    sources -> discovery -> fetcher -> prompter -> reconciler
//! search mode: search-and-scrape ------------> prompter -> reconciler
//! ```
//!
//! Any stage that comes back empty ends the run with no events. Nothing is
//! carried between runs, and concurrent runs are not coordinated here; the
//! caller decides whether to allow them.

use crate::api::{AskAsync, GeminiClient, RetryAsk};
use crate::classifier::is_article_url;
use crate::config::{Credentials, DiscoveryMode, PipelineConfig};
use crate::discovery::{DiscoveryLimits, discover_links};
use crate::error::ServiceError;
use crate::fetcher::{fetch_articles, page_to_article};
use crate::models::{DisasterEvent, FetchedArticle, RunStamp};
use crate::prompter;
use crate::reconciler::reconcile;
use crate::scrapers::firecrawl::FirecrawlClient;
use crate::scrapers::{BatchScraper, SearchScraper, SearchRequest, SiteMapper};
use crate::sources::{is_allowed_url, resolve_entry_point, sample_domains};
use itertools::Itertools;
use tracing::{error, info, instrument, warn};

/// One configured pipeline.
///
/// `S` provides site maps, batch scrapes, and search; `L` is the language model.
pub struct Pipeline<S, L> {
    config: PipelineConfig,
    scraper: S,
    llm: L,
    available: bool,
}

/// The production pipeline: Firecrawl for scraping, Gemini with retries for extraction.
pub type LivePipeline = Pipeline<FirecrawlClient, RetryAsk<GeminiClient>>;

impl LivePipeline {
    /// Build the HTTP clients from `credentials` and `config`.
    ///
    /// Missing credentials do not fail construction; the pipeline reports
    /// itself unavailable and never touches its clients.
    pub fn from_config(
        credentials: &Credentials,
        config: PipelineConfig,
    ) -> Result<Self, ServiceError> {
        let firecrawl = FirecrawlClient::new(
            credentials.firecrawl_api_key.clone().unwrap_or_default(),
            config.request_timeout(),
        )?
        .with_polling(config.batch_poll_interval(), config.batch_poll_attempts);

        let gemini = GeminiClient::new(
            credentials.gemini_api_key.clone().unwrap_or_default(),
            config.model.clone(),
            config.temperature,
            config.request_timeout(),
        )?;
        let llm = RetryAsk::new(gemini, config.llm_max_retries, config.llm_base_delay());

        Ok(Self::new(credentials, config, firecrawl, llm))
    }
}

impl<S, L> Pipeline<S, L>
where
    S: SiteMapper + BatchScraper + SearchScraper,
    L: AskAsync,
{
    pub fn new(credentials: &Credentials, config: PipelineConfig, scraper: S, llm: L) -> Self {
        let available = credentials.is_complete();
        if !available {
            warn!(?credentials, "Missing API credentials; pipeline unavailable");
        }
        Self {
            config,
            scraper,
            llm,
            available,
        }
    }

    /// Whether both credentials were supplied.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Run the pipeline once.
    ///
    /// Returns the run's events, most recent first, or nothing if the
    /// pipeline is unavailable or any stage came back empty.
    #[instrument(level = "info", skip_all, fields(mode = ?self.config.mode))]
    pub async fn run(&self) -> Vec<DisasterEvent> {
        if !self.available {
            warn!("Pipeline unavailable; skipping run");
            return Vec::new();
        }

        let stamp = RunStamp::now();
        let articles = match self.config.mode {
            DiscoveryMode::Map => self.collect_by_map().await,
            DiscoveryMode::Search => self.collect_by_search().await,
        };
        if articles.is_empty() {
            info!("No articles collected this run");
            return Vec::new();
        }

        let raw = match prompter::extract(&self.llm, &articles, self.config.body_char_budget).await
        {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Extraction request failed");
                return Vec::new();
            }
        };

        let events = reconcile(&raw, &articles, &stamp);
        info!(articles = articles.len(), events = events.len(), "Run complete");
        events
    }

    async fn collect_by_map(&self) -> Vec<FetchedArticle> {
        let entry_points: Vec<String> = sample_domains(self.config.sampled_domains)
            .into_iter()
            .map(resolve_entry_point)
            .collect();
        info!(sites = entry_points.len(), "Resolved entry points");

        let limits = DiscoveryLimits {
            per_site: self.config.per_site_limit,
            map_results: self.config.map_result_limit,
        };
        let links = discover_links(&self.scraper, &entry_points, &self.config.topic_phrase, limits)
            .await;
        if links.is_empty() {
            info!("No article links discovered");
            return Vec::new();
        }

        fetch_articles(&self.scraper, &links).await
    }

    async fn collect_by_search(&self) -> Vec<FetchedArticle> {
        let request = SearchRequest::markdown(&self.config.search_query, self.config.search_limit);
        let response = match self.scraper.search(&request).await {
            Ok(response) if response.success => response,
            Ok(_) => {
                error!("Search reported failure");
                return Vec::new();
            }
            Err(e) => {
                error!(error = %e, "Search request failed");
                return Vec::new();
            }
        };

        let hits = response.data.len();
        let articles: Vec<FetchedArticle> = response
            .data
            .into_iter()
            .filter_map(|page| page_to_article(page, None))
            .filter(|a| is_allowed_url(&a.source_url) && is_article_url(&a.source_url))
            .unique_by(|a| a.source_url.clone())
            .collect();
        info!(hits, kept = articles.len(), "Search results filtered to trusted articles");
        articles
    }
}
