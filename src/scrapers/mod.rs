//! External scraping services used by the pipeline.
//!
//! The pipeline needs three capabilities, each behind its own trait so a run
//! can be driven by the real HTTP client or by an in-memory double:
//!
//! | Trait | Capability | Used by |
//! |-------|------------|---------|
//! | [`SiteMapper`] | List links on one site matching a topic phrase | [`crate::discovery`] |
//! | [`BatchScraper`] | Fetch main-content markdown for many URLs at once | [`crate::fetcher`] |
//! | [`SearchScraper`] | Search the web and scrape the hits in one call | [`crate::pipeline`] (search mode) |
//!
//! [`firecrawl::FirecrawlClient`] implements all three against the Firecrawl API.
//!
//! The request and response types here mirror the service envelopes: every
//! response carries a `success` flag, and page metadata is parsed leniently
//! because sites emit the same meta tag more than once.

use crate::error::ServiceError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub mod firecrawl;

/// Output format requested from the scrape services.
pub const MARKDOWN_FORMAT: &str = "markdown";

/// Request for the links of a single site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRequest {
    /// Page the map is scoped to.
    pub url: String,
    /// Topic phrase used to rank links.
    pub search: String,
    pub limit: usize,
    /// Skip the site's sitemap index and rely on crawled links.
    pub ignore_sitemap: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapResponse {
    pub success: bool,
    pub links: Vec<String>,
}

/// Request to scrape many pages in one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchScrapeRequest {
    pub urls: Vec<String>,
    pub formats: Vec<String>,
    pub only_main_content: bool,
}

impl BatchScrapeRequest {
    /// Main-content markdown for `urls`.
    pub fn markdown(urls: Vec<String>) -> Self {
        Self {
            urls,
            formats: vec![MARKDOWN_FORMAT.to_string()],
            only_main_content: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOptions {
    pub formats: Vec<String>,
    pub only_main_content: bool,
}

/// Request to search the web and scrape each hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub scrape_options: ScrapeOptions,
}

impl SearchRequest {
    pub fn markdown(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            limit,
            scrape_options: ScrapeOptions {
                formats: vec![MARKDOWN_FORMAT.to_string()],
                only_main_content: true,
            },
        }
    }
}

/// Result of a batch scrape or a search-and-scrape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScrapeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<ScrapedPage>,
}

/// One scraped page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScrapedPage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    /// Search hits carry the title at the top level.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub markdown: Option<String>,
    #[serde(default)]
    pub metadata: PageMetadata,
}

impl ScrapedPage {
    /// The page's own URL: metadata `sourceURL`, then `url`.
    pub fn resolved_url(&self) -> Option<&str> {
        self.metadata
            .source_url
            .as_deref()
            .or(self.metadata.url.as_deref())
            .or(self.url.as_deref())
    }

    /// Where the page ended up after redirects, when the service reports it.
    pub fn final_url(&self) -> Option<&str> {
        self.metadata.url.as_deref().or(self.url.as_deref())
    }

    /// Every URL the service attached to this page.
    pub fn reported_urls(&self) -> impl Iterator<Item = &str> {
        [
            self.metadata.source_url.as_deref(),
            self.metadata.url.as_deref(),
            self.url.as_deref(),
        ]
        .into_iter()
        .flatten()
    }

    pub fn resolved_title(&self) -> Option<&str> {
        self.metadata.title.as_deref().or(self.title.as_deref())
    }

    /// Publication date from whichever meta tag the site used.
    pub fn published_date(&self) -> Option<&str> {
        self.metadata
            .date
            .as_deref()
            .or(self.metadata.published_time.as_deref())
            .or(self.metadata.article_published_time.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageMetadata {
    #[serde(default, rename = "sourceURL", deserialize_with = "lenient_string")]
    pub source_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, rename = "publishedTime", deserialize_with = "lenient_string")]
    pub published_time: Option<String>,
    #[serde(
        default,
        rename = "article:published_time",
        deserialize_with = "lenient_string"
    )]
    pub article_published_time: Option<String>,
}

/// Accept a string, or the first string of an array; anything else is `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => items.into_iter().find_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        }),
        _ => None,
    })
}

/// Lists candidate links on a single site.
pub trait SiteMapper {
    async fn map_site(&self, request: &MapRequest) -> Result<MapResponse, ServiceError>;
}

/// Scrapes a batch of known URLs.
pub trait BatchScraper {
    async fn batch_scrape(
        &self,
        request: &BatchScrapeRequest,
    ) -> Result<ScrapeResponse, ServiceError>;
}

/// Searches the web and scrapes the results in one call.
pub trait SearchScraper {
    async fn search(&self, request: &SearchRequest) -> Result<ScrapeResponse, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_request_wire_shape() {
        let request = MapRequest {
            url: "https://vnexpress.net/thoi-su/thien-tai".to_string(),
            search: "bão lũ".to_string(),
            limit: 10,
            ignore_sitemap: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["ignoreSitemap"], true);
        assert_eq!(json["limit"], 10);
    }

    #[test]
    fn test_batch_request_wire_shape() {
        let json = serde_json::to_value(BatchScrapeRequest::markdown(vec![
            "https://tuoitre.vn/a-2025.htm".to_string(),
        ]))
        .unwrap();
        assert_eq!(json["formats"], serde_json::json!(["markdown"]));
        assert_eq!(json["onlyMainContent"], true);
    }

    #[test]
    fn test_search_request_wire_shape() {
        let json = serde_json::to_value(SearchRequest::markdown("thiên tai", 8)).unwrap();
        assert_eq!(json["scrapeOptions"]["onlyMainContent"], true);
        assert_eq!(json["limit"], 8);
    }

    #[test]
    fn test_scraped_page_lenient_metadata() {
        let page: ScrapedPage = serde_json::from_str(
            r#"{
                "markdown": "Nội dung",
                "metadata": {
                    "title": ["Bão số 15", "Bão số 15 - VnExpress"],
                    "sourceURL": "https://vnexpress.net/bao-so-15-4789999.html",
                    "publishedTime": "2025-11-26T07:00:00+07:00",
                    "statusCode": 200
                }
            }"#,
        )
        .unwrap();
        assert_eq!(page.resolved_title(), Some("Bão số 15"));
        assert_eq!(
            page.resolved_url(),
            Some("https://vnexpress.net/bao-so-15-4789999.html")
        );
        assert_eq!(page.published_date(), Some("2025-11-26T07:00:00+07:00"));
    }

    #[test]
    fn test_scrape_response_defaults() {
        let response: ScrapeResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!response.success);
        assert!(response.data.is_empty());
    }
}
