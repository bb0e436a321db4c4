//! Firecrawl API client.
//!
//! Implements [`SiteMapper`], [`BatchScraper`], and [`SearchScraper`] over the
//! Firecrawl v1 HTTP API:
//!
//! | Capability | Endpoint |
//! |------------|----------|
//! | Site map | `POST /v1/map` |
//! | Batch scrape | `POST /v1/batch/scrape`, then `GET /v1/batch/scrape/{id}` until completed |
//! | Search and scrape | `POST /v1/search` |
//!
//! Batch scrapes are asynchronous jobs on the Firecrawl side. The client hides
//! that: [`BatchScraper::batch_scrape`] starts the job and polls it, so the
//! caller sees a single request/response.

use super::{
    BatchScrapeRequest, BatchScraper, MapRequest, MapResponse, ScrapeResponse, ScrapedPage,
    SearchRequest, SearchScraper, SiteMapper,
};
use crate::error::ServiceError;
use crate::utils::truncate_for_log;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

const SERVICE: &str = "firecrawl";
const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// HTTP client for the Firecrawl API.
pub struct FirecrawlClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl std::fmt::Debug for FirecrawlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirecrawlClient")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("poll_attempts", &self.poll_attempts)
            .finish()
    }
}

/// `/v1/map` links are plain strings; newer API versions return objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MapLink {
    Url(String),
    Entry { url: String },
}

#[derive(Debug, Deserialize)]
struct MapEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    links: Vec<MapLink>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchJobEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchStatusEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: Vec<ScrapedPage>,
    #[serde(default)]
    next: Option<String>,
}

impl FirecrawlClient {
    /// Create a client with a per-request timeout.
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
            poll_interval: Duration::from_secs(2),
            poll_attempts: 30,
        })
    }

    /// Configure how batch jobs are polled.
    pub fn with_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ServiceError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ServiceError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ServiceError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl SiteMapper for FirecrawlClient {
    #[instrument(level = "info", skip_all, fields(url = %request.url))]
    async fn map_site(&self, request: &MapRequest) -> Result<MapResponse, ServiceError> {
        let t0 = Instant::now();
        let envelope: MapEnvelope = self.post_json("/v1/map", request).await?;
        if !envelope.success {
            return Err(ServiceError::Provider {
                service: SERVICE,
                message: envelope.error.unwrap_or_else(|| "map failed".to_string()),
            });
        }

        let links: Vec<String> = envelope
            .links
            .into_iter()
            .map(|link| match link {
                MapLink::Url(url) | MapLink::Entry { url } => url,
            })
            .collect();
        debug!(
            count = links.len(),
            elapsed_ms = t0.elapsed().as_millis() as u128,
            "Site map returned links"
        );
        Ok(MapResponse {
            success: true,
            links,
        })
    }
}

impl BatchScraper for FirecrawlClient {
    #[instrument(level = "info", skip_all, fields(urls = request.urls.len()))]
    async fn batch_scrape(
        &self,
        request: &BatchScrapeRequest,
    ) -> Result<ScrapeResponse, ServiceError> {
        let job: BatchJobEnvelope = self.post_json("/v1/batch/scrape", request).await?;
        let job_id = match (job.success, job.id) {
            (true, Some(id)) => id,
            (_, _) => {
                return Err(ServiceError::Provider {
                    service: SERVICE,
                    message: job
                        .error
                        .unwrap_or_else(|| "batch scrape was not accepted".to_string()),
                });
            }
        };
        debug!(%job_id, "Batch scrape job started");

        for attempt in 1..=self.poll_attempts {
            sleep(self.poll_interval).await;
            let status: BatchStatusEnvelope = self
                .get_json(&format!("/v1/batch/scrape/{}", job_id))
                .await?;
            match status.status.as_str() {
                "completed" => {
                    if status.next.is_some() {
                        warn!(%job_id, "Batch scrape result is paginated; using first page only");
                    }
                    debug!(%job_id, attempt, pages = status.data.len(), "Batch scrape completed");
                    return Ok(ScrapeResponse {
                        success: true,
                        data: status.data,
                    });
                }
                "failed" | "cancelled" => {
                    return Err(ServiceError::Provider {
                        service: SERVICE,
                        message: format!("batch scrape job {} {}", job_id, status.status),
                    });
                }
                other => debug!(%job_id, attempt, status = other, "Batch scrape still running"),
            }
        }

        Err(ServiceError::Timeout {
            service: SERVICE,
            job_id,
            attempts: self.poll_attempts,
        })
    }
}

impl SearchScraper for FirecrawlClient {
    #[instrument(level = "info", skip_all, fields(query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> Result<ScrapeResponse, ServiceError> {
        let response: ScrapeResponse = self.post_json("/v1/search", request).await?;
        if !response.success {
            return Err(ServiceError::Provider {
                service: SERVICE,
                message: "search failed".to_string(),
            });
        }
        Ok(response)
    }
}
