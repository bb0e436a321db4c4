//! Article content fetching.
//!
//! All discovered URLs go out in a single batch-scrape request for
//! main-content markdown. A failed request yields no articles rather than an
//! error; the orchestrator treats that as "no data this run".
//!
//! The service does not promise results in request order, so each page is
//! matched back to the URL that was asked for by the URLs it reports. The
//! requested URL, which already passed the classifier, becomes the article's
//! `source_url`. Pages that were redirected onto a listing page are dropped.

use crate::classifier::is_article_url;
use crate::models::FetchedArticle;
use crate::scrapers::{BatchScrapeRequest, BatchScraper, ScrapedPage};
use crate::utils::prefix_chars;
use tracing::{debug, error, info, instrument, warn};

/// Title used when a page has no title metadata.
pub const UNKNOWN_TITLE: &str = "Không rõ";

/// Fetch article text for `urls` in one batch.
#[instrument(level = "info", skip_all, fields(urls = urls.len()))]
pub async fn fetch_articles<S: BatchScraper>(scraper: &S, urls: &[String]) -> Vec<FetchedArticle> {
    if urls.is_empty() {
        return Vec::new();
    }

    let request = BatchScrapeRequest::markdown(urls.to_vec());
    let response = match scraper.batch_scrape(&request).await {
        Ok(response) if response.success => response,
        Ok(_) => {
            error!("Batch scrape reported failure");
            return Vec::new();
        }
        Err(e) => {
            error!(error = %e, "Batch scrape failed");
            return Vec::new();
        }
    };

    let articles: Vec<FetchedArticle> = response
        .data
        .into_iter()
        .filter_map(|page| {
            let Some(requested) = match_requested(&page, urls) else {
                let reported: Vec<&str> = page.reported_urls().collect();
                warn!(?reported, "Scraped page matches no requested URL; skipping");
                return None;
            };
            page_to_article(page, Some(requested))
        })
        .collect();
    info!(requested = urls.len(), fetched = articles.len(), "Fetched article contents");
    articles
}

/// The requested URL this page answers, by exact match on any URL it reports.
fn match_requested<'a>(page: &ScrapedPage, urls: &'a [String]) -> Option<&'a str> {
    page.reported_urls()
        .map(str::trim)
        .find_map(|reported| urls.iter().find(|u| u.as_str() == reported))
        .map(String::as_str)
}

/// Convert a scraped page into an article.
///
/// `requested_url` wins over whatever the page reports; without one the
/// page's own URL is used. Pages without content are dropped, as are pages
/// whose URL or post-redirect URL is not an article.
pub fn page_to_article(page: ScrapedPage, requested_url: Option<&str>) -> Option<FetchedArticle> {
    let Some(source_url) = requested_url
        .or(page.resolved_url())
        .map(|u| u.trim().to_string())
    else {
        warn!("Scraped page has no URL; skipping");
        return None;
    };

    if !is_article_url(&source_url) {
        debug!(%source_url, "Scraped page is not an article; skipping");
        return None;
    }
    if let Some(landed) = page.final_url().filter(|u| !is_article_url(u)) {
        warn!(%source_url, %landed, "Article redirected to a listing page; skipping");
        return None;
    }

    let body_text = page.markdown.as_deref().unwrap_or_default().trim().to_string();
    if body_text.is_empty() {
        debug!(%source_url, "Scraped page has no content; skipping");
        return None;
    }

    let title = page
        .resolved_title()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_TITLE)
        .to_string();

    Some(FetchedArticle {
        published_date: page.published_date().map(str::to_string),
        source_url,
        title,
        body_text,
    })
}

/// Prefix of `body` holding at most `budget` characters.
pub fn truncate_body(body: &str, budget: usize) -> &str {
    prefix_chars(body, budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::scrapers::{PageMetadata, ScrapeResponse};
    use std::sync::Mutex;

    struct StubScraper {
        response: Option<ScrapeResponse>,
        requests: Mutex<Vec<BatchScrapeRequest>>,
    }

    impl BatchScraper for StubScraper {
        async fn batch_scrape(
            &self,
            request: &BatchScrapeRequest,
        ) -> Result<ScrapeResponse, ServiceError> {
            self.requests.lock().unwrap().push(request.clone());
            self.response.clone().ok_or(ServiceError::EmptyResponse("stub"))
        }
    }

    fn redirected(requested: &str, landed: &str) -> ScrapedPage {
        let mut redirected = page(Some(requested), Some("Trang chủ"), "Tin mới nhất");
        redirected.metadata.url = Some(landed.to_string());
        redirected
    }

    fn page(url: Option<&str>, title: Option<&str>, markdown: &str) -> ScrapedPage {
        ScrapedPage {
            url: None,
            title: None,
            markdown: Some(markdown.to_string()),
            metadata: PageMetadata {
                source_url: url.map(str::to_string),
                title: title.map(str::to_string),
                date: Some("2025-11-21".to_string()),
                ..Default::default()
            },
        }
    }

    fn urls() -> Vec<String> {
        vec![
            "https://vnexpress.net/lu-4789123.html".to_string(),
            "https://tuoitre.vn/dong-dat-2025.htm".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_fetch_matches_pages_by_url() {
        let scraper = StubScraper {
            response: Some(ScrapeResponse {
                success: true,
                data: vec![
                    page(Some("https://tuoitre.vn/dong-dat-2025.htm"), None, "Động đất 4,9 độ"),
                    page(Some("https://vnexpress.net/lu-4789123.html"), Some("Lũ"), "Mưa lũ"),
                ],
            }),
            requests: Mutex::new(Vec::new()),
        };

        let articles = fetch_articles(&scraper, &urls()).await;
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source_url, "https://tuoitre.vn/dong-dat-2025.htm");
        assert_eq!(articles[0].title, UNKNOWN_TITLE);
        assert_eq!(articles[1].source_url, "https://vnexpress.net/lu-4789123.html");
        assert_eq!(articles[1].title, "Lũ");
        assert_eq!(articles[1].published_date.as_deref(), Some("2025-11-21"));

        let requests = scraper.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].urls, urls());
        assert!(requests[0].only_main_content);
    }

    #[tokio::test]
    async fn test_fetch_drops_unmatched_and_redirected_pages() {
        let scraper = StubScraper {
            response: Some(ScrapeResponse {
                success: true,
                data: vec![
                    redirected("https://vnexpress.net/lu-4789123.html", "https://vnexpress.net/"),
                    page(None, Some("Không có URL"), "Nội dung"),
                    page(Some("https://other.vn/bai-viet-2025.html"), None, "Nội dung khác"),
                    page(Some("https://tuoitre.vn/dong-dat-2025.htm"), None, "Động đất"),
                ],
            }),
            requests: Mutex::new(Vec::new()),
        };

        let articles = fetch_articles(&scraper, &urls()).await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].source_url, "https://tuoitre.vn/dong-dat-2025.htm");
    }

    #[test]
    fn test_requested_url_is_authoritative() {
        let mut moved = page(Some("https://vnexpress.net/lu-4789123.html"), None, "Mưa lũ");
        moved.metadata.url = Some("https://vnexpress.net/lu-moi-4789999.html".to_string());
        let article =
            page_to_article(moved, Some("https://vnexpress.net/lu-4789123.html")).unwrap();
        assert_eq!(article.source_url, "https://vnexpress.net/lu-4789123.html");

        let home = redirected("https://vnexpress.net/lu-4789123.html", "https://vnexpress.net/");
        assert!(page_to_article(home, Some("https://vnexpress.net/lu-4789123.html")).is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty() {
        let scraper = StubScraper {
            response: None,
            requests: Mutex::new(Vec::new()),
        };
        assert!(fetch_articles(&scraper, &urls()).await.is_empty());

        let unsuccessful = StubScraper {
            response: Some(ScrapeResponse::default()),
            requests: Mutex::new(Vec::new()),
        };
        assert!(fetch_articles(&unsuccessful, &urls()).await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_skips_request_for_no_urls() {
        let scraper = StubScraper {
            response: None,
            requests: Mutex::new(Vec::new()),
        };
        assert!(fetch_articles(&scraper, &[]).await.is_empty());
        assert!(scraper.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_page_is_dropped() {
        let blank = page(Some("https://a.vn/x-2025.html"), None, "  ");
        assert!(page_to_article(blank, None).is_none());
    }

    #[test]
    fn test_truncate_body_takes_prefix() {
        let body = "Bão số 15 đổ bộ miền Trung";
        assert_eq!(truncate_body(body, 9), "Bão số 15");
        assert_eq!(truncate_body(body, 1000), body);
    }
}
