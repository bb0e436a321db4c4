//! Link discovery across trusted sites.
//!
//! One site-map request per entry point, all in flight at once. Each site's
//! answer is classified and capped independently, and a failing site only
//! costs its own links. The stage finishes when every request has settled.

use crate::classifier::is_article_url;
use crate::scrapers::{MapRequest, SiteMapper};
use crate::sources::is_same_site;
use futures::future::join_all;
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Knobs for one discovery pass.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryLimits {
    /// Article links kept per site.
    pub per_site: usize,
    /// Links requested from each site map.
    pub map_results: usize,
}

/// Discover article links for every entry point.
///
/// Returns the concatenation of each site's article links, deduplicated by
/// exact string match with first-seen order preserved. An empty result is a
/// valid outcome.
#[instrument(level = "info", skip_all, fields(sites = entry_points.len(), %topic_phrase))]
pub async fn discover_links<M: SiteMapper>(
    mapper: &M,
    entry_points: &[String],
    topic_phrase: &str,
    limits: DiscoveryLimits,
) -> Vec<String> {
    let lookups = entry_points
        .iter()
        .map(|entry_point| discover_site(mapper, entry_point, topic_phrase, limits));
    let per_site = join_all(lookups).await;

    let found: usize = per_site.iter().map(Vec::len).sum();
    let links = dedup_links(per_site.into_iter().flatten());
    info!(found, unique = links.len(), "Link discovery finished");
    links
}

/// Map one site and keep its first `per_site` article links.
async fn discover_site<M: SiteMapper>(
    mapper: &M,
    entry_point: &str,
    topic_phrase: &str,
    limits: DiscoveryLimits,
) -> Vec<String> {
    let request = MapRequest {
        url: entry_point.to_string(),
        search: topic_phrase.to_string(),
        limit: limits.map_results,
        ignore_sitemap: true,
    };

    match mapper.map_site(&request).await {
        Ok(response) if response.success => {
            let links = select_article_links(entry_point, response.links, limits.per_site);
            debug!(%entry_point, kept = links.len(), "Site mapped");
            links
        }
        Ok(_) => {
            warn!(%entry_point, "Site map reported failure; skipping site");
            Vec::new()
        }
        Err(e) => {
            warn!(%entry_point, error = %e, "Site map request failed; skipping site");
            Vec::new()
        }
    }
}

/// Keep the first `limit` links that stay on `entry_point`'s site and look
/// like articles.
pub fn select_article_links(entry_point: &str, links: Vec<String>, limit: usize) -> Vec<String> {
    links
        .into_iter()
        .map(|link| link.trim().to_string())
        .filter(|link| is_same_site(link, entry_point) && is_article_url(link))
        .take(limit)
        .collect()
}

/// Exact-match dedup, first occurrence wins.
pub fn dedup_links(links: impl IntoIterator<Item = String>) -> Vec<String> {
    links.into_iter().unique().collect()
}
