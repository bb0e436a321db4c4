//! Article-likeness heuristic for discovered URLs.
//!
//! News sites publish articles under stable numeric-ID or long slugged
//! paths, and navigation under short paths. The classifier looks only at the
//! URL, so it costs no extra request; it favors recall over precision.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Path segments that mark listing, section, or media pages.
const LISTING_MARKERS: &[&str] = &[
    "tag",
    "tags",
    "category",
    "categories",
    "topic",
    "topics",
    "search",
    "video",
    "videos",
    "media",
    "rss",
    "feed",
    "feeds",
];

/// Paths longer than this are treated as slugged article paths.
const MIN_SLUG_PATH_LEN: usize = 25;

static ARTICLE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4,}").expect("valid regex"));

/// Whether `raw` looks like an article detail page.
///
/// Returns `false` for malformed URLs, the domain root, and any path with a
/// listing marker segment. The marker check wins over every positive signal.
/// Otherwise returns `true` if the path ends in `.html`/`.htm`, contains a
/// run of at least four digits, or is longer than 25 characters.
pub fn is_article_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw.trim()) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    let path = url.path();
    if path.is_empty() || path == "/" {
        return false;
    }

    let lowered = path.to_ascii_lowercase();
    if lowered
        .split('/')
        .filter(|segment| !segment.is_empty())
        .any(is_listing_segment)
    {
        return false;
    }

    lowered.ends_with(".html")
        || lowered.ends_with(".htm")
        || ARTICLE_ID.is_match(&lowered)
        || path.chars().count() > MIN_SLUG_PATH_LEN
}

/// A segment is a listing marker if it is the marker itself, or the marker
/// followed by `-` or `.` (`tag-bao-lu`, `rss.xml`).
fn is_listing_segment(segment: &str) -> bool {
    LISTING_MARKERS.iter().any(|marker| {
        segment == *marker
            || segment
                .strip_prefix(marker)
                .is_some_and(|rest| rest.starts_with('-') || rest.starts_with('.'))
    })
}
