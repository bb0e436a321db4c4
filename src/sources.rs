//! Trusted news domains and their crawl entry points.
//!
//! | Domain | Newspaper | Entry point |
//! |--------|-----------|-------------|
//! | baotintuc.vn | Báo Tin Tức (TTXVN) | `/xa-hoi` |
//! | sggp.org.vn | Sài Gòn Giải Phóng | `/thoi-su` |
//! | vnexpress.net | VnExpress | `/thoi-su/thien-tai` |
//! | vietnamnet.vn | VietnamNet | `/thoi-su` |
//! | dantri.com.vn | Dân Trí | `/xa-hoi` |
//! | baomoi.com | Báo Mới | root |
//! | thanhnien.vn | Thanh Niên | `/thoi-su` |
//! | vnanet.vn | Vnanet (TTXVN) | root |
//! | tuoitre.vn | Tuổi Trẻ | `/thoi-su` |
//! | nld.com.vn | Người Lao Động | `/xa-hoi` |
//! | laodong.vn | Lao Động | `/xa-hoi` |
//! | qdnd.vn | Quân Đội Nhân Dân | `/xa-hoi` (on `www.`) |

use rand::rng;
use rand::seq::IndexedRandom;
use url::Url;

/// A whitelisted outlet.
#[derive(Debug, Clone, Copy)]
pub struct NewsSource {
    pub domain: &'static str,
    pub name: &'static str,
    /// Category page to start discovery from, when one is curated.
    pub entry_point: Option<&'static str>,
}

pub const NEWS_SOURCES: &[NewsSource] = &[
    NewsSource {
        domain: "baotintuc.vn",
        name: "Báo Tin Tức (TTXVN)",
        entry_point: Some("https://baotintuc.vn/xa-hoi"),
    },
    NewsSource {
        domain: "sggp.org.vn",
        name: "Sài Gòn Giải Phóng",
        entry_point: Some("https://sggp.org.vn/thoi-su"),
    },
    NewsSource {
        domain: "vnexpress.net",
        name: "VnExpress",
        entry_point: Some("https://vnexpress.net/thoi-su/thien-tai"),
    },
    NewsSource {
        domain: "vietnamnet.vn",
        name: "VietnamNet",
        entry_point: Some("https://vietnamnet.vn/thoi-su"),
    },
    NewsSource {
        domain: "dantri.com.vn",
        name: "Dân Trí",
        entry_point: Some("https://dantri.com.vn/xa-hoi"),
    },
    NewsSource {
        domain: "baomoi.com",
        name: "Báo Mới",
        entry_point: None,
    },
    NewsSource {
        domain: "thanhnien.vn",
        name: "Thanh Niên",
        entry_point: Some("https://thanhnien.vn/thoi-su"),
    },
    NewsSource {
        domain: "vnanet.vn",
        name: "Vnanet (TTXVN)",
        entry_point: None,
    },
    NewsSource {
        domain: "tuoitre.vn",
        name: "Tuổi Trẻ",
        entry_point: Some("https://tuoitre.vn/thoi-su"),
    },
    NewsSource {
        domain: "nld.com.vn",
        name: "Người Lao Động",
        entry_point: Some("https://nld.com.vn/xa-hoi"),
    },
    NewsSource {
        domain: "laodong.vn",
        name: "Lao Động",
        entry_point: Some("https://laodong.vn/xa-hoi"),
    },
    NewsSource {
        domain: "qdnd.vn",
        name: "Quân Đội Nhân Dân",
        entry_point: Some("https://www.qdnd.vn/xa-hoi"),
    },
];

/// Name used when a URL's host cannot be determined.
const UNKNOWN_SOURCE: &str = "Nguồn Internet";

/// Lowercase a host and drop a leading `www.`.
pub fn normalize_host(host: &str) -> String {
    let lowered = host.trim().to_ascii_lowercase();
    lowered
        .strip_prefix("www.")
        .map(str::to_string)
        .unwrap_or(lowered)
}

/// Normalized host of `url`, if it parses and has one.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|u| u.host_str().map(normalize_host))
}

/// Whether `host` is `domain` itself or one of its subdomains.
fn host_within(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Whether `url` lives on the same site as `entry_point` (or a subdomain of it).
pub fn is_same_site(url: &str, entry_point: &str) -> bool {
    match (host_of(url), host_of(entry_point)) {
        (Some(host), Some(site)) => host_within(&host, &site),
        _ => false,
    }
}

fn find_source(domain: &str) -> Option<&'static NewsSource> {
    let domain = normalize_host(domain);
    NEWS_SOURCES.iter().find(|s| s.domain == domain)
}

/// Best crawl entry point for `domain`: its curated category page, else the
/// domain root over HTTPS.
pub fn resolve_entry_point(domain: &str) -> String {
    match find_source(domain).and_then(|s| s.entry_point) {
        Some(entry_point) => entry_point.to_string(),
        None => format!("https://{}", domain.trim()),
    }
}

/// Whether `url` is hosted on one of the whitelisted domains (or a subdomain).
pub fn is_allowed_url(url: &str) -> bool {
    let Some(host) = host_of(url) else {
        return false;
    };
    NEWS_SOURCES.iter().any(|s| host_within(&host, s.domain))
}

/// Newspaper name for an article URL.
///
/// Known outlets get their masthead name; other hosts are returned without
/// `www.`; unparseable URLs get a generic label.
pub fn source_display_name(url: &str) -> String {
    let Some(host) = host_of(url) else {
        return UNKNOWN_SOURCE.to_string();
    };
    match NEWS_SOURCES.iter().find(|s| host_within(&host, s.domain)) {
        Some(source) => source.name.to_string(),
        None => host,
    }
}

/// Domains to crawl this run: all of them, or a random subset of `count`.
pub fn sample_domains(count: Option<usize>) -> Vec<&'static str> {
    let domains: Vec<&'static str> = NEWS_SOURCES.iter().map(|s| s.domain).collect();
    match count {
        Some(n) if n < domains.len() => domains.choose_multiple(&mut rng(), n).copied().collect(),
        _ => domains,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_resolve_curated_entry_point() {
        assert_eq!(
            resolve_entry_point("vnexpress.net"),
            "https://vnexpress.net/thoi-su/thien-tai"
        );
        assert_eq!(resolve_entry_point("www.qdnd.vn"), "https://www.qdnd.vn/xa-hoi");
    }

    #[test]
    fn test_resolve_falls_back_to_root() {
        assert_eq!(resolve_entry_point("baomoi.com"), "https://baomoi.com");
        assert_eq!(resolve_entry_point("example.vn"), "https://example.vn");
    }

    #[test]
    fn test_is_allowed_url() {
        assert!(is_allowed_url("https://vnexpress.net/lu-4789123.html"));
        assert!(is_allowed_url("https://www.qdnd.vn/xa-hoi/bao-20251126"));
        assert!(is_allowed_url("https://e.vnexpress.net/news/flood-4789123.html"));
        assert!(!is_allowed_url("https://notvnexpress.net/lu-4789123.html"));
        assert!(!is_allowed_url("garbage"));
    }

    #[test]
    fn test_is_same_site() {
        let entry = "https://www.qdnd.vn/xa-hoi";
        assert!(is_same_site("https://qdnd.vn/xa-hoi/lu-20251126", entry));
        assert!(is_same_site("https://en.qdnd.vn/society/flood-20251126", entry));
        assert!(!is_same_site("https://evil.example/lu-lut-2025.html", entry));
        assert!(!is_same_site("https://notqdnd.vn/lu-2025.html", entry));
        assert!(!is_same_site("not a url", entry));
    }

    #[test]
    fn test_source_display_name() {
        assert_eq!(source_display_name("https://dantri.com.vn/xa-hoi/a.htm"), "Dân Trí");
        assert_eq!(source_display_name("https://www.example.org/a"), "example.org");
        assert_eq!(source_display_name("::"), "Nguồn Internet");
    }

    #[test]
    fn test_sample_domains() {
        assert_eq!(sample_domains(None).len(), NEWS_SOURCES.len());
        assert_eq!(sample_domains(Some(100)).len(), NEWS_SOURCES.len());

        let picked = sample_domains(Some(4));
        assert_eq!(picked.len(), 4);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 4);
    }
}
