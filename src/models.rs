//! Data models for one pipeline run and the feed handed to the dashboard.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FetchedArticle`]: Scraped article content, indexed by position within a run
//! - [`ExtractionRecord`]: Untrusted, all-optional model output for one article
//! - [`DisasterEvent`]: A validated event, the only type that leaves the pipeline
//! - [`DashboardFeed`]: The event collection plus its provenance (live or sample)
//!
//! The JSON representations use camelCase field names to match the schema
//! the model is asked to produce and the shape the dashboard consumes.

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed set of disaster categories.
///
/// Serialized as upper-case codes (`"FLOOD"`, `"STORM"`, ...), which is also
/// the vocabulary given to the model in the extraction schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisasterCategory {
    Flood,
    Storm,
    Landslide,
    Earthquake,
    Drought,
    Other,
}

impl DisasterCategory {
    /// Every category, in display order.
    pub const ALL: [DisasterCategory; 6] = [
        DisasterCategory::Flood,
        DisasterCategory::Storm,
        DisasterCategory::Landslide,
        DisasterCategory::Earthquake,
        DisasterCategory::Drought,
        DisasterCategory::Other,
    ];

    /// Upper-case code used on the wire.
    pub fn code(self) -> &'static str {
        match self {
            DisasterCategory::Flood => "FLOOD",
            DisasterCategory::Storm => "STORM",
            DisasterCategory::Landslide => "LANDSLIDE",
            DisasterCategory::Earthquake => "EARTHQUAKE",
            DisasterCategory::Drought => "DROUGHT",
            DisasterCategory::Other => "OTHER",
        }
    }

    /// Vietnamese label shown on the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            DisasterCategory::Flood => "Lũ lụt",
            DisasterCategory::Storm => "Bão / Áp thấp",
            DisasterCategory::Landslide => "Sạt lở đất",
            DisasterCategory::Earthquake => "Động đất",
            DisasterCategory::Drought => "Hạn hán",
            DisasterCategory::Other => "Khác",
        }
    }

    /// Lenient parse of whatever the model put in the category field.
    ///
    /// Accepts the wire code or English name in any case, and the Vietnamese
    /// label. Anything unrecognized is [`DisasterCategory::Other`].
    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim();
        let upper = trimmed.to_uppercase();
        for category in Self::ALL {
            if upper == category.code() || trimmed == category.label() {
                return category;
            }
        }
        DisasterCategory::Other
    }
}

/// A scraped article, owned by a single run.
///
/// Its position in the run's article list is the join key the reconciler
/// uses to map model output back to this record.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedArticle {
    /// The authoritative article URL, taken from the scrape, never the model.
    pub source_url: String,
    /// Page title from the scrape metadata.
    pub title: String,
    /// Publication date from the page metadata, in whatever form the site uses.
    pub published_date: Option<String>,
    /// Main-content markdown of the page.
    pub body_text: String,
}

/// One element of the model's output array, before validation.
///
/// Every field is optional and untyped: the model is free to omit fields,
/// emit numbers as strings, or invent values. Only the reconciler promotes
/// this to a [`DisasterEvent`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
    pub id: Option<Value>,
    pub title: Option<Value>,
    pub source_name: Option<Value>,
    pub occurred_on: Option<Value>,
    pub category: Option<Value>,
    pub location: Option<Value>,
    pub damage_summary: Option<Value>,
    pub narrative: Option<Value>,
    pub is_officially_verified: Option<Value>,
    pub confirming_agency: Option<Value>,
}

/// A validated disaster event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisasterEvent {
    /// Run-scoped identifier, unique within a run.
    pub id: String,
    pub title: String,
    /// Newspaper name.
    pub source_name: String,
    /// Article URL; always a detail page, never a listing page.
    pub source_url: String,
    pub occurred_on: NaiveDate,
    pub category: DisasterCategory,
    pub location: String,
    /// Informal casualty and loss figures.
    pub damage_summary: String,
    /// Short summary of the article.
    pub narrative: String,
    /// Whether an official agency is cited.
    pub is_officially_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirming_agency: Option<String>,
}

/// Identity of one run: when it started and what "today" is for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStamp {
    /// Run start, milliseconds since the Unix epoch.
    pub started_at_millis: i64,
    /// Date used for events whose date cannot be parsed.
    pub today: NaiveDate,
}

impl RunStamp {
    /// Stamp for a run starting now.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            started_at_millis: now.timestamp_millis(),
            today: now.date_naive(),
        }
    }

    /// Identifier for the `n`th event produced by this run.
    pub fn event_id(&self, n: usize) -> String {
        format!("fc-{}-{}", self.started_at_millis, n)
    }
}

/// Where the events in a feed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Produced by a pipeline run.
    Live,
    /// The built-in fallback collection.
    Sample,
}

/// The collection handed to the dashboard layer.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFeed {
    pub provenance: Provenance,
    pub updated_at: DateTime<Local>,
    pub events: Vec<DisasterEvent>,
}

impl DashboardFeed {
    /// Wrap a run's output, falling back to `sample` when the run produced nothing.
    pub fn from_run(
        events: Vec<DisasterEvent>,
        sample: impl FnOnce() -> Vec<DisasterEvent>,
    ) -> Self {
        let (provenance, events) = if events.is_empty() {
            (Provenance::Sample, sample())
        } else {
            (Provenance::Live, events)
        };
        Self {
            provenance,
            updated_at: Local::now(),
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> DisasterEvent {
        DisasterEvent {
            id: id.to_string(),
            title: "Lũ quét ở Nghệ An".to_string(),
            source_name: "Dân Trí".to_string(),
            source_url: "https://dantri.com.vn/xa-hoi/lu-quet-nghe-an-20251212.htm".to_string(),
            occurred_on: NaiveDate::from_ymd_opt(2025, 12, 12).unwrap(),
            category: DisasterCategory::Landslide,
            location: "Kỳ Sơn, Nghệ An".to_string(),
            damage_summary: "200 nhà trôi".to_string(),
            narrative: "Sơ tán kịp thời.".to_string(),
            is_officially_verified: true,
            confirming_agency: None,
        }
    }

    #[test]
    fn test_category_parse_lenient() {
        assert_eq!(DisasterCategory::parse_lenient("FLOOD"), DisasterCategory::Flood);
        assert_eq!(DisasterCategory::parse_lenient(" storm "), DisasterCategory::Storm);
        assert_eq!(DisasterCategory::parse_lenient("Sạt lở đất"), DisasterCategory::Landslide);
        assert_eq!(DisasterCategory::parse_lenient("Earthquake"), DisasterCategory::Earthquake);
        assert_eq!(DisasterCategory::parse_lenient("TSUNAMI"), DisasterCategory::Other);
        assert_eq!(DisasterCategory::parse_lenient(""), DisasterCategory::Other);
    }

    #[test]
    fn test_category_serializes_as_code() {
        let json = serde_json::to_string(&DisasterCategory::Drought).unwrap();
        assert_eq!(json, "\"DROUGHT\"");
    }

    #[test]
    fn test_event_serialization_camel_case() {
        let json = serde_json::to_value(event("fc-1-0")).unwrap();
        assert_eq!(json["sourceName"], "Dân Trí");
        assert_eq!(json["occurredOn"], "2025-12-12");
        assert_eq!(json["isOfficiallyVerified"], true);
        assert!(json.get("confirmingAgency").is_none());
    }

    #[test]
    fn test_extraction_record_tolerates_missing_and_unknown_fields() {
        let record: ExtractionRecord =
            serde_json::from_str(r#"{"id": 2, "sourceUrl": "https://x.vn", "title": "Bão"}"#)
                .unwrap();
        assert_eq!(record.id, Some(Value::from(2)));
        assert!(record.location.is_none());
    }

    #[test]
    fn test_run_stamp_event_ids_unique_within_run() {
        let stamp = RunStamp {
            started_at_millis: 1_700_000_000_000,
            today: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        assert_eq!(stamp.event_id(0), "fc-1700000000000-0");
        assert_ne!(stamp.event_id(0), stamp.event_id(1));
    }

    #[test]
    fn test_feed_falls_back_to_sample() {
        let feed = DashboardFeed::from_run(Vec::new(), || vec![event("1")]);
        assert_eq!(feed.provenance, Provenance::Sample);
        assert_eq!(feed.events.len(), 1);

        let feed = DashboardFeed::from_run(vec![event("fc-1-0")], Vec::new);
        assert_eq!(feed.provenance, Provenance::Live);
    }
}
