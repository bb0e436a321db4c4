//! Model-output validation and reconciliation.
//!
//! The model's answer is untrusted text. This module turns it into
//! [`DisasterEvent`]s, and never returns an error: anything it cannot use is
//! logged and dropped.
//!
//! 1. Strip a surrounding code fence, whatever the fence style.
//! 2. Parse as JSON; on failure return nothing.
//! 3. Require an array of records.
//! 4. Require each record's `id` to be a valid index into the run's articles.
//! 5. Fill each field from the model, else the article, else a fixed default.
//!    The source URL always comes from the article.
//! 6. Sort by date, most recent first, keeping input order on ties.

use crate::models::{DisasterCategory, DisasterEvent, ExtractionRecord, FetchedArticle, RunStamp};
use crate::sources::source_display_name;
use crate::utils::{looks_truncated, prefix_chars, truncate_for_log};
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_LOCATION: &str = "Việt Nam";
pub const DEFAULT_DAMAGE: &str = "Đang cập nhật";
pub const DEFAULT_NARRATIVE: &str = "Xem chi tiết tại bài báo";

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:```|~~~)[\w+-]*[ \t]*\r?\n?").expect("valid regex"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n?[ \t]*(?:```|~~~)$").expect("valid regex"));

/// Date layouts seen in model output and page metadata.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];

/// Remove a code fence wrapping the whole payload.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_leading = match LEADING_FENCE.find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    };
    let without_trailing = match TRAILING_FENCE.find(without_leading) {
        Some(m) => &without_leading[..m.start()],
        None => without_leading,
    };
    without_trailing.trim()
}

/// Reconcile raw model text against the articles it was built from.
#[instrument(level = "info", skip_all, fields(articles = articles.len()))]
pub fn reconcile(raw: &str, articles: &[FetchedArticle], stamp: &RunStamp) -> Vec<DisasterEvent> {
    let payload = strip_code_fences(raw);
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                error = %e,
                truncated = looks_truncated(&e),
                response_preview = %truncate_for_log(payload, 300),
                "Model returned non-JSON output"
            );
            return Vec::new();
        }
    };

    let Some(items) = into_record_list(value) else {
        warn!("Model output is not an array of records");
        return Vec::new();
    };

    let total = items.len();
    let retained: Vec<(usize, ExtractionRecord)> = items
        .into_iter()
        .filter_map(|item| {
            let record: ExtractionRecord = match serde_json::from_value(item) {
                Ok(record) => record,
                Err(e) => {
                    debug!(error = %e, "Dropping non-object record");
                    return None;
                }
            };
            match record_index(record.id.as_ref(), articles.len()) {
                Some(index) => Some((index, record)),
                None => {
                    debug!(id = ?record.id, "Dropping record without a valid article index");
                    None
                }
            }
        })
        .collect();

    let mut events: Vec<DisasterEvent> = retained
        .into_iter()
        .enumerate()
        .map(|(n, (index, record))| promote(record, &articles[index], stamp, n))
        .collect();

    // `sort_by` is stable, so same-day events keep the model's order.
    events.sort_by(|a, b| b.occurred_on.cmp(&a.occurred_on));

    info!(
        records = total,
        kept = events.len(),
        dropped = total - events.len(),
        "Reconciled model output"
    );
    events
}

/// The record array: a bare array, or the single array inside a wrapper object.
fn into_record_list(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) if map.len() == 1 => match map.into_iter().next() {
            Some((_, Value::Array(items))) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// Article index named by a record's `id`, if it is in range.
///
/// Accepts JSON integers, integral floats, and integer strings.
fn record_index(id: Option<&Value>, article_count: usize) -> Option<usize> {
    let index = match id? {
        Value::Number(n) => match n.as_u64() {
            Some(i) => usize::try_from(i).ok()?,
            None => {
                let f = n.as_f64()?;
                if f >= 0.0 && f.fract() == 0.0 { f as usize } else { return None }
            }
        },
        Value::String(s) => s.trim().parse::<usize>().ok()?,
        _ => return None,
    };
    (index < article_count).then_some(index)
}

/// Non-empty text from a loosely typed field.
fn text(field: Option<&Value>) -> Option<String> {
    match field? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(field: Option<&Value>) -> bool {
    match field {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "có")
        }
        _ => false,
    }
}

/// Parse a calendar date from any of the layouts we see in practice.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| NaiveDate::parse_from_str(prefix_chars(raw, 10), "%Y-%m-%d").ok())
}

/// Build the validated event for a record whose index has been checked.
fn promote(
    record: ExtractionRecord,
    article: &FetchedArticle,
    stamp: &RunStamp,
    n: usize,
) -> DisasterEvent {
    let occurred_on = text(record.occurred_on.as_ref())
        .and_then(|d| parse_date(&d))
        .or_else(|| article.published_date.as_deref().and_then(parse_date))
        .unwrap_or(stamp.today);

    DisasterEvent {
        id: stamp.event_id(n),
        title: text(record.title.as_ref()).unwrap_or_else(|| article.title.clone()),
        source_name: text(record.source_name.as_ref())
            .unwrap_or_else(|| source_display_name(&article.source_url)),
        source_url: article.source_url.clone(),
        occurred_on,
        category: text(record.category.as_ref())
            .map(|c| DisasterCategory::parse_lenient(&c))
            .unwrap_or(DisasterCategory::Other),
        location: text(record.location.as_ref()).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        damage_summary: text(record.damage_summary.as_ref())
            .unwrap_or_else(|| DEFAULT_DAMAGE.to_string()),
        narrative: text(record.narrative.as_ref()).unwrap_or_else(|| DEFAULT_NARRATIVE.to_string()),
        is_officially_verified: flag(record.is_officially_verified.as_ref()),
        confirming_agency: text(record.confirming_agency.as_ref()),
    }
}
