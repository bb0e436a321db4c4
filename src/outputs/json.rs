//! JSON feed output.
//!
//! Each run writes its [`DashboardFeed`] twice: into a directory for the
//! run's date, and as `latest.json` at the top level, which is the file the
//! dashboard polls.

use crate::models::DashboardFeed;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `feed` under `json_output_dir`, returning the dated path.
///
/// # Output Path
///
/// `{json_output_dir}/{date}/feed.json` and `{json_output_dir}/latest.json`
#[instrument(
    level = "info",
    skip_all,
    fields(json_output_dir = %json_output_dir, provenance = ?feed.provenance)
)]
pub async fn write_feed(
    feed: &DashboardFeed,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(feed)?;

    let dated_dir = PathBuf::from(json_output_dir).join(feed.updated_at.date_naive().to_string());
    if let Err(e) = fs::create_dir_all(&dated_dir).await {
        error!(dir = %dated_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let dated_path = dated_dir.join("feed.json");
    fs::write(&dated_path, &json).await?;
    let latest_path = PathBuf::from(json_output_dir).join("latest.json");
    fs::write(&latest_path, &json).await?;

    info!(
        path = %dated_path.display(),
        events = feed.events.len(),
        "Wrote dashboard feed"
    );
    Ok(dated_path)
}
