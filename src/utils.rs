//! Utility functions for string truncation, JSON error classification, and
//! file system checks.
//!
//! All truncation here is char-boundary safe: scraped Vietnamese text is full
//! of multi-byte characters, so byte slicing would panic.

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Longest prefix of `s` with at most `max_chars` characters.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(prefix_chars("Bão số 15", 3), "Bão");
/// ```
pub fn prefix_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let prefix = prefix_chars(s, max);
    if prefix.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", prefix, s.len() - prefix.len())
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the model output is cut off by its token limit the JSON ends early
/// and fails with an EOF error, which is worth distinguishing in the logs
/// from output that is simply not JSON.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and immediately
/// deletes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_chars_multibyte() {
        assert_eq!(prefix_chars("Bão số 15", 3), "Bão");
        assert_eq!(prefix_chars("Lũ", 10), "Lũ");
        assert_eq!(prefix_chars("", 5), "");
        assert_eq!(prefix_chars("abc", 0), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_does_not_split_chars() {
        let result = truncate_for_log("Động đất", 2);
        assert!(result.starts_with("Độ"));
    }

    #[test]
    fn test_looks_truncated() {
        let err = serde_json::from_str::<serde_json::Value>(r#"[{"id": 0"#).unwrap_err();
        assert!(looks_truncated(&err));

        let err = serde_json::from_str::<serde_json::Value>("Xin lỗi").unwrap_err();
        assert!(!looks_truncated(&err));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_directory() {
        let dir = std::env::temp_dir().join(format!("vn_disaster_news_{}", std::process::id()));
        let path = dir.to_string_lossy().to_string();
        ensure_writable_dir(&path).await.unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
