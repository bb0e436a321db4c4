//! Command-line interface definitions.
//!
//! All credentials can be provided via flags or environment variables.

use crate::config::DiscoveryMode;
use clap::Parser;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Live run, keys from the environment
/// FIRECRAWL_API_KEY=fc-... GEMINI_API_KEY=... vn_disaster_news -j ./json
///
/// # Tuned run with the alternate search discovery path
/// vn_disaster_news -j ./json -c pipeline.yaml --mode search
///
/// # Reset the feed to the built-in sample events
/// vn_disaster_news -j ./json --sample-only
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON feed
    #[arg(short, long)]
    pub json_output_dir: String,

    /// Optional path to a YAML pipeline config
    #[arg(short, long)]
    pub config: Option<String>,

    /// Firecrawl API key
    #[arg(long, env = "FIRECRAWL_API_KEY", hide_env_values = true)]
    pub firecrawl_api_key: Option<String>,

    /// Gemini API key (falls back to API_KEY)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Discovery mode, overriding the config file
    #[arg(long, value_enum)]
    pub mode: Option<DiscoveryMode>,

    /// Skip the pipeline and write the sample events
    #[arg(long)]
    pub sample_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "vn_disaster_news",
            "--json-output-dir",
            "./json",
            "--firecrawl-api-key",
            "fc-key",
            "--gemini-api-key",
            "g-key",
        ]);

        assert_eq!(cli.json_output_dir, "./json");
        assert_eq!(cli.firecrawl_api_key.as_deref(), Some("fc-key"));
        assert_eq!(cli.gemini_api_key.as_deref(), Some("g-key"));
        assert!(cli.mode.is_none());
        assert!(!cli.sample_only);
    }

    #[test]
    fn test_cli_short_flags_and_mode() {
        let cli = Cli::parse_from([
            "vn_disaster_news",
            "-j",
            "/tmp/json",
            "-c",
            "pipeline.yaml",
            "--mode",
            "search",
            "--sample-only",
        ]);

        assert_eq!(cli.json_output_dir, "/tmp/json");
        assert_eq!(cli.config.as_deref(), Some("pipeline.yaml"));
        assert_eq!(cli.mode, Some(DiscoveryMode::Search));
        assert!(cli.sample_only);
    }
}
