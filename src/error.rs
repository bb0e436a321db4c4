//! Error types for the external-service seams and configuration loading.
//!
//! Pipeline stages never let these escape: each stage logs the error at its
//! boundary and degrades to an empty result. They exist so that the clients
//! in [`crate::api`] and [`crate::scrapers`] can report *what* went wrong with
//! enough structure for the logs to be useful.

use thiserror::Error;

/// A failure talking to one of the external services (site map, scrape,
/// search, or language model).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level failure (DNS, TLS, connection reset, client timeout).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered 2xx but its envelope reports failure.
    #[error("{service} reported failure: {message}")]
    Provider {
        service: &'static str,
        message: String,
    },

    /// The response body could not be decoded into the expected envelope.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A polled job did not finish within the configured number of attempts.
    #[error("{service} job {job_id} did not complete after {attempts} polls")]
    Timeout {
        service: &'static str,
        job_id: String,
        attempts: u32,
    },

    /// The model answered without any text candidate.
    #[error("{0} returned no content")]
    EmptyResponse(&'static str),
}

impl ServiceError {
    /// Whether the same request could succeed if sent again: transport
    /// failures, empty answers, rate limiting and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Http(_) | ServiceError::EmptyResponse(_) => true,
            ServiceError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// A failure loading the YAML pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
