use serde_json::Value;

/// Failure talking to a third-party listing source.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("API key is required")]
    MissingKey,
    #[error("{0} is not configured")]
    Unconfigured(&'static str),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request failed with status code {status}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FeedError {
    /// Upstream HTTP status, when the vendor answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FeedError::Status { status, .. } => Some(*status),
            FeedError::Transport { source, .. } => source.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Upstream response body for diagnostics; JSON when it parses, text otherwise.
    pub fn body(&self) -> Option<Value> {
        match self {
            FeedError::Status { body, .. } if !body.is_empty() => Some(
                serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.clone())),
            ),
            _ => None,
        }
    }

    /// A 404 marks the end of a paginated feed rather than a failure.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Walking a paginated feed stopped on a failure other than the end-of-data boundary.
#[derive(Debug, thiserror::Error)]
#[error("feed page {file_index} failed: {source}")]
pub struct AggregateError {
    pub file_index: usize,
    #[source]
    pub source: FeedError,
}

/// Single-record lookup against an aggregated feed.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("Property not found")]
    NotFound {
        property_id: String,
        requested_id: String,
        searched: usize,
    },
}
