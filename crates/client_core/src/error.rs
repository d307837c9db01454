use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid api base url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}{}", reason_suffix(.reason))]
    Status {
        endpoint: String,
        status: u16,
        reason: Option<String>,
    },
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
    #[error("{endpoint} reported failure: {reason}")]
    Unsuccessful { endpoint: String, reason: String },
}

impl ClientError {
    /// Failures that a later poll may not hit again.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::MalformedResponse { endpoint, .. }
            | Self::Unsuccessful { endpoint, .. } => Some(endpoint),
            Self::InvalidBaseUrl { .. } | Self::HttpClient(_) => None,
        }
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|reason| format!(": {reason}"))
        .unwrap_or_default()
}
