use serde::{Deserialize, Serialize};

/// Body the backend sends alongside a failed request.
///
/// Endpoints disagree on whether the human readable part lives in `error` or
/// `message`, so both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiFailure {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiFailure {
    pub fn reason(&self) -> Option<String> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .map(str::to_string)
    }
}
