use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /api/issues/{key}/sla`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlaResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SlaData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaData {
    #[serde(default)]
    pub cycles: Vec<SlaCycle>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_secondary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaCycle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_duration: Option<SlaDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<SlaDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<SlaDuration>,
    #[serde(default)]
    pub breached: bool,
    #[serde(default)]
    pub paused: bool,
}

/// SLA durations arrive as raw milliseconds, as JIRA style `{millis, friendly}`
/// objects, or as friendly strings such as `"3h 20m"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlaDuration {
    Millis(i64),
    Detailed {
        millis: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        friendly: Option<String>,
    },
    Friendly(String),
}

impl SlaDuration {
    pub fn millis(&self) -> Option<i64> {
        match self {
            Self::Millis(millis) | Self::Detailed { millis, .. } => Some(*millis),
            Self::Friendly(text) => parse_friendly_millis(text),
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        self.millis().map(Duration::milliseconds)
    }

    pub fn friendly(&self) -> String {
        match self {
            Self::Detailed {
                friendly: Some(friendly),
                ..
            } => friendly.clone(),
            Self::Friendly(text) => text.trim().to_string(),
            Self::Millis(millis) | Self::Detailed { millis, .. } => {
                format_duration(Duration::milliseconds(*millis))
            }
        }
    }
}

/// Parses `"1d 2h 30m"`-style strings. A leading `-` marks an overdue value.
pub fn parse_friendly_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest.trim_start()),
        None => (1, text),
    };

    let mut total: i64 = 0;
    let mut seen_any = false;
    for token in body.split_whitespace() {
        let split = token.find(|c: char| !c.is_ascii_digit())?;
        let (digits, unit) = token.split_at(split);
        let amount: i64 = digits.parse().ok()?;
        let unit_millis = match unit {
            "d" => 86_400_000,
            "h" => 3_600_000,
            "m" => 60_000,
            "s" => 1_000,
            _ => return None,
        };
        total = total.checked_add(amount.checked_mul(unit_millis)?)?;
        seen_any = true;
    }

    seen_any.then_some(sign * total)
}

pub fn format_duration(duration: Duration) -> String {
    let negative = duration < Duration::zero();
    let total_minutes = duration.num_minutes().abs();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    let body = if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    };
    if negative {
        format!("-{body}")
    } else {
        body
    }
}

/// Condensed view of the most recent SLA cycle, as stored in the UI context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_used: Option<f64>,
    pub breached: bool,
    pub paused: bool,
    pub is_default: bool,
    pub is_secondary: bool,
    pub cycle_count: usize,
}

impl SlaData {
    /// Summarises the last cycle; `None` when the issue has no SLA cycles.
    pub fn summary(&self) -> Option<SlaSummary> {
        let cycle = self.cycles.last()?;
        let goal_millis = cycle.goal_duration.as_ref().and_then(SlaDuration::millis);
        let elapsed_millis = cycle.elapsed_time.as_ref().and_then(SlaDuration::millis);
        let remaining_millis = cycle.remaining_time.as_ref().and_then(SlaDuration::millis);
        let percent_used = match (goal_millis, elapsed_millis) {
            (Some(goal), Some(elapsed)) if goal > 0 => {
                Some(((elapsed as f64 / goal as f64) * 1000.0).round() / 10.0)
            }
            _ => None,
        };

        Some(SlaSummary {
            goal_millis,
            elapsed_millis,
            remaining_millis,
            remaining_label: cycle.remaining_time.as_ref().map(SlaDuration::friendly),
            percent_used,
            breached: cycle.breached,
            paused: cycle.paused,
            is_default: self.is_default,
            is_secondary: self.is_secondary,
            cycle_count: self.cycles.len(),
        })
    }
}

/// `GET /api/ml/preload/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MlPreloadStatusResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MlPreloadStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlPreloadStatus {
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MlPreloadStatus {
    pub fn progress_percent(&self) -> u8 {
        if self.progress.is_nan() {
            return 0;
        }
        self.progress.clamp(0.0, 100.0).round() as u8
    }

    pub fn is_finished(&self) -> bool {
        !self.is_loading || self.error.is_some()
    }
}

/// `POST /api/ml/preload`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartPreloadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

pub type ModelOptions = BTreeMap<String, Vec<Value>>;

/// `GET /api/models/options`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelOptionsResponse {
    #[serde(default)]
    pub options: ModelOptions,
}
