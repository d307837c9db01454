//! Typed view over the well-known keys of the dashboard context.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    domain::{DeskId, IssueKey, QueueId, SlaStatus},
    protocol::{MlPreloadStatus, SlaSummary},
    state::State,
};

pub mod keys {
    pub const SELECTED_ISSUE: &str = "selectedIssue";
    pub const CURRENT_QUEUE: &str = "currentQueue";
    pub const CURRENT_DESK: &str = "currentDesk";
    pub const ISSUES_COUNT: &str = "issuesCount";
    pub const SLA: &str = "sla";
    pub const SLA_STATUS: &str = "slaStatus";
    pub const ML_PRELOAD: &str = "mlPreload";
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiContext {
    pub selected_issue: Option<IssueKey>,
    pub current_queue: Option<QueueId>,
    pub current_desk: Option<DeskId>,
    pub issues_count: Option<u64>,
    pub sla: Option<SlaSummary>,
    pub sla_status: Option<SlaStatus>,
    pub ml_preload: Option<MlPreloadStatus>,
}

impl UiContext {
    /// Reads each key on its own; a key holding an unexpected shape reads as
    /// absent instead of failing the whole view.
    pub fn from_state(state: &State) -> Self {
        Self {
            selected_issue: non_empty_str(state, keys::SELECTED_ISSUE).map(IssueKey::new),
            current_queue: scalar_id(state, keys::CURRENT_QUEUE).map(QueueId::new),
            current_desk: scalar_id(state, keys::CURRENT_DESK).map(DeskId::new),
            issues_count: state.get(keys::ISSUES_COUNT).and_then(Value::as_u64),
            sla: typed(state, keys::SLA),
            sla_status: typed(state, keys::SLA_STATUS),
            ml_preload: typed(state, keys::ML_PRELOAD),
        }
    }
}

/// Partial update selecting `issue` (or clearing the selection).
pub fn select_issue(issue: Option<&IssueKey>) -> State {
    State::new().with(
        keys::SELECTED_ISSUE,
        issue.map_or(Value::Null, |issue| Value::String(issue.0.clone())),
    )
}

fn non_empty_str<'a>(state: &'a State, key: &str) -> Option<&'a str> {
    state
        .get_str(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

// Queue and desk ids come through as either numbers or strings.
fn scalar_id(state: &State, key: &str) -> Option<String> {
    match state.get(key)? {
        Value::Number(number) => Some(number.to_string()),
        Value::String(_) => non_empty_str(state, key).map(str::to_string),
        _ => None,
    }
}

fn typed<T: DeserializeOwned>(state: &State, key: &str) -> Option<T> {
    match state.get(key)? {
        Value::Null => None,
        value => serde_json::from_value(value.clone()).ok(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reads_known_keys_leniently() {
        let state = State::new()
            .with(keys::SELECTED_ISSUE, "AB-1")
            .with(keys::CURRENT_QUEUE, 42)
            .with(keys::CURRENT_DESK, " ")
            .with(keys::ISSUES_COUNT, "lots")
            .with(keys::SLA_STATUS, "loading")
            .with(keys::ML_PRELOAD, json!({"progress": 40, "is_loading": true}));

        let context = UiContext::from_state(&state);
        assert_eq!(context.selected_issue, Some(IssueKey::new("AB-1")));
        assert_eq!(context.current_queue, Some(QueueId::new("42")));
        assert_eq!(context.current_desk, None);
        assert_eq!(context.issues_count, None);
        assert_eq!(context.sla_status, Some(SlaStatus::Loading));
        assert_eq!(
            context.ml_preload.map(|status| status.progress_percent()),
            Some(40)
        );
    }

    #[test]
    fn clearing_selection_writes_null() {
        let update = select_issue(None);
        assert_eq!(update.get(keys::SELECTED_ISSUE), Some(&Value::Null));
        assert!(UiContext::from_state(&update).selected_issue.is_none());
    }
}
