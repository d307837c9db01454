use super::*;

use serde_json::json;
use shared::{
    context::{keys, select_issue},
    domain::{IssueKey, QueueId},
    state::State,
};

fn sla(percent_used: Option<f64>, breached: bool) -> SlaSummary {
    SlaSummary {
        goal_millis: Some(3_600_000),
        elapsed_millis: None,
        remaining_millis: None,
        remaining_label: Some("20m".to_string()),
        percent_used,
        breached,
        paused: false,
        is_default: true,
        is_secondary: false,
        cycle_count: 1,
    }
}

#[test]
fn suggestions_render_as_plain_text_with_badge() {
    let line = render_suggestion(&Suggestion::critical("<strong>AB-1</strong> breached"));
    assert_eq!(line, "[!!] AB-1 breached");
}

#[test]
fn sla_line_lists_available_facts() {
    assert_eq!(render_sla(&sla(Some(66.6), false)), "SLA 67% used, 20m left");
    assert_eq!(render_sla(&sla(None, true)), "SLA BREACHED, 20m left");
}

#[test]
fn context_line_reflects_selection_state() {
    let mut context = UiContext {
        current_queue: Some(QueueId::new("triage")),
        issues_count: Some(4),
        ..UiContext::default()
    };
    assert_eq!(
        render_context(&context),
        "[queue triage / 4 tickets] no ticket selected"
    );

    context.selected_issue = Some(IssueKey::new("AB-1"));
    context.sla_status = Some(SlaStatus::Loading);
    assert_eq!(
        render_context(&context),
        "[queue triage / 4 tickets] AB-1 | SLA loading..."
    );

    context.sla_status = Some(SlaStatus::Ready);
    context.sla = Some(sla(Some(10.0), false));
    assert_eq!(
        render_context(&context),
        "[queue triage / 4 tickets] AB-1 | SLA 10% used, 20m left"
    );
}

#[test]
fn preload_line_covers_each_state() {
    let mut status = MlPreloadStatus {
        progress: 30.0,
        is_loading: true,
        message: "priority model".to_string(),
        error: None,
    };
    assert_eq!(render_preload(&status), "ML preload 30% - priority model");

    status.is_loading = false;
    assert_eq!(render_preload(&status), "ML models ready");

    status.error = Some("out of memory".to_string());
    assert_eq!(render_preload(&status), "ML preload failed: out of memory");
}

#[test]
fn footer_view_detaches_cleanly() {
    let store = ContextStore::new();
    let bridge = EventBridge::new();
    let view = FooterView::attach(&store, &bridge);
    assert_eq!(store.subscriber_count(), 1);
    assert_eq!(bridge.listener_count(events::SUGGESTIONS_REFRESHED), 1);

    store.set_state(select_issue(Some(&IssueKey::new("AB-1"))));
    store.set_state(State::new().with(keys::ISSUES_COUNT, json!(2)));
    assert_eq!(
        bridge.emit(events::SUGGESTIONS_REFRESHED, json!({"nonsense": true})),
        0
    );

    view.detach();
    assert_eq!(store.subscriber_count(), 0);
    assert_eq!(bridge.listener_count(events::SUGGESTIONS_REFRESHED), 0);
    assert_eq!(bridge.listener_count(events::ML_PRELOAD_PROGRESS), 0);
}
