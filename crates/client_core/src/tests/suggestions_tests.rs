use super::*;

use shared::{
    domain::{IssueKey, QueueId},
    protocol::MlPreloadStatus,
    suggestion::SuggestionKind,
};

fn summary(percent_used: Option<f64>) -> SlaSummary {
    SlaSummary {
        goal_millis: Some(4 * 3_600_000),
        elapsed_millis: None,
        remaining_millis: Some(3_600_000),
        remaining_label: Some("1h 0m".to_string()),
        percent_used,
        breached: false,
        paused: false,
        is_default: true,
        is_secondary: false,
        cycle_count: 1,
    }
}

fn ready(feed: Feed) -> Vec<Suggestion> {
    match feed {
        Feed::Ready(suggestions) => suggestions,
        Feed::Loading => panic!("expected ready feed"),
    }
}

fn selected(issue: &str) -> UiContext {
    UiContext {
        selected_issue: Some(IssueKey::new(issue)),
        sla_status: Some(SlaStatus::Ready),
        ..UiContext::default()
    }
}

#[test]
fn prompts_for_selection_when_nothing_selected() {
    let suggestions = ready(build_feed(&UiContext::default()));
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].kind, SuggestionKind::Info);
}

#[test]
fn loading_sla_yields_loading_feed() {
    let context = UiContext {
        sla_status: Some(SlaStatus::Loading),
        ..selected("AB-1")
    };
    assert_eq!(build_feed(&context), Feed::Loading);
}

#[test]
fn sla_severity_follows_usage() {
    let breached = UiContext {
        sla: Some(SlaSummary {
            breached: true,
            ..summary(Some(120.0))
        }),
        ..selected("AB-1")
    };
    let near = UiContext {
        sla: Some(summary(Some(80.0))),
        ..selected("AB-1")
    };
    let fine = UiContext {
        sla: Some(summary(Some(20.0))),
        ..selected("AB-1")
    };

    assert_eq!(ready(build_feed(&breached))[0].kind, SuggestionKind::Critical);
    let near = ready(build_feed(&near));
    assert_eq!(near[0].kind, SuggestionKind::Warning);
    assert_eq!(near[0].key, "AB-1 has used 80% of its SLA (1h 0m left)");
    assert_eq!(ready(build_feed(&fine))[0].kind, SuggestionKind::Success);
}

#[test]
fn unavailable_and_missing_sla_are_distinguished() {
    let unavailable = UiContext {
        sla_status: Some(SlaStatus::Unavailable),
        ..selected("AB-2")
    };
    let missing = selected("AB-2");

    assert_eq!(
        ready(build_feed(&unavailable))[0].key,
        "SLA data unavailable for AB-2"
    );
    assert_eq!(ready(build_feed(&missing))[0].key, "No SLA configured for AB-2");
}

#[test]
fn queue_and_preload_add_context_lines() {
    let context = UiContext {
        current_queue: Some(QueueId::new("triage")),
        issues_count: Some(0),
        ml_preload: Some(MlPreloadStatus {
            progress: 42.0,
            is_loading: true,
            message: String::new(),
            error: None,
        }),
        ..UiContext::default()
    };

    let keys: Vec<String> = ready(build_feed(&context))
        .into_iter()
        .map(|s| s.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "Warming up ML models... 42%".to_string(),
            "Select a ticket to see SLA guidance".to_string(),
            "queue triage is clear".to_string(),
        ]
    );
}

#[test]
fn counts_are_pluralised() {
    let one = UiContext {
        issues_count: Some(1),
        ..UiContext::default()
    };
    let many = UiContext {
        issues_count: Some(12),
        current_queue: Some(QueueId::new("vip")),
        ..UiContext::default()
    };

    assert_eq!(
        ready(build_feed(&one)).last().map(|s| s.key.clone()),
        Some("1 ticket waiting in this queue".to_string())
    );
    assert_eq!(
        ready(build_feed(&many)).last().map(|s| s.key.clone()),
        Some("12 tickets waiting in queue vip".to_string())
    );
}
