//! Text rendering of the footer. Views subscribe to the store and the bridge;
//! nothing here mutates context.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::anyhow;
use client_core::{events, ContextStore, EventBridge, Subscription};
use shared::{
    context::UiContext,
    domain::SlaStatus,
    protocol::{MlPreloadStatus, SlaSummary},
    suggestion::{Suggestion, SuggestionKind},
};

pub fn badge(kind: SuggestionKind) -> &'static str {
    match kind {
        SuggestionKind::Info => "[i]",
        SuggestionKind::Warning => "[!]",
        SuggestionKind::Critical => "[!!]",
        SuggestionKind::Success => "[ok]",
        SuggestionKind::Empty => "[-]",
    }
}

pub fn render_suggestion(suggestion: &Suggestion) -> String {
    format!("{} {}", badge(suggestion.kind), suggestion.plain_text())
}

pub fn render_sla(sla: &SlaSummary) -> String {
    let mut parts = Vec::new();
    if sla.breached {
        parts.push("BREACHED".to_string());
    } else if sla.paused {
        parts.push("paused".to_string());
    }
    if let Some(percent) = sla.percent_used {
        parts.push(format!("{percent:.0}% used"));
    }
    if let Some(label) = &sla.remaining_label {
        parts.push(format!("{label} left"));
    }
    if parts.is_empty() {
        parts.push("no timing data".to_string());
    }
    format!("SLA {}", parts.join(", "))
}

pub fn render_preload(status: &MlPreloadStatus) -> String {
    match &status.error {
        Some(error) => format!("ML preload failed: {error}"),
        None if status.is_loading => format!(
            "ML preload {}%{}",
            status.progress_percent(),
            if status.message.is_empty() {
                String::new()
            } else {
                format!(" - {}", status.message)
            }
        ),
        None => "ML models ready".to_string(),
    }
}

pub fn render_context(context: &UiContext) -> String {
    let mut scope = Vec::new();
    if let Some(desk) = &context.current_desk {
        scope.push(format!("desk {desk}"));
    }
    if let Some(queue) = &context.current_queue {
        scope.push(format!("queue {queue}"));
    }
    if let Some(count) = context.issues_count {
        scope.push(format!("{count} tickets"));
    }

    let focus = match &context.selected_issue {
        None => "no ticket selected".to_string(),
        Some(issue) => match (context.sla_status, &context.sla) {
            (Some(SlaStatus::Loading), _) => format!("{issue} | SLA loading..."),
            (Some(SlaStatus::Unavailable), _) => format!("{issue} | SLA unavailable"),
            (_, Some(sla)) => format!("{issue} | {}", render_sla(sla)),
            (_, None) => format!("{issue} | no SLA"),
        },
    };

    if scope.is_empty() {
        focus
    } else {
        format!("[{}] {focus}", scope.join(" / "))
    }
}

/// Prints the context line whenever it changes and every suggestion the
/// rotator publishes on the bridge.
pub struct FooterView {
    links: Vec<Subscription>,
}

impl FooterView {
    pub fn attach(store: &ContextStore, bridge: &EventBridge) -> Self {
        let last_line = Arc::new(Mutex::new(String::new()));
        let on_context = store.subscribe(move |next, _previous| {
            let line = render_context(&UiContext::from_state(next));
            let mut last = last_line.lock().unwrap_or_else(PoisonError::into_inner);
            if *last != line {
                println!("{line}");
                *last = line;
            }
            Ok(())
        });

        let on_suggestion = bridge.on(events::SUGGESTIONS_REFRESHED, |payload| {
            let suggestion: Suggestion = serde_json::from_value(payload.clone())
                .map_err(|err| anyhow!("unreadable suggestion payload: {err}"))?;
            println!("  {}", render_suggestion(&suggestion));
            Ok(())
        });

        let on_preload = bridge.on(events::ML_PRELOAD_PROGRESS, |payload| {
            let status: MlPreloadStatus = serde_json::from_value(payload.clone())
                .map_err(|err| anyhow!("unreadable preload payload: {err}"))?;
            println!("  {}", render_preload(&status));
            Ok(())
        });

        Self {
            links: vec![on_context, on_suggestion, on_preload],
        }
    }

    pub fn detach(&self) {
        for link in &self.links {
            link.unsubscribe();
        }
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
