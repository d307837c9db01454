//! Footer suggestions derived from the current dashboard context.

use shared::{
    context::UiContext,
    domain::SlaStatus,
    protocol::SlaSummary,
    suggestion::Suggestion,
};

use crate::rotator::Feed;

pub const WARNING_PERCENT_USED: f64 = 75.0;

pub fn build_feed(context: &UiContext) -> Feed {
    if context.selected_issue.is_some() && context.sla_status == Some(SlaStatus::Loading) {
        return Feed::Loading;
    }

    let mut suggestions = Vec::new();

    if let Some(preload) = &context.ml_preload {
        if let Some(error) = &preload.error {
            suggestions.push(Suggestion::warning(format!(
                "ML suggestions unavailable: {error}"
            )));
        } else if preload.is_loading {
            suggestions.push(Suggestion::info(format!(
                "Warming up ML models... {}%",
                preload.progress_percent()
            )));
        }
    }

    match &context.selected_issue {
        Some(issue) => match (context.sla_status, &context.sla) {
            (Some(SlaStatus::Unavailable), _) => suggestions.push(Suggestion::warning(format!(
                "SLA data unavailable for <strong>{issue}</strong>"
            ))),
            (_, Some(sla)) => suggestions.push(sla_suggestion(issue.as_str(), sla)),
            (_, None) => suggestions.push(Suggestion::info(format!(
                "No SLA configured for <strong>{issue}</strong>"
            ))),
        },
        None => suggestions.push(Suggestion::info("Select a ticket to see SLA guidance")),
    }

    if let Some(count) = context.issues_count {
        let queue = context
            .current_queue
            .as_ref()
            .map_or_else(|| "this queue".to_string(), |queue| format!("queue {queue}"));
        if count == 0 {
            suggestions.push(Suggestion::success(format!("{queue} is clear")));
        } else {
            let noun = if count == 1 { "ticket" } else { "tickets" };
            suggestions.push(Suggestion::info(format!(
                "{count} {noun} waiting in {queue}"
            )));
        }
    }

    Feed::Ready(suggestions)
}

fn sla_suggestion(issue: &str, sla: &SlaSummary) -> Suggestion {
    let remaining = sla
        .remaining_label
        .as_deref()
        .map(|label| format!(" ({label} left)"))
        .unwrap_or_default();

    if sla.breached {
        Suggestion::critical(format!("<strong>{issue}</strong> has breached its SLA"))
    } else if sla.paused {
        Suggestion::info(format!("SLA clock is paused for <strong>{issue}</strong>"))
    } else {
        match sla.percent_used {
            Some(percent) if percent >= WARNING_PERCENT_USED => Suggestion::warning(format!(
                "<strong>{issue}</strong> has used {percent:.0}% of its SLA{remaining}"
            )),
            _ => Suggestion::success(format!(
                "<strong>{issue}</strong> is on track{remaining}"
            )),
        }
    }
}

#[cfg(test)]
#[path = "tests/suggestions_tests.rs"]
mod tests;
