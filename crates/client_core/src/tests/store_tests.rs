use super::*;

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use serde_json::json;

type Calls = Arc<Mutex<Vec<(State, State)>>>;

fn recording(store: &KeyedStateContainer) -> (Calls, Subscription) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let sink = calls.clone();
    let subscription = store.subscribe(move |next, previous| {
        sink.lock()
            .expect("calls")
            .push((next.clone(), previous.clone()));
        Ok(())
    });
    (calls, subscription)
}

fn count(calls: &Calls) -> usize {
    calls.lock().expect("calls").len()
}

#[test]
fn first_selection_notifies_with_next_and_previous() {
    let store = KeyedStateContainer::new();
    let (calls, _subscription) = recording(&store);

    store.set_state(State::new().with("selectedIssue", "AB-1"));

    assert_eq!(
        store.get_state(),
        State::new().with("selectedIssue", "AB-1")
    );
    let calls = calls.lock().expect("calls");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, State::new().with("selectedIssue", "AB-1"));
    assert_eq!(calls[0].1, State::new());
}

#[test]
fn state_is_the_merge_of_all_partials() {
    let store = KeyedStateContainer::new();
    let partials = [
        State::new().with("selectedIssue", "AB-1").with("issuesCount", 3),
        State::new().with("currentQueue", "triage"),
        State::new().with("selectedIssue", "AB-2"),
        State::new().with("issuesCount", json!(null)),
    ];

    let mut expected = State::new();
    for partial in partials {
        expected = expected.merged(&partial);
        store.set_state(partial);
        assert_eq!(store.get_state(), expected);
    }
}

#[test]
fn redundant_update_does_not_notify() {
    let store = KeyedStateContainer::with_state(
        State::new()
            .with("selectedIssue", "AB-1")
            .with("sla", json!({"breached": false, "paused": true})),
    );
    let (calls, _subscription) = recording(&store);

    store.set_state(State::new().with("selectedIssue", "AB-1"));
    // Same nested value with its keys in a different order.
    store.set_state(State::new().with("sla", json!({"paused": true, "breached": false})));
    store.set_state(State::new());

    assert_eq!(count(&calls), 0);
}

#[test]
fn unsubscribed_callback_is_never_invoked_again() {
    let store = KeyedStateContainer::new();
    let (calls, subscription) = recording(&store);

    store.set_state(State::new().with("currentDesk", "support"));
    subscription.unsubscribe();
    subscription.unsubscribe();
    store.set_state(State::new().with("currentDesk", "billing"));

    assert_eq!(count(&calls), 1);
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn unsubscribe_only_removes_its_own_callback() {
    let store = KeyedStateContainer::new();
    let (first, first_subscription) = recording(&store);
    let (second, _second_subscription) = recording(&store);

    first_subscription.unsubscribe();
    store.set_state(State::new().with("issuesCount", 7));

    assert_eq!(count(&first), 0);
    assert_eq!(count(&second), 1);
}

#[test]
fn dropping_the_handle_keeps_the_subscription() {
    let store = KeyedStateContainer::new();
    let (calls, subscription) = recording(&store);
    drop(subscription);

    store.set_state(State::new().with("issuesCount", 1));
    assert_eq!(count(&calls), 1);
}

#[test]
fn failing_subscribers_do_not_stop_later_ones() {
    let store = KeyedStateContainer::new();
    let _erroring = store.subscribe(|_, _| Err(anyhow!("render failed")));
    let _panicking = store.subscribe(|_, _| panic!("widget exploded"));
    let (calls, _subscription) = recording(&store);

    store.set_state(State::new().with("selectedIssue", "AB-9"));
    store.set_state(State::new().with("selectedIssue", "AB-10"));

    assert_eq!(count(&calls), 2);
}

#[test]
fn subscribers_run_in_subscription_order() {
    let store = KeyedStateContainer::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    let mut subscriptions = Vec::new();
    for label in ["footer", "sidebar", "board"] {
        let order = order.clone();
        subscriptions.push(store.subscribe(move |_, _| {
            order.lock().expect("order").push(label);
            Ok(())
        }));
    }

    store.set_state(State::new().with("currentQueue", "vip"));
    assert_eq!(
        *order.lock().expect("order"),
        vec!["footer", "sidebar", "board"]
    );
}

#[test]
fn nested_updates_are_applied_after_the_current_round() {
    let store = KeyedStateContainer::new();
    let reentrant = store.clone();
    let _derive = store.subscribe(move |next, previous| {
        if next.get("selectedIssue") != previous.get("selectedIssue") {
            reentrant.set_state(State::new().with("slaStatus", "loading"));
        }
        Ok(())
    });
    let (calls, _subscription) = recording(&store);

    store.set_state(State::new().with("selectedIssue", "AB-1"));

    let calls = calls.lock().expect("calls");
    assert_eq!(calls.len(), 2);
    // The recorder sees the selection first, untouched by the nested update.
    assert_eq!(calls[0].0, State::new().with("selectedIssue", "AB-1"));
    assert_eq!(
        calls[1].0,
        State::new()
            .with("selectedIssue", "AB-1")
            .with("slaStatus", "loading")
    );
    assert_eq!(calls[1].1, calls[0].0);
}

#[test]
fn subscriber_can_unsubscribe_a_later_one_mid_round() {
    let store = KeyedStateContainer::new();
    let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let handle = victim.clone();
    let _killer = store.subscribe(move |_, _| {
        if let Some(subscription) = handle.lock().expect("victim").as_ref() {
            subscription.unsubscribe();
        }
        Ok(())
    });
    let (calls, subscription) = recording(&store);
    *victim.lock().expect("victim") = Some(subscription);

    store.set_state(State::new().with("issuesCount", 2));
    assert_eq!(count(&calls), 0);
}

#[test]
fn get_state_returns_a_detached_copy() {
    let store = KeyedStateContainer::new();
    let (calls, _subscription) = recording(&store);

    let mut snapshot = store.get_state();
    snapshot.insert("selectedIssue", "HACK-1");

    assert!(store.get_state().is_empty());
    assert_eq!(count(&calls), 0);
}

#[test]
fn replace_state_drops_missing_keys() {
    let store = KeyedStateContainer::with_state(
        State::new().with("selectedIssue", "AB-1").with("issuesCount", 4),
    );
    store.replace_state(State::new().with("issuesCount", 4));

    assert_eq!(store.get("selectedIssue"), None);
    assert_eq!(store.get("issuesCount"), Some(json!(4)));
}
