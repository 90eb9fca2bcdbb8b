//! Property-based tests for the first-response gate
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::*;
use crate::session::{GateState, Role, SessionState, GREETING};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-zA-Z ?]{1,30}",
        1 => Just(String::new()),
        1 => "[ \t\n]{1,4}",
    ]
}

fn arb_outcome() -> impl Strategy<Value = CompletionOutcome> {
    prop_oneof![
        "[a-zA-Z !]{0,40}".prop_map(CompletionOutcome::Reply),
        "[a-zA-Z ]{1,40}".prop_map(CompletionOutcome::Failed),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    let at = (0i64..1_000_000).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap());
    prop_oneof![
        4 => (arb_text(), at.clone()).prop_map(|(text, at)| Event::Submit { text, at }),
        3 => (arb_outcome(), at.clone())
            .prop_map(|(outcome, at)| Event::CompletionFinished { outcome, at }),
        1 => Just(Event::ResetFirstResponse),
        1 => at.prop_map(|at| Event::ClearChat { at }),
        1 => "[a-z0-9-]{0,12}".prop_map(|api_key| Event::KeyVerified { api_key }),
    ]
}

fn finish(state: &SessionState) -> SessionState {
    let done = Event::CompletionFinished {
        outcome: CompletionOutcome::Reply("done".to_string()),
        at: Utc::now(),
    };
    transition(state, done).unwrap().new_state
}

/// Bring any reachable state to `Open`
fn open(state: SessionState) -> SessionState {
    match state.gate_state() {
        GateState::Open => state,
        GateState::Busy => open(finish(&state)),
        GateState::Closed => transition(&state, Event::ResetFirstResponse).unwrap().new_state,
    }
}

/// Bring any reachable state to `Closed`
fn close(state: SessionState) -> SessionState {
    match state.gate_state() {
        GateState::Closed => state,
        GateState::Busy => finish(&state),
        GateState::Open => finish(&transition(&state, Event::submit("q")).unwrap().new_state),
    }
}

/// Drive the state through the events, ignoring rejections
fn run(events: Vec<Event>) -> SessionState {
    let mut state = SessionState::default();
    for event in events {
        if let Ok(result) = transition(&state, event) {
            state = result.new_state;
        }
    }
    state
}

fn invariants_hold(state: &SessionState) -> bool {
    (!state.first_response_saved() || state.first_response().is_some())
        && (!state.processing() || !state.first_response_saved())
        && state.chat_disabled() == state.first_response_saved()
        && !state.messages().is_empty()
        && state.messages()[0].content == GREETING
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Store invariants survive any sequence
    #[test]
    fn prop_invariants_preserved(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = SessionState::default();
        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
                prop_assert!(invariants_hold(&state), "Invariant broken: {:?}", state);
            }
        }
    }

    // Rejected events leave the state exactly as it was
    #[test]
    fn prop_rejection_changes_nothing(
        prefix in proptest::collection::vec(arb_event(), 0..15),
        event in arb_event()
    ) {
        let state = run(prefix);
        let before = state.clone();
        if transition(&state, event).is_err() {
            prop_assert_eq!(state, before);
        }
    }

    // Closed gate ignores every submission
    #[test]
    fn prop_closed_rejects_all_submissions(
        texts in proptest::collection::vec(arb_text(), 1..10),
        outcome in arb_outcome()
    ) {
        let busy = transition(&SessionState::default(), Event::submit("Hi")).unwrap().new_state;
        let closed = transition(&busy, Event::CompletionFinished { outcome, at: Utc::now() })
            .unwrap()
            .new_state;
        prop_assert_eq!(closed.gate_state(), GateState::Closed);

        for text in texts {
            let result = transition(&closed, Event::submit(text));
            prop_assert!(result.is_err());
        }
        prop_assert_eq!(closed.messages().len(), 3);
    }

    // One Open -> Busy -> Closed cycle appends exactly one user and one assistant message
    #[test]
    fn prop_cycle_appends_one_pair(
        prefix in proptest::collection::vec(arb_event(), 0..15),
        text in "[a-zA-Z]{1,20}",
        outcome in arb_outcome()
    ) {
        let state = open(run(prefix));

        let len = state.messages().len();
        let busy = transition(&state, Event::submit(text)).unwrap().new_state;
        let closed = transition(&busy, Event::CompletionFinished { outcome, at: Utc::now() })
            .unwrap()
            .new_state;

        prop_assert_eq!(closed.messages().len(), len + 2);
        prop_assert_eq!(closed.messages()[len].role, Role::User);
        prop_assert_eq!(closed.messages()[len + 1].role, Role::Assistant);
        prop_assert_eq!(closed.first_response(), closed.messages().last());
    }

    // No stuck-busy state: any outcome releases the processing flag
    #[test]
    fn prop_completion_always_clears_processing(outcome in arb_outcome()) {
        let busy = transition(&SessionState::default(), Event::submit("Hi")).unwrap().new_state;
        prop_assert!(busy.processing());
        let done = transition(&busy, Event::CompletionFinished { outcome, at: Utc::now() })
            .unwrap()
            .new_state;
        prop_assert!(!done.processing());
        prop_assert!(done.first_response_saved());
    }

    // Reset reopens the gate and keeps the history length
    #[test]
    fn prop_reset_reopens_without_touching_messages(
        prefix in proptest::collection::vec(arb_event(), 0..20)
    ) {
        let state = close(run(prefix));

        let reopened = transition(&state, Event::ResetFirstResponse).unwrap().new_state;
        prop_assert_eq!(reopened.gate_state(), GateState::Open);
        prop_assert!(reopened.first_response().is_none());
        prop_assert!(!reopened.first_response_saved());
        prop_assert_eq!(reopened.messages().len(), state.messages().len());
    }

    // Clear Chat always leaves the lone greeting and no work in flight
    #[test]
    fn prop_clear_chat_resets_log(prefix in proptest::collection::vec(arb_event(), 0..20)) {
        let state = run(prefix);
        let cleared = transition(&state, Event::clear_chat()).unwrap().new_state;
        prop_assert_eq!(cleared.messages().len(), 1);
        prop_assert_eq!(&cleared.messages()[0].content, GREETING);
        prop_assert!(!cleared.processing());
        prop_assert_eq!(cleared.first_response_saved(), state.first_response_saved());
    }

    // Message log only shrinks on Clear Chat
    #[test]
    fn prop_messages_monotonic_except_clear(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = SessionState::default();
        for event in events {
            let is_clear = matches!(event, Event::ClearChat { .. });
            if let Ok(result) = transition(&state, event) {
                if !is_clear {
                    prop_assert!(result.new_state.messages().len() >= state.messages().len());
                }
                state = result.new_state;
            }
        }
    }

    // Every accepted submission asks the collaborator exactly once, with user/assistant turns only
    #[test]
    fn prop_submit_requests_one_completion(text in "[a-zA-Z]{1,20}") {
        let result = transition(&SessionState::default(), Event::submit(text.clone())).unwrap();
        let requests: Vec<_> = result
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::RequestCompletion { history } => Some(history),
                _ => None,
            })
            .collect();
        prop_assert_eq!(requests.len(), 1);
        let history = requests[0];
        prop_assert_eq!(history.len(), 2);
        prop_assert_eq!(&history[1].content, &text);
    }
}
