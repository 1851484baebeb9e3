use slotline::testing::ChangeCounter;
use slotline::{
    EDGE_LEADING, EDGE_TRAILING, EdgeStatus, PageToken, PaginationState, RESERVED_EDGE_IDS,
};
use std::sync::{Arc, Mutex};

#[test]
fn reserved_edge_ids_are_plain_strings() {
    assert_eq!(EDGE_LEADING, "leading");
    assert_eq!(EDGE_TRAILING, "trailing");
    assert_eq!(
        RESERVED_EDGE_IDS,
        &["leading", "trailing", "top", "bottom", "left", "right"]
    );
}

#[test]
fn happy_path_load_then_exhaust() {
    // Load a page, then hit the end.
    let p = PaginationState::new();
    p.add_edge(EDGE_TRAILING);

    assert!(p.start_loading(EDGE_TRAILING));
    assert!(p.is_loading(EDGE_TRAILING));
    assert!(!p.can_load(EDGE_TRAILING));

    p.complete(EDGE_TRAILING, Some(PageToken::offset(20)));
    assert_eq!(p.get_token(EDGE_TRAILING), Some(PageToken::offset(20)));
    assert!(p.can_load(EDGE_TRAILING));
    assert!(!p.is_loading(EDGE_TRAILING));

    assert!(p.start_loading(EDGE_TRAILING));
    p.complete(EDGE_TRAILING, Some(PageToken::End));
    assert!(p.is_exhausted(EDGE_TRAILING));
    assert!(!p.can_load(EDGE_TRAILING));
    assert!(p.is_all_exhausted());
}

#[test]
fn error_then_retry() {
    // A failed load is retryable and the error clears on success.
    let p = PaginationState::new();
    p.add_edge(EDGE_TRAILING);

    assert!(p.start_loading(EDGE_TRAILING));
    p.fail(EDGE_TRAILING, "net");
    assert!(p.has_error(EDGE_TRAILING));
    assert_eq!(p.get_error(EDGE_TRAILING), Some("net".to_string()));
    assert_eq!(p.retry_count(EDGE_TRAILING), 1);
    assert!(p.can_load(EDGE_TRAILING));

    assert!(p.start_loading(EDGE_TRAILING));
    p.complete(EDGE_TRAILING, Some(PageToken::offset(20)));
    assert!(!p.has_error(EDGE_TRAILING));
    assert_eq!(p.get_error(EDGE_TRAILING), None);
    assert_eq!(p.retry_count(EDGE_TRAILING), 1, "retry count survives until reset");
}

#[test]
fn at_most_one_load_in_flight_per_edge() {
    let p = PaginationState::new();
    assert!(p.start_loading("feed"), "unknown ids are auto-registered");
    assert!(p.is_registered("feed"));

    let counter = ChangeCounter::new();
    p.add_listener(counter.callback());

    assert!(!p.start_loading("feed"));
    assert_eq!(counter.count(), 0, "rejected start must not notify");
    assert_eq!(p.get_state("feed").unwrap().status, EdgeStatus::Loading);
}

#[test]
fn exhausted_is_terminal_until_reset() {
    let p = PaginationState::new();
    p.add_edge("feed");
    assert!(p.start_loading("feed"));
    p.complete("feed", None);
    assert!(p.is_exhausted("feed"));

    assert!(!p.start_loading("feed"));
    p.fail("feed", "late failure");
    assert!(p.is_exhausted("feed"), "fail outside loading is a no-op");

    p.reset("feed");
    assert_eq!(p.get_state("feed").unwrap().status, EdgeStatus::Idle);
    assert_eq!(p.get_token("feed"), Some(PageToken::Empty));
    assert_eq!(p.retry_count("feed"), 0);
    assert!(p.can_load("feed"));
}

#[test]
fn complete_outside_loading_is_a_diagnosed_noop() {
    let p = PaginationState::new();
    let diagnostics: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&diagnostics);
    p.set_diagnostic_hook(move |msg| sink.lock().unwrap().push(msg.to_string()));

    p.complete("ghost", Some(PageToken::offset(5)));
    p.add_edge("feed");
    p.complete("feed", Some(PageToken::offset(5)));

    assert!(p.start_loading("feed"));
    p.complete("feed", Some(PageToken::Empty));
    assert!(p.is_loading("feed"), "an empty token cannot complete a load");

    let seen = diagnostics.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].contains("ghost"));
    assert!(seen[1].contains("loading edge"));
    assert!(seen[2].contains("invalid completion token"));
}

#[test]
fn try_complete_rejects_what_complete_ignores() {
    let p = PaginationState::new();

    let err = p.try_complete("ghost", Some(PageToken::offset(5))).unwrap_err();
    assert!(matches!(err, slotline::Error::NotFound { .. }));

    p.add_edge("feed");
    assert!(p.start_loading("feed"));
    let err = p.try_complete("feed", Some(PageToken::Empty)).unwrap_err();
    assert!(matches!(err, slotline::Error::InvalidToken { .. }));
    assert!(p.is_loading("feed"), "rejected completion leaves the edge loading");

    p.try_complete("feed", Some(PageToken::offset(10))).unwrap();
    assert_eq!(p.get_token("feed"), Some(PageToken::offset(10)));
}

#[test]
fn hints_live_independently_and_clear_on_exhaustion() {
    let p = PaginationState::new();
    p.set_hint("feed", true);
    p.set_hint("archive", false);

    assert!(p.has_hint("feed"));
    assert_eq!(p.get_hint("feed"), Some(true));
    assert_eq!(p.hinted_ids(), vec!["feed".to_string()]);
    assert!(!p.is_registered("feed"), "hints do not register edges");

    assert!(p.start_loading("feed"));
    p.complete("feed", None);
    assert!(!p.has_hint("feed"), "exhaustion clears the hint");

    p.clear_hint("archive");
    assert!(!p.has_hint("archive"));
}

#[test]
fn reset_keeps_hints_by_default() {
    let p = PaginationState::new();
    p.set_hint("feed", true);
    p.add_edge("feed");
    assert!(p.start_loading("feed"));
    p.fail("feed", "boom");

    p.reset("feed");
    assert!(p.has_hint("feed"));

    p.reset_keeping_hint("feed", false);
    assert!(!p.has_hint("feed"));
}

#[test]
fn reset_all_resets_every_edge_with_one_notification() {
    let p = PaginationState::new();
    p.add_edge("a");
    p.add_edge("b");
    p.set_hint("a", true);
    assert!(p.start_loading("a"));
    p.complete("a", None);

    let counter = ChangeCounter::new();
    p.add_listener(counter.callback());

    p.reset_all(false);
    assert_eq!(counter.count(), 1);
    assert_eq!(p.get_state("a").unwrap().status, EdgeStatus::Idle);
    assert_eq!(p.get_state("b").unwrap().status, EdgeStatus::Idle);
    assert!(!p.has_hint("a"));
}

#[test]
fn loadable_ids_and_any_loading() {
    let p = PaginationState::new();
    p.add_edge("a");
    p.add_edge("b");
    p.add_edge("c");
    assert!(p.start_loading("b"));
    assert!(p.start_loading("c"));
    p.complete("c", None);

    assert_eq!(p.loadable_ids(), vec!["a".to_string()]);
    assert!(p.is_any_loading());
    assert!(!p.is_all_exhausted());
}

#[test]
fn unregister_forgets_edge_and_hint() {
    let p = PaginationState::new();
    p.add_edge("feed");
    p.set_hint("feed", true);

    p.unregister("feed");
    assert!(!p.is_registered("feed"));
    assert!(!p.has_hint("feed"));
    assert!(p.edge_ids().is_empty());
}

#[test]
fn capture_skips_cursor_tokens_and_restore_resets_the_rest() {
    let p = PaginationState::new();
    p.add_edge("offsets");
    p.add_edge("cursors");
    p.add_edge("untouched");
    assert!(p.start_loading("offsets"));
    p.complete("offsets", Some(PageToken::offset_of(40, 200)));
    assert!(p.start_loading("cursors"));
    p.complete("cursors", Some(PageToken::cursor("abc")));

    let snapshot = p.capture_state();
    assert_eq!(snapshot.offsets.len(), 1);
    assert_eq!(snapshot.offsets.get("offsets"), Some(&40));

    assert!(p.start_loading("untouched"));

    let counter = ChangeCounter::new();
    p.add_listener(counter.callback());
    p.restore_state(&snapshot);
    assert_eq!(counter.count(), 1);

    assert_eq!(p.get_token("offsets"), Some(PageToken::offset(40)));
    assert_eq!(p.get_token("cursors"), Some(PageToken::Empty));
    assert_eq!(
        p.get_state("untouched").unwrap().status,
        EdgeStatus::Idle,
        "restore resets in-flight edges"
    );
}
