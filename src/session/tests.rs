use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::errors::RunboxError;

// ===== registry =====

#[test]
fn test_create_and_get() {
    let registry = SessionRegistry::new();
    registry.create("a").unwrap();

    let session = registry.get("a").unwrap();
    assert_eq!(session.id, "a");
    assert_eq!(session.state, SessionState::Created);
}

#[test]
fn test_create_duplicate_fails() {
    let registry = SessionRegistry::new();
    registry.create("a").unwrap();

    let err = registry.create("a").unwrap_err();
    assert!(matches!(err, RunboxError::DuplicateSession(_)));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_concurrent_create_single_winner() {
    let registry = Arc::new(SessionRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || registry.create("contended").is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&ok| ok)
        .count();
    assert_eq!(successes, 1);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_remove_is_idempotent() {
    let registry = SessionRegistry::new();
    registry.create("a").unwrap();

    assert!(registry.remove("a").is_some());
    assert!(registry.remove("a").is_none());
    assert!(registry.get("a").is_none());
}

#[test]
fn test_set_state() {
    let registry = SessionRegistry::new();
    registry.create("a").unwrap();

    assert!(registry.set_state("a", SessionState::Running));
    assert_eq!(registry.state("a"), Some(SessionState::Running));

    assert!(registry.set_state("a", SessionState::AwaitingInput));
    assert_eq!(registry.state("a"), Some(SessionState::AwaitingInput));
}

#[test]
fn test_set_state_on_removed_session() {
    let registry = SessionRegistry::new();
    registry.create("a").unwrap();
    registry.remove("a");

    assert!(!registry.set_state("a", SessionState::Running));
}

#[test]
fn test_list_active_is_a_snapshot() {
    let registry = SessionRegistry::new();
    registry.create("a").unwrap();
    registry.create("b").unwrap();

    let snapshot = registry.list_active();
    assert_eq!(snapshot.len(), 2);

    registry.remove("a");
    // The earlier snapshot is unaffected.
    assert_eq!(snapshot.len(), 2);
    assert_eq!(registry.list_active().len(), 1);
}

#[test]
fn test_stale_sessions() {
    let registry = SessionRegistry::new();
    registry.create("young").unwrap();

    assert!(registry.stale_sessions(Duration::from_secs(60)).is_empty());

    std::thread::sleep(Duration::from_millis(30));
    let stale = registry.stale_sessions(Duration::from_millis(10));
    assert_eq!(stale, vec!["young".to_string()]);
}

#[test]
fn test_cancel_handle_for_unknown_session() {
    let registry = SessionRegistry::new();
    assert!(registry.cancel_handle("ghost").is_none());
}

// ===== input relay =====

#[tokio::test]
async fn test_register_and_resolve() {
    let relay = InputRelay::new(Duration::from_secs(5));
    let rx = relay.register("s").unwrap();

    relay.resolve("s", "value".to_string()).unwrap();

    let answer = relay.wait("s", rx).await.unwrap();
    assert_eq!(answer, InputAnswer::Value("value".to_string()));
    assert!(!relay.has_pending("s"));
}

#[tokio::test]
async fn test_register_duplicate_fails() {
    let relay = InputRelay::new(Duration::from_secs(5));
    let _rx = relay.register("s").unwrap();

    let err = relay.register("s").unwrap_err();
    assert!(matches!(err, RunboxError::DuplicatePendingInput(_)));
}

#[tokio::test]
async fn test_resolve_without_registration_fails() {
    let relay = InputRelay::new(Duration::from_secs(5));
    let err = relay.resolve("s", "value".to_string()).unwrap_err();
    assert!(matches!(err, RunboxError::NoSuchPendingInput(_)));
}

#[tokio::test]
async fn test_resolve_twice_fails() {
    let relay = InputRelay::new(Duration::from_secs(5));
    let _rx = relay.register("s").unwrap();

    relay.resolve("s", "first".to_string()).unwrap();
    let err = relay.resolve("s", "second".to_string()).unwrap_err();
    assert!(matches!(err, RunboxError::NoSuchPendingInput(_)));
}

#[tokio::test]
async fn test_wait_times_out_and_removes_slot() {
    let relay = InputRelay::new(Duration::from_millis(50));
    let rx = relay.register("s").unwrap();

    let err = relay.wait("s", rx).await.unwrap_err();
    assert!(matches!(err, RunboxError::InputTimeout(_)));
    assert!(!relay.has_pending("s"));

    // Late resolution after expiry is rejected, not silently accepted.
    let err = relay.resolve("s", "late".to_string()).unwrap_err();
    assert!(matches!(err, RunboxError::NoSuchPendingInput(_)));
}

#[tokio::test]
async fn test_cancel_unblocks_waiter() {
    let relay = Arc::new(InputRelay::new(Duration::from_secs(30)));
    let rx = relay.register("s").unwrap();

    let waiter = {
        let relay = Arc::clone(&relay);
        tokio::spawn(async move { relay.wait("s", rx).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    relay.cancel("s");

    let answer = waiter.await.unwrap().unwrap();
    assert_eq!(answer, InputAnswer::Cancelled);
    assert!(!relay.has_pending("s"));
}

#[tokio::test]
async fn test_cancel_without_registration_is_a_noop() {
    let relay = InputRelay::new(Duration::from_secs(5));
    relay.cancel("ghost");
    assert!(!relay.has_pending("ghost"));
}

#[tokio::test]
async fn test_distinct_sessions_do_not_interfere() {
    let relay = InputRelay::new(Duration::from_secs(5));
    let rx_a = relay.register("a").unwrap();
    let _rx_b = relay.register("b").unwrap();

    relay.resolve("a", "for-a".to_string()).unwrap();

    let answer = relay.wait("a", rx_a).await.unwrap();
    assert_eq!(answer, InputAnswer::Value("for-a".to_string()));
    assert!(relay.has_pending("b"));
}
