//! Roster caching and refresh

mod common;

use std::time::Duration;

use common::{FakeConnection, RosterAnswer, CHANNEL};
use goxxx::application::services::RosterState;

#[tokio::test]
async fn test_cache_miss_refreshes_once() {
    let connection = FakeConnection::new(&["@alice", "bob"], RosterAnswer::After(Duration::from_millis(10)));
    let tracker = connection.tracker(Duration::from_secs(5));
    assert_eq!(tracker.state(), RosterState::Stale);

    assert!(tracker.ensure_member("bob").await);
    assert_eq!(connection.queries(), 1);
    assert_eq!(tracker.state(), RosterState::Fresh);

    // Cached now
    assert!(tracker.ensure_member("alice").await);
    assert_eq!(connection.queries(), 1);

    // Unknown sender: one more refresh, still absent
    assert!(!tracker.ensure_member("mallory").await);
    assert_eq!(connection.queries(), 2);
}

#[tokio::test]
async fn test_late_join_is_seen_after_refresh() {
    let connection = FakeConnection::new(&["@alice"], RosterAnswer::After(Duration::from_millis(5)));
    let tracker = connection.tracker(Duration::from_secs(5));
    tracker.apply_roster(CHANNEL, &["@alice"]);

    connection.set_roster(&["@alice", "dave"]);
    assert!(tracker.ensure_member("dave").await);
    assert_eq!(tracker.snapshot().members(), &["alice".to_string(), "dave".to_string()]);
}

#[tokio::test]
async fn test_concurrent_misses_share_a_refresh() {
    let connection = FakeConnection::new(&["bob", "carol"], RosterAnswer::After(Duration::from_millis(50)));
    let tracker = connection.tracker(Duration::from_secs(5));

    let (bob, carol) = tokio::join!(tracker.ensure_member("bob"), tracker.ensure_member("carol"));
    assert!(bob && carol);
    assert_eq!(connection.queries(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_timeout_means_not_member() {
    let connection = FakeConnection::new(&["@alice"], RosterAnswer::Never);
    let tracker = connection.tracker(Duration::from_secs(10));
    tracker.apply_roster(CHANNEL, &["@alice"]);

    let start = tokio::time::Instant::now();
    assert!(!tracker.ensure_member("bob").await);
    assert!(start.elapsed() >= Duration::from_secs(10));

    // Admin checks fall back to the cached roster
    assert!(tracker.refreshed_roster().await.is_admin("alice"));
    assert_eq!(connection.queries(), 2);
}

#[tokio::test]
async fn test_roster_for_other_channel_is_ignored() {
    let connection = FakeConnection::new(&[], RosterAnswer::Never);
    let tracker = connection.tracker(Duration::from_secs(1));

    tracker.apply_roster("#elsewhere", &["@eve"]);
    assert!(!tracker.snapshot().is_member("eve"));

    tracker.apply_roster(CHANNEL, &["@eve"]);
    assert!(tracker.snapshot().is_admin("eve"));

    tracker.invalidate();
    assert_eq!(tracker.state(), RosterState::Stale);
}
