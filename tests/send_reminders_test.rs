mod common;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use booking_functions::services::reminder_service::{
    self, ReminderOutcome, ReminderSummary, reminder_window,
};
use chrono::Utc;
use tokio::{sync::Barrier, time::timeout};

use common::{CRON_SECRET, FakeMessenger, FakeProcessor, FakeStore, app, booking, send, test_state};

fn reminder_request(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/send-reminders");
    if let Some(value) = authorization {
        builder = builder.header("Authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

fn authorized() -> Request<Body> {
    reminder_request(Some(&format!("Bearer {}", CRON_SECRET)))
}

fn tokens(entries: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(user, list)| (user.to_string(), list.iter().map(|t| t.to_string()).collect()))
        .collect()
}

#[tokio::test]
async fn bad_or_missing_secret_is_rejected_without_querying() {
    for authorization in [
        None,
        Some("Bearer wrong"),
        Some(CRON_SECRET),
        Some("bearer test-cron-secret"),
        Some("Bearer test-cron-secret "),
    ] {
        let store = Arc::new(FakeStore::default());
        let messenger = Arc::new(FakeMessenger::default());
        let app = app(test_state(
            Arc::new(FakeProcessor::default()),
            Some((store.clone(), messenger.clone())),
        ));

        let (status, text) = send(app, reminder_request(authorization)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{:?}", authorization);
        assert_eq!(text, "Unauthorized");
        assert_eq!(store.query_count(), 0);
    }
}

#[tokio::test]
async fn missing_configured_secret_rejects_everything() {
    let store = Arc::new(FakeStore::default());
    let mut state = test_state(
        Arc::new(FakeProcessor::default()),
        Some((store.clone(), Arc::new(FakeMessenger::default()))),
    );
    state.cron_secret = None;

    let (status, _) = send(app(state), reminder_request(Some("Bearer "))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn no_bookings_sends_nothing() {
    let store = Arc::new(FakeStore::default());
    let messenger = Arc::new(FakeMessenger::default());
    let app = app(test_state(
        Arc::new(FakeProcessor::default()),
        Some((store.clone(), messenger.clone())),
    ));

    let (status, text) = send(app, authorized()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "No bookings for tomorrow.");
    assert_eq!(store.query_count(), 1);
    assert_eq!(messenger.sent_count(), 0);

    let window = store.queries.lock().unwrap()[0];
    let hours = (window.end - window.start).num_hours();
    assert!((23..=25).contains(&hours));
    assert!(window.start > chrono::Utc::now());
}

#[tokio::test]
async fn one_multicast_per_booking_with_tokens() {
    let store = Arc::new(FakeStore {
        bookings: vec![
            booking("b1", "alice", "Cape Point"),
            booking("b2", "bob", "Boulders Beach"),
            booking("b3", "carol", "Kirstenbosch"),
        ],
        tokens: tokens(&[
            ("alice", &["a-phone", "a-tablet"]),
            ("bob", &["b-phone"]),
            ("carol", &["c-phone"]),
        ]),
        ..Default::default()
    });
    let messenger = Arc::new(FakeMessenger::default());
    let app = app(test_state(
        Arc::new(FakeProcessor::default()),
        Some((store.clone(), messenger.clone())),
    ));

    let (status, text) = send(app, authorized()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Sent reminders for 3 bookings.");

    let sent = messenger.sent.lock().unwrap();
    assert_eq!(sent.len(), 3);

    let alice = sent
        .iter()
        .find(|m| m.tokens.contains(&"a-phone".to_string()))
        .unwrap();
    assert_eq!(alice.tokens, vec!["a-phone", "a-tablet"]);
    assert_eq!(
        alice.notification.body,
        "Your trip to Cape Point is tomorrow. Get ready!"
    );
}

#[tokio::test]
async fn user_without_tokens_is_skipped_but_counted() {
    let store = Arc::new(FakeStore {
        bookings: vec![
            booking("b1", "alice", "Cape Point"),
            booking("b2", "nobody", "Robben Island"),
        ],
        tokens: tokens(&[("alice", &["a-phone"])]),
        ..Default::default()
    });
    let messenger = Arc::new(FakeMessenger::default());
    let app = app(test_state(
        Arc::new(FakeProcessor::default()),
        Some((store.clone(), messenger.clone())),
    ));

    let (status, text) = send(app, authorized()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Sent reminders for 2 bookings.");
    assert_eq!(messenger.sent_count(), 1);
    assert_eq!(store.token_lookups.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn single_dispatch_failure_fails_the_batch() {
    let store = Arc::new(FakeStore {
        bookings: vec![
            booking("b1", "alice", "Cape Point"),
            booking("b2", "bob", "Boulders Beach"),
        ],
        tokens: tokens(&[("alice", &["a-phone"]), ("bob", &["b-broken"])]),
        ..Default::default()
    });
    let messenger = Arc::new(FakeMessenger {
        failing_tokens: HashSet::from(["b-broken".to_string()]),
        ..Default::default()
    });
    let app = app(test_state(
        Arc::new(FakeProcessor::default()),
        Some((store.clone(), messenger.clone())),
    ));

    let (status, text) = send(app, authorized()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text, "Error sending notifications.");
    // Both units ran to completion before the batch was reported.
    assert_eq!(messenger.sent_count(), 2);
}

#[tokio::test]
async fn booking_query_failure_is_a_server_error() {
    let store = Arc::new(FakeStore {
        fail_query: true,
        ..Default::default()
    });
    let messenger = Arc::new(FakeMessenger::default());
    let app = app(test_state(
        Arc::new(FakeProcessor::default()),
        Some((store, messenger.clone())),
    ));

    let (status, text) = send(app, authorized()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text, "Error sending notifications.");
    assert_eq!(messenger.sent_count(), 0);
}

#[tokio::test]
async fn uninitialized_firebase_is_a_server_error() {
    let app = app(test_state(Arc::new(FakeProcessor::default()), None));

    let (status, text) = send(app, authorized()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(text, "Error sending notifications.");
}

#[tokio::test]
async fn scheduler_may_post_as_well() {
    let store = Arc::new(FakeStore::default());
    let app = app(test_state(
        Arc::new(FakeProcessor::default()),
        Some((store, Arc::new(FakeMessenger::default()))),
    ));

    let request = Request::builder()
        .method("POST")
        .uri("/api/send-reminders")
        .header("Authorization", format!("Bearer {}", CRON_SECRET))
        .body(Body::empty())
        .unwrap();

    let (status, text) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "No bookings for tomorrow.");
}

#[tokio::test]
async fn booking_without_user_fails_the_batch() {
    let mut orphan = booking("b2", "", "Signal Hill");
    orphan.user_id = None;
    let store = Arc::new(FakeStore {
        bookings: vec![booking("b1", "alice", "Cape Point"), orphan],
        tokens: tokens(&[("alice", &["a-phone"])]),
        ..Default::default()
    });
    let messenger = Arc::new(FakeMessenger::default());
    let app = app(test_state(
        Arc::new(FakeProcessor::default()),
        Some((store, messenger.clone())),
    ));

    let (status, _) = send(app, authorized()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(messenger.sent_count(), 1);
}

#[tokio::test]
async fn token_lookups_run_concurrently() {
    let bookings = vec![
        booking("b1", "alice", "Cape Point"),
        booking("b2", "bob", "Boulders Beach"),
        booking("b3", "carol", "Kirstenbosch"),
    ];
    // Each lookup blocks until all three are in flight.
    let store = Arc::new(FakeStore {
        lookup_barrier: Some(Arc::new(Barrier::new(bookings.len()))),
        bookings,
        tokens: tokens(&[("alice", &["a-phone"]), ("bob", &["b-phone"]), ("carol", &["c-phone"])]),
        ..Default::default()
    });
    let messenger = Arc::new(FakeMessenger::default());
    let app = app(test_state(
        Arc::new(FakeProcessor::default()),
        Some((store, messenger.clone())),
    ));

    let (status, text) = timeout(Duration::from_secs(5), send(app, authorized()))
        .await
        .expect("booking lookups did not overlap");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Sent reminders for 3 bookings.");
    assert_eq!(messenger.sent_count(), 3);
}

#[tokio::test]
async fn summary_records_each_booking_outcome() {
    let store = FakeStore {
        bookings: vec![
            booking("b1", "alice", "Cape Point"),
            booking("b2", "nobody", "Robben Island"),
        ],
        tokens: tokens(&[("alice", &["a-phone", "a-tablet"])]),
        ..Default::default()
    };
    let messenger = FakeMessenger::default();
    let window = reminder_window(Utc::now()).unwrap();

    let summary = reminder_service::send_reminders(&store, &messenger, &window)
        .await
        .unwrap();

    let ReminderSummary::Sent { bookings, outcomes } = summary else {
        panic!("expected reminders to be sent");
    };
    assert_eq!(bookings, 2);
    assert_eq!(outcomes.len(), 2);

    let by_id: HashMap<_, _> = outcomes
        .iter()
        .map(|r| (r.booking_id.as_str(), &r.outcome))
        .collect();
    assert!(matches!(by_id["b1"], Ok(ReminderOutcome::Sent(batch)) if batch.success_count == 2));
    assert!(matches!(by_id["b2"], Ok(ReminderOutcome::NoTokens)));
}
