//! HTTP surface tests over the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{FixedOffset, NaiveDate};
use futures::FutureExt;
use futures::future::BoxFuture;
use lakeside_bot::BookingBot;
use lakeside_bot::api::{AppState, ReadinessCheck, build_router};
use lakeside_bot::conversation::BookingPolicy;
use lakeside_core::{
    BookingLedger, NewBooking, Outbound, ReservableResource, ResourceCatalog, ResourceId,
    Transition, UserId, WeekendDays,
};
use lakeside_testing::{InMemoryBookingStore, RecordingTransport, StaticModerators, test_clock};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const MODERATOR: UserId = UserId::new(900);

struct FakeReadiness(AtomicBool);

impl ReadinessCheck for FakeReadiness {
    fn database_ready(&self) -> BoxFuture<'_, bool> {
        futures::future::ready(self.0.load(Ordering::SeqCst)).boxed()
    }
}

struct Fixture {
    server: TestServer,
    store: Arc<InMemoryBookingStore>,
    transport: RecordingTransport,
    readiness: Arc<FakeReadiness>,
}

fn fixture() -> Fixture {
    let clock = Arc::new(test_clock());
    let store = Arc::new(InMemoryBookingStore::seeded(clock.clone()));
    let transport = RecordingTransport::new();
    let bot = BookingBot::new(
        clock,
        store.clone(),
        store.clone(),
        Arc::new(transport.clone()),
        Arc::new(StaticModerators::new([MODERATOR])),
        BookingPolicy::new(WeekendDays::default(), FixedOffset::east_opt(0).unwrap()),
    );
    let readiness = Arc::new(FakeReadiness(AtomicBool::new(true)));
    let state = AppState::new(bot, store.clone(), store.clone(), readiness.clone());
    let server = TestServer::new(build_router(state)).unwrap();
    Fixture { server, store, transport, readiness }
}

fn cabin(store: &InMemoryBookingStore) -> ResourceId {
    store.resource_named("Cabin #1").unwrap().id
}

async fn book(store: &InMemoryBookingStore, day: u32, user: i64) -> lakeside_core::BookingId {
    store
        .create_booking(NewBooking {
            resource_id: cabin(store),
            date: NaiveDate::from_ymd_opt(2025, 7, day).unwrap(),
            requester: UserId::new(user),
            name: "Anna".to_string(),
            phone: "79001234567".to_string(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let f = fixture();

    f.server.get("/health").await.assert_status_ok();
    f.server.get("/ready").await.assert_status_ok();

    f.readiness.0.store(false, Ordering::SeqCst);
    f.server.get("/ready").await.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_list_resources_by_category() {
    let f = fixture();

    let all: Vec<ReservableResource> = f.server.get("/api/resources").await.json();
    assert_eq!(all.len(), 9);

    let cabins: Vec<ReservableResource> = f
        .server
        .get("/api/resources")
        .add_query_param("category", "site_house")
        .await
        .json();
    let names: Vec<_> = cabins.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Cabin #1", "Cabin #2", "Improved cabin"]);
}

#[tokio::test]
async fn test_inactive_resources_are_not_listed() {
    let f = fixture();
    let id = cabin(&f.store);
    f.store.set_active(id, false).await.unwrap();

    let cabins: Vec<ReservableResource> = f
        .server
        .get("/api/resources")
        .add_query_param("category", "house")
        .await
        .json();
    assert!(cabins.iter().all(|r| r.id != id));

    f.server
        .get(&format!("/api/resources/{id}/calendar"))
        .add_query_param("year", 2025)
        .add_query_param("month", 7)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_category_is_bad_request() {
    let f = fixture();

    let response = f.server.get("/api/resources").add_query_param("category", "yacht").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_calendar_reports_public_statuses() {
    let f = fixture();
    let id = cabin(&f.store);
    book(&f.store, 10, 10).await;
    let confirmed = book(&f.store, 11, 11).await;
    f.store.transition(confirmed, Transition::Confirm, MODERATOR).await.unwrap();
    let rejected = book(&f.store, 12, 12).await;
    f.store.transition(rejected, Transition::Reject, MODERATOR).await.unwrap();

    let response = f
        .server
        .get(&format!("/api/resources/{id}/calendar"))
        .add_query_param("year", 2025)
        .add_query_param("month", 7)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body.as_object().unwrap().len(), 31);
    assert_eq!(body["2025-07-10"], "partially");
    assert_eq!(body["2025-07-11"], "booked");
    assert_eq!(body["2025-07-12"], "available");
}

#[tokio::test]
async fn test_calendar_errors() {
    let f = fixture();
    let id = cabin(&f.store);

    f.server
        .get(&format!("/api/resources/{id}/calendar"))
        .add_query_param("year", 2025)
        .add_query_param("month", 13)
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    f.server
        .get("/api/resources/404/calendar")
        .add_query_param("year", 2025)
        .add_query_param("month", 7)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    f.server
        .get(&format!("/api/resources/{id}/calendar"))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_event_is_accepted_and_answered() {
    let f = fixture();

    let response = f
        .server
        .post("/api/chat/events")
        .json(&json!({ "from": 10, "payload": { "type": "start" } }))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    response.assert_json(&json!({ "status": "accepted" }));
    assert!(matches!(
        f.transport.last_to(UserId::new(10)),
        Some(Outbound::ChooseCategory { .. })
    ));
}

#[tokio::test]
async fn test_moderator_command_over_http() {
    let f = fixture();
    let id = book(&f.store, 10, 10).await;

    f.server
        .post("/api/chat/events")
        .json(&json!({
            "from": MODERATOR,
            "payload": { "type": "confirm_booking", "booking_id": id }
        }))
        .await
        .assert_status(StatusCode::ACCEPTED);

    assert_eq!(
        f.store.get(id).await.unwrap().status,
        lakeside_core::BookingStatus::Confirmed
    );
}

#[tokio::test]
async fn test_malformed_chat_event_is_rejected() {
    let f = fixture();

    let response = f
        .server
        .post("/api/chat/events")
        .json(&json!({ "from": 10, "payload": { "type": "teleport" } }))
        .await;

    assert!(response.status_code().is_client_error());
    assert!(f.transport.sent().is_empty());
}
