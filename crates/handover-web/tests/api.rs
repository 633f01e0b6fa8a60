//! HTTP-level tests driving the router with `oneshot`.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate};
use handover_common::{DocumentsStatus, PaymentStatus};
use handover_config::Config;
use handover_core::services::{AttachOwner, NewProperty, NewUnit};
use handover_core::{ServiceContext, Services};
use handover_db::Database;
use handover_notify::RecordingMailer;
use handover_web::router::build_router;
use handover_web::state::{AppEvent, AppState};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

const ADMIN: &str = "admin@example.com";

struct TestApp {
    router: Router,
    state: AppState,
    mailer: Arc<RecordingMailer>,
    _storage: TempDir,
}

async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

async fn test_app_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let storage = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.auth.admin_emails = vec![ADMIN.to_string()];
    config.storage.root = storage.path().to_path_buf();
    config.documents.required_types = vec!["passport".to_string()];
    tweak(&mut config);

    let db = Database::open_in_memory().await.unwrap();
    db.initialize().await.unwrap();
    let mailer = Arc::new(RecordingMailer::new());
    let ctx = ServiceContext::new(Arc::new(config), Arc::new(db), mailer.clone()).unwrap();
    let state = AppState::new(Services::new(Arc::new(ctx)));

    TestApp {
        router: build_router(state.clone()),
        state,
        mailer,
        _storage: storage,
    }
}

impl TestApp {
    fn services(&self) -> &Services {
        &self.state.services
    }

    /// Request a magic link and pull the token out of the email.
    async fn sign_in(&self, email: &str) -> String {
        self.services().auth.request_magic_link(email).await.unwrap();
        let mail = self.mailer.sent_to(email).await;
        let html = &mail.last().unwrap().html;
        let start = html.find("token=").unwrap() + "token=".len();
        html[start..].chars().take_while(|c| c.is_ascii_hexdigit()).collect()
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn booking_day(&self) -> NaiveDate {
        let ctx = &self.services().ctx;
        let mut day = ctx.grid.earliest(ctx.today()).unwrap();
        while !ctx.grid.is_working_day(day) {
            day += Duration::days(1);
        }
        day
    }

    /// A property with one unit owned by `email`, optionally ready to book.
    async fn unit_with_owner(&self, number: &str, email: &str, ready: bool) -> (Uuid, Uuid) {
        let admin = handover_common::Caller::admin(ADMIN);
        let services = self.services();
        let property = match services.properties.list(&admin).await.unwrap().first() {
            Some(p) => p.id,
            None => {
                services
                    .properties
                    .create(
                        &admin,
                        NewProperty {
                            name: "Creek Vista".to_string(),
                            developer_name: "Harbour Homes".to_string(),
                            location: None,
                            handover_start: None,
                        },
                    )
                    .await
                    .unwrap()
                    .id
            }
        };
        let unit = services
            .units
            .create(
                &admin,
                property,
                NewUnit { unit_number: number.to_string(), unit_type: None, floor: None, area_sqft: None },
            )
            .await
            .unwrap()
            .id;
        services
            .ownership
            .attach_owner(
                &admin,
                unit,
                AttachOwner { email: email.to_string(), name: Some("Owner".to_string()), phone: None, is_primary: true },
            )
            .await
            .unwrap();
        if ready {
            services.ownership.set_payment_status(&admin, unit, PaymentStatus::Cleared).await.unwrap();
            services
                .ownership
                .set_documents_status(&admin, unit, DocumentsStatus::Approved, None)
                .await
                .unwrap();
        }
        (property, unit)
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["mail_transport"], "recording");
}

#[tokio::test]
async fn test_unbounded_upload_limit_still_builds_router() {
    let app = test_app_with(|config| config.storage.max_upload_bytes = usize::MAX).await;
    let (status, _) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_requests_without_token_are_unauthorized() {
    let app = test_app().await;
    let (status, body) = app.call(Method::GET, "/api/properties", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app.call(Method::GET, "/api/properties", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_magic_link_request_never_reveals_accounts() {
    let app = test_app().await;
    let (status, _) = app
        .call(Method::POST, "/api/auth/magic-link", None, Some(json!({ "email": "stranger@example.com" })))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(app.mailer.sent().await.is_empty());

    let token = app.sign_in(ADMIN).await;
    let (status, body) = app.call(Method::POST, "/api/auth/verify", None, Some(json!({ "token": token }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], ADMIN);
    assert_eq!(body["role"]["kind"], "admin");
}

#[tokio::test]
async fn test_only_admins_create_properties() {
    let app = test_app().await;
    app.unit_with_owner("A-1", "sam@example.com", false).await;
    let admin = app.sign_in(ADMIN).await;
    let owner = app.sign_in("sam@example.com").await;
    let property = json!({ "name": "Palm Court", "developer_name": "Harbour Homes" });

    let (status, body) = app.call(Method::POST, "/api/properties", Some(&owner), Some(property.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app.call(Method::POST, "/api/properties", Some(&admin), Some(property)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Palm Court");

    // owners only see properties they hold units in
    let (_, listed) = app.call(Method::GET, "/api/properties", Some(&owner), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Creek Vista");
}

#[tokio::test]
async fn test_booking_conflicts_over_http() {
    let app = test_app().await;
    let (_, a) = app.unit_with_owner("A-1", "sam@example.com", true).await;
    let (_, b) = app.unit_with_owner("A-2", "kim@example.com", true).await;
    let (_, c) = app.unit_with_owner("A-3", "lee@example.com", false).await;
    let sam = app.sign_in("sam@example.com").await;
    let kim = app.sign_in("kim@example.com").await;
    let lee = app.sign_in("lee@example.com").await;
    let day = app.booking_day().to_string();

    let mut events = app.state.subscribe();
    let (status, booking) = app
        .call(
            Method::POST,
            "/api/bookings",
            Some(&sam),
            Some(json!({ "unit_id": a, "booking_date": day, "slot_time": "10:00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "confirmed");
    match events.try_recv().unwrap() {
        AppEvent::BookingCreated { unit_id, slot, .. } => {
            assert_eq!(unit_id, a);
            assert_eq!(slot, "10:00");
        }
        other => panic!("unexpected event {other:?}"),
    }

    let (status, body) = app
        .call(
            Method::POST,
            "/api/bookings",
            Some(&kim),
            Some(json!({ "unit_id": b, "booking_date": day, "slot_time": "10:00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/bookings",
            Some(&lee),
            Some(json!({ "unit_id": c, "booking_date": day, "slot_time": "11:00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_eligible");
    assert_eq!(body["reasons"], json!(["payment_not_cleared", "documents_not_approved"]));

    // off-grid slot
    let (status, _) = app
        .call(
            Method::POST,
            "/api/bookings",
            Some(&kim),
            Some(json!({ "unit_id": b, "booking_date": day, "slot_time": "10:30" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let booking_id = booking["id"].as_str().unwrap();
    let (status, cancelled) = app
        .call(Method::POST, &format!("/api/bookings/{}/cancel", booking_id), Some(&sam), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/bookings",
            Some(&kim),
            Some(json!({ "unit_id": b, "booking_date": day, "slot_time": "10:00" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_events_stream_is_admin_only() {
    let app = test_app().await;
    app.unit_with_owner("A-1", "sam@example.com", false).await;
    let owner = app.sign_in("sam@example.com").await;

    let (status, _) = app.call(Method::GET, "/api/events", Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_multipart_upload_submits_documents() {
    let app = test_app().await;
    let (_, unit) = app.unit_with_owner("A-1", "sam@example.com", false).await;
    let owner = app.sign_in("sam@example.com").await;

    let boundary = "handover-test-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"document_type\"\r\n\r\npassport\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"passport scan.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4 passport\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/units/{}/attachments", unit))
        .header(header::AUTHORIZATION, format!("Bearer {}", owner))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
        .body(Body::from(body))
        .unwrap();
    let (status, attachment) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(attachment["document_type"], "passport");
    assert_eq!(attachment["review_status"], "pending");

    let (_, owners) = app.call(Method::GET, &format!("/api/units/{}/owners", unit), Some(&owner), None).await;
    assert_eq!(owners[0]["documents_status"], "submitted");

    let admin = app.sign_in(ADMIN).await;
    let id = attachment["id"].as_str().unwrap();
    let (status, _) = app
        .call(Method::POST, &format!("/api/attachments/{}/review", id), Some(&admin), Some(json!({ "approve": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, owners) = app.call(Method::GET, &format!("/api/units/{}/owners", unit), Some(&admin), None).await;
    assert_eq!(owners[0]["documents_status"], "approved");
}

#[tokio::test]
async fn test_payment_status_is_published() {
    let app = test_app().await;
    let (_, unit) = app.unit_with_owner("A-1", "sam@example.com", false).await;
    let admin = app.sign_in(ADMIN).await;
    let mut events = app.state.subscribe();

    let (status, owners) = app
        .call(
            Method::PUT,
            &format!("/api/units/{}/payment-status", unit),
            Some(&admin),
            Some(json!({ "status": "cleared" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owners[0]["payment_status"], "cleared");
    assert!(matches!(
        events.try_recv().unwrap(),
        AppEvent::PaymentStatusChanged { status: PaymentStatus::Cleared, .. }
    ));

    let (status, logs) = app
        .call(Method::GET, &format!("/api/email-logs?unit_id={}", unit), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(logs.as_array().unwrap().iter().any(|l| l["template"] == "payment_status"));
}

#[tokio::test]
async fn test_payment_proof_review_publishes_only_real_changes() {
    let app = test_app().await;
    let (_, unit) = app.unit_with_owner("B-2", "kim@example.com", false).await;
    let owner = app.sign_in("kim@example.com").await;
    let admin = app.sign_in(ADMIN).await;
    let mut events = app.state.subscribe();

    let mut pops = Vec::new();
    for reference in ["TRX-10", "TRX-11"] {
        let (status, pop) = app
            .call(
                Method::POST,
                &format!("/api/units/{}/pops", unit),
                Some(&owner),
                Some(json!({ "amount_cents": 500_000, "reference": reference })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        pops.push(pop["id"].as_str().unwrap().to_string());
    }

    let (status, reviewed) = app
        .call(Method::POST, &format!("/api/pops/{}/review", pops[0]), Some(&admin), Some(json!({ "approve": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["payment_status"], "partial");
    assert!(matches!(
        events.try_recv().unwrap(),
        AppEvent::PaymentStatusChanged { status: PaymentStatus::Partial, .. }
    ));

    // already partial: approved, but nothing to announce
    let (status, reviewed) = app
        .call(Method::POST, &format!("/api/pops/{}/review", pops[1]), Some(&admin), Some(json!({ "approve": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "approved");
    assert_eq!(reviewed["payment_status"], Value::Null);
    assert!(events.try_recv().is_err());
}
