use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use booking_server::config::Config;
use booking_server::middleware::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use booking_server::routes::create_routes;
use booking_server::state::AppState;
use booking_server::store::MemoryStore;

fn app() -> Router {
    let config = Config {
        database_url: String::new(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        max_connections: 1,
        lock_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(5),
        cors_allowed_origins: Vec::new(),
        include_hsts: false,
    };
    create_routes(AppState::from_store(Arc::new(MemoryStore::new())), &config)
}

struct As {
    id: Uuid,
    role: &'static str,
}

const ADMIN: As = As {
    id: Uuid::nil(),
    role: "admin",
};

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    who: Option<&As>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(who) = who {
        builder = builder
            .header(USER_ID_HEADER, who.id.to_string())
            .header(USER_ROLE_HEADER, who.role);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_event(app: &Router, name: &str, capacity: i32) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/events",
        Some(&ADMIN),
        Some(json!({
            "name": name,
            "description": "An evening of music",
            "location": "Riverside",
            "date": "2025-09-12",
            "category": "concert",
            "capacity": capacity,
            "price": "25.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_user(app: &Router, email: &str) -> Uuid {
    let (status, body) = call(
        app,
        Method::POST,
        "/users",
        Some(&ADMIN),
        Some(json!({ "name": "Ayu", "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_check_carries_security_headers() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().get("strict-transport-security").is_none());
}

#[tokio::test]
async fn identity_headers_are_required_for_protected_routes() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/tickets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let user = As {
        id: Uuid::new_v4(),
        role: "user",
    };
    let (status, body) = call(&app, Method::GET, "/events/report", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn user_books_until_sold_out() {
    let app = app();
    let event_id = create_event(&app, "Jazz night", 1).await;
    let user = As {
        id: create_user(&app, "ayu@example.com").await,
        role: "user",
    };

    let booking = json!({ "event_id": event_id, "user_id": user.id });
    let (status, body) = call(
        &app,
        Method::POST,
        "/tickets",
        Some(&user),
        Some(booking.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["status"], "Purchased");

    let (status, body) = call(&app, Method::POST, "/tickets", Some(&user), Some(booking)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "OUT_OF_STOCK");

    let uri = format!("/events/{}", event_id);
    let (status, body) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available_tickets"], 0);
    assert_eq!(body["data"]["status"], "SoldOut");

    let (status, body) = call(&app, Method::GET, "/tickets/user", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn users_cannot_book_or_cancel_for_others() {
    let app = app();
    let event_id = create_event(&app, "Poetry slam", 10).await;
    let owner = As {
        id: create_user(&app, "owner@example.com").await,
        role: "user",
    };
    let stranger = As {
        id: create_user(&app, "stranger@example.com").await,
        role: "user",
    };

    let (status, _) = call(
        &app,
        Method::POST,
        "/tickets",
        Some(&stranger),
        Some(json!({ "event_id": event_id, "user_id": owner.id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::POST,
        "/tickets",
        Some(&owner),
        Some(json!({ "event_id": event_id, "user_id": owner.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let ticket_uri = format!("/tickets/{}", body["data"]["id"].as_str().unwrap());

    let (status, _) = call(&app, Method::PATCH, &ticket_uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, Method::PATCH, &ticket_uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Cancelled");
}

#[tokio::test]
async fn cancelling_an_event_twice_is_a_conflict() {
    let app = app();
    let event_id = create_event(&app, "Open air cinema", 3).await;
    let uri = format!("/events/{}", event_id);

    let (status, body) = call(&app, Method::PATCH, &uri, Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Cancelled");

    let (status, body) = call(&app, Method::PATCH, &uri, Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    assert_eq!(body["error"]["details"]["from"], "Cancelled");
}

#[tokio::test]
async fn reports_reject_inverted_windows() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::GET,
        "/tickets/report?start_date=2025-02-01&end_date=2025-01-01",
        Some(&ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = call(&app, Method::GET, "/events/report", Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_events"], 0);
    assert_eq!(
        body["data"]["event_status_distribution"].as_array().unwrap().len(),
        5
    );
}

#[tokio::test]
async fn malformed_input_gets_the_error_envelope() {
    let app = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/events")
        .header(USER_ID_HEADER, ADMIN.id.to_string())
        .header(USER_ROLE_HEADER, ADMIN.role)
        .header("content-type", "application/json")
        .body(Body::from(r#"{"name": "Half an event""#))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = call(&app, Method::GET, "/events/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = call(
        &app,
        Method::GET,
        "/tickets/report?start_date=2025-13-40",
        Some(&ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn admin_manages_users() {
    let app = app();
    let ayu = create_user(&app, "ayu@example.com").await;
    create_user(&app, "budi@example.com").await;

    let (status, body) = call(&app, Method::GET, "/users", Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let me = As {
        id: ayu,
        role: "user",
    };
    let uri = format!("/users/{}", ayu);
    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some(&me),
        Some(json!({ "name": "Ayu Lestari" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["name"], "Ayu Lestari");

    let (status, _) = call(
        &app,
        Method::PUT,
        &uri,
        Some(&me),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::PUT,
        &uri,
        Some(&me),
        Some(json!({ "email": "budi@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "DUPLICATE_NAME");

    let (status, _) = call(&app, Method::DELETE, &uri, Some(&me), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::DELETE, &uri, Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, &uri, Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn ticket_holders_cannot_be_deleted() {
    let app = app();
    let event_id = create_event(&app, "Harbour lights", 2).await;
    let holder = create_user(&app, "holder@example.com").await;
    let me = As {
        id: holder,
        role: "user",
    };

    let (status, _) = call(
        &app,
        Method::POST,
        "/tickets",
        Some(&me),
        Some(json!({ "event_id": event_id, "user_id": holder })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/users/{}", holder);
    let (status, body) = call(&app, Method::DELETE, &uri, Some(&ADMIN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let event_uri = format!("/events/{}", event_id);
    let (_, body) = call(&app, Method::GET, &event_uri, None, None).await;
    assert_eq!(body["data"]["available_tickets"], 1);
}
