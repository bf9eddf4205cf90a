//! Runs against a real database when `TEST_DATABASE_URL` is set; otherwise
//! every test returns early.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use booking_server::booking::BookingError;
use booking_server::models::{
    CreateEventRequest, CreateTicketRequest, CreateUserRequest, DateWindow, EventFilter,
    EventStatus, Role, TicketStatus,
};
use booking_server::state::AppState;
use booking_server::store::PgStore;

async fn state() -> Option<AppState> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    let store = PgStore::new(pool, Duration::from_secs(5));
    store.migrate().await.expect("migrations");
    Some(AppState::from_store(Arc::new(store)))
}

async fn event(state: &AppState, capacity: i32, price: i64) -> Uuid {
    named_event(state, &format!("pg-event-{}", Uuid::new_v4()), capacity, price).await
}

async fn named_event(state: &AppState, name: &str, capacity: i32, price: i64) -> Uuid {
    state
        .events
        .create_event(CreateEventRequest {
            name: name.to_string(),
            description: "Integration".to_string(),
            location: "Hall B".to_string(),
            date: NaiveDate::from_ymd_opt(2031, 1, 17).unwrap(),
            category: "test".to_string(),
            capacity,
            price: Decimal::from(price),
        })
        .await
        .unwrap()
        .id
}

async fn user(state: &AppState) -> Uuid {
    state
        .users
        .create_user(CreateUserRequest {
            name: "Integration".to_string(),
            email: format!("{}@pg.example.com", Uuid::new_v4()),
            role: Role::User,
        })
        .await
        .unwrap()
        .id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn row_lock_serialises_concurrent_bookings() {
    let Some(state) = state().await else {
        return;
    };
    let event_id = event(&state, 5, 10).await;
    let user_id = user(&state).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move {
                state
                    .bookings
                    .book(CreateTicketRequest { event_id, user_id })
                    .await
            })
        })
        .collect();

    let mut purchased = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => purchased += 1,
            Err(BookingError::OutOfStock(_)) => out_of_stock += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!((purchased, out_of_stock), (5, 15));

    let after = state.events.get_event(event_id).await.unwrap();
    assert_eq!(after.available_tickets, 0);
    assert_eq!(after.status, EventStatus::SoldOut);
}

#[tokio::test]
async fn cancelling_an_event_cascades_in_one_transaction() {
    let Some(state) = state().await else {
        return;
    };
    let event_id = event(&state, 4, 20).await;
    let user_id = user(&state).await;

    let mut ticket_ids = Vec::new();
    for _ in 0..4 {
        let ticket = state
            .bookings
            .book(CreateTicketRequest { event_id, user_id })
            .await
            .unwrap();
        ticket_ids.push(ticket.id);
    }
    state.bookings.cancel_ticket(ticket_ids[0]).await.unwrap();

    let cancelled = state.events.cancel_event(event_id).await.unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);
    for id in &ticket_ids {
        let ticket = state.bookings.get_ticket(*id).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Cancelled);
    }

    let again = state.events.cancel_event(event_id).await;
    assert!(matches!(again, Err(BookingError::InvalidTransition { .. })));
}

#[tokio::test]
async fn sold_per_event_counts_purchased_tickets_only() {
    let Some(state) = state().await else {
        return;
    };
    let event_id = event(&state, 3, 100).await;
    let user_id = user(&state).await;

    let first = state
        .bookings
        .book(CreateTicketRequest { event_id, user_id })
        .await
        .unwrap();
    state
        .bookings
        .book(CreateTicketRequest { event_id, user_id })
        .await
        .unwrap();
    state.bookings.cancel_ticket(first.id).await.unwrap();

    let rows = state
        .reports
        .tickets_sold_per_event(DateWindow::unbounded(), Some(event_id))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_tickets, 1);
    assert_eq!(rows[0].total_revenue, Decimal::from(100));
}

#[tokio::test]
async fn duplicate_event_names_are_rejected() {
    let Some(state) = state().await else {
        return;
    };
    let name = format!("pg-dup-{}", Uuid::new_v4());
    let request = || CreateEventRequest {
        name: name.clone(),
        description: "Integration".to_string(),
        location: "Hall C".to_string(),
        date: NaiveDate::from_ymd_opt(2031, 2, 1).unwrap(),
        category: "test".to_string(),
        capacity: 1,
        price: Decimal::ZERO,
    };

    state.events.create_event(request()).await.unwrap();
    let again = state.events.create_event(request()).await;
    assert!(matches!(again, Err(BookingError::DuplicateName(_))));
}

#[tokio::test]
async fn deleting_a_user_respects_live_bookings() {
    let Some(state) = state().await else {
        return;
    };
    let event_id = event(&state, 2, 15).await;
    let user_id = user(&state).await;
    let ticket = state
        .bookings
        .book(CreateTicketRequest { event_id, user_id })
        .await
        .unwrap();

    let refused = state.users.delete_user(user_id).await;
    assert!(matches!(refused, Err(BookingError::InvalidTransition { .. })));

    state.bookings.cancel_ticket(ticket.id).await.unwrap();
    state.users.delete_user(user_id).await.unwrap();

    assert!(matches!(
        state.bookings.get_ticket(ticket.id).await,
        Err(BookingError::NotFound { .. })
    ));
    let after = state.events.get_event(event_id).await.unwrap();
    assert_eq!(after.available_tickets, 1);
}

#[tokio::test]
async fn search_treats_like_wildcards_literally() {
    let Some(state) = state().await else {
        return;
    };
    let token = Uuid::new_v4().simple().to_string();
    let literal = named_event(&state, &format!("pg_{}", token), 1, 5).await;
    named_event(&state, &format!("pgx{}", token), 1, 5).await;

    let found = state
        .events
        .search_events(EventFilter {
            query: Some(format!("pg_{}", token)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, literal);
}
