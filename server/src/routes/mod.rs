use axum::routing::{get, post, put};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{events, health_check, reports, tickets, users};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(event_routes())
        .merge(ticket_routes())
        .merge(user_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(create_security_headers_layer(config.include_hsts))
        .layer(create_cors_layer(&config.cors_allowed_origins))
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/search", get(events::search_events))
        .route("/events/report", get(reports::event_report))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .patch(events::cancel_event)
                .delete(events::delete_event),
        )
        .route("/events/:id/status", put(events::change_event_status))
}

fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/tickets", post(tickets::book_ticket).get(tickets::list_tickets))
        .route("/tickets/user", get(tickets::list_my_tickets))
        .route("/tickets/report", get(reports::ticket_report))
        .route("/tickets/report/event", get(reports::tickets_sold_per_event))
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .patch(tickets::cancel_ticket)
                .delete(tickets::delete_ticket),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/report", get(reports::user_report))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}
