use axum::extract::State;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::middleware::require_admin;
use crate::models::{
    Caller, ChangeEventStatusRequest, CreateEventRequest, EventFilter, UpdateEventRequest,
};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{ApiJson, ApiPath, ApiQuery};
use crate::utils::response::{created, empty_success, success};

pub async fn create_event(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<CreateEventRequest>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let event = state.events.create_event(request).await?;
    Ok(created(event, "Event created").into_response())
}

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events = state.events.list_events().await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn search_events(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<EventFilter>,
) -> Result<Response, AppError> {
    let events = state.events.search_events(filter).await?;
    Ok(success(events, "Events retrieved").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let event = state.events.get_event(event_id).await?;
    Ok(success(event, "Event retrieved").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateEventRequest>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let event = state.events.update_event(event_id, request).await?;
    Ok(success(event, "Event updated").into_response())
}

pub async fn change_event_status(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(event_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ChangeEventStatusRequest>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let event = state.events.change_status(event_id, request.status).await?;
    Ok(success(event, "Event status updated").into_response())
}

/// Cancels the event and every purchased ticket for it.
pub async fn cancel_event(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(event_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let event = state.events.cancel_event(event_id).await?;
    Ok(success(event, "Event cancelled").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(event_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    state.events.delete_event(event_id).await?;
    Ok(empty_success("Event deleted").into_response())
}
