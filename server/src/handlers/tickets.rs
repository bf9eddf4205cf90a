use axum::extract::State;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::middleware::require_admin;
use crate::models::{Caller, CreateTicketRequest, UpdateTicketRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{ApiJson, ApiPath};
use crate::utils::response::{created, empty_success, success};

pub async fn book_ticket(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<CreateTicketRequest>,
) -> Result<Response, AppError> {
    if !caller.may_act_for(request.user_id) {
        return Err(AppError::forbidden());
    }
    let ticket = state.bookings.book(request).await?;
    Ok(created(ticket, "Ticket purchased").into_response())
}

pub async fn list_tickets(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let tickets = state.bookings.list_tickets().await?;
    Ok(success(tickets, "Tickets retrieved").into_response())
}

pub async fn list_my_tickets(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Response, AppError> {
    let tickets = state.bookings.list_tickets_for_user(caller.user_id).await?;
    Ok(success(tickets, "Tickets retrieved").into_response())
}

pub async fn get_ticket(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(ticket_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let ticket = state.bookings.get_ticket(ticket_id).await?;
    if !caller.may_act_for(ticket.user_id) {
        return Err(AppError::forbidden());
    }
    Ok(success(ticket, "Ticket retrieved").into_response())
}

pub async fn update_ticket(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(ticket_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateTicketRequest>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let ticket = state.bookings.update_ticket(ticket_id, request).await?;
    Ok(success(ticket, "Ticket updated").into_response())
}

pub async fn cancel_ticket(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(ticket_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    // Ownership is checked before the cancel transaction opens.
    let owner = state.bookings.get_ticket(ticket_id).await?.user_id;
    if !caller.may_act_for(owner) {
        return Err(AppError::forbidden());
    }
    let ticket = state.bookings.cancel_ticket(ticket_id).await?;
    Ok(success(ticket, "Ticket cancelled").into_response())
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(ticket_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    state.bookings.delete_ticket(ticket_id).await?;
    Ok(empty_success("Ticket deleted").into_response())
}
