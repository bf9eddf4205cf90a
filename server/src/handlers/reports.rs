use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::require_admin;
use crate::models::{Caller, DateWindow};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::ApiQuery;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
pub struct SoldPerEventQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub event_id: Option<Uuid>,
}

pub async fn event_report(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(window): ApiQuery<DateWindow>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let report = state.reports.event_report(window).await?;
    Ok(success(report, "Event report generated").into_response())
}

pub async fn ticket_report(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(window): ApiQuery<DateWindow>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let report = state.reports.ticket_report(window).await?;
    Ok(success(report, "Ticket report generated").into_response())
}

pub async fn tickets_sold_per_event(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<SoldPerEventQuery>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let window = DateWindow::new(query.start_date, query.end_date);
    let rows = state
        .reports
        .tickets_sold_per_event(window, query.event_id)
        .await?;
    Ok(success(rows, "Tickets sold per event generated").into_response())
}

pub async fn user_report(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(window): ApiQuery<DateWindow>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let report = state.reports.user_report(window).await?;
    Ok(success(report, "User report generated").into_response())
}
