use axum::extract::State;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::middleware::require_admin;
use crate::models::{Caller, CreateUserRequest, UpdateUserRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{ApiJson, ApiPath};
use crate::utils::response::{created, empty_success, success};

pub async fn create_user(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let user = state.users.create_user(request).await?;
    Ok(created(user, "User created").into_response())
}

pub async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    let users = state.users.list_users().await?;
    Ok(success(users, "Users retrieved").into_response())
}

pub async fn get_user(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    if !caller.may_act_for(user_id) {
        return Err(AppError::forbidden());
    }
    let user = state.users.get_user(user_id).await?;
    Ok(success(user, "User retrieved").into_response())
}

/// Users may edit their own name and email; only admins change roles.
pub async fn update_user(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Response, AppError> {
    if !caller.may_act_for(user_id) || (request.role.is_some() && !caller.is_admin()) {
        return Err(AppError::forbidden());
    }
    let user = state.users.update_user(user_id, request).await?;
    Ok(success(user, "User updated").into_response())
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    require_admin(&caller)?;
    state.users.delete_user(user_id).await?;
    Ok(empty_success("User deleted").into_response())
}
