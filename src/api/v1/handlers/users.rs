/*
 * Responsibility
 * - /users 系 CRUD handler
 * - Path/Json を extractor で受け、DTO validation → UserRepository 呼び出し
 * - users のキーは整数 (i32) をそのまま扱う
 */
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    api::v1::{
        dto::users::{CreateUserRequest, ListUsersQuery, UpdateUserRequest, UserResponse},
        extractors::CurrentPrincipal,
    },
    error::AppError,
    repos::CrudRepository,
    state::AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let rows = state
        .users
        .find_page(query.limit(), query.offset())
        .await?;

    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("INVALID_USER", msg))?;

    // POST never overwrites; a taken explicit key is a conflict.
    let saved = state.users.insert(req.into_user()).await?;
    tracing::info!(
        user_id = ?saved.id,
        by = %principal.subject,
        "user created"
    );

    Ok((StatusCode::CREATED, Json(saved.into())))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    let row = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::not_found("user"))?;

    Ok(Json(row.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    req.validate()
        .map_err(|msg| AppError::bad_request("INVALID_USER", msg))?;

    if !state.users.exists_by_id(user_id).await? {
        return Err(AppError::not_found("user"));
    }

    let saved = state.users.save(req.into_user(user_id)).await?;
    tracing::info!(user_id, by = %principal.subject, "user updated");

    Ok(Json(saved.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if state.users.delete_by_id(user_id).await? {
        tracing::info!(user_id, by = %principal.subject, "user deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("user"))
    }
}
