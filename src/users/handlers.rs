use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::instrument;

use super::dto::{DeleteUserRequest, LoginRequest, LoginResponse, PublicUser};
use super::services;
use crate::{
    auth::AuthUser,
    error::{AppError, MessageBody},
    state::AppState,
};

pub(crate) fn bad_json(e: JsonRejection) -> AppError {
    AppError::validation(e.body_text())
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let Json(payload) = payload.map_err(bad_json)?;
    let user = services::create_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload.map_err(bad_json)?;
    Ok(Json(services::login(&state, &req.email, &req.password).await?))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn get_self(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    Ok(Json(services::get_user(&state, auth.id).await?))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id))]
pub async fn update_self(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let Json(payload) = payload.map_err(bad_json)?;
    Ok(Json(services::update_user(&state, auth.id, payload).await?))
}

#[instrument(skip(state, payload))]
pub async fn delete_self(
    State(state): State<AppState>,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> Result<Json<MessageBody>, AppError> {
    let Json(req) = payload.map_err(bad_json)?;
    services::delete_user(&state, &req.email).await?;
    Ok(MessageBody::new("User deleted successfully."))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageBody>, AppError> {
    services::logout(&state, auth.id).await?;
    Ok(MessageBody::new("Logged out successfully."))
}

#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<MessageBody>, AppError> {
    services::verify_user(&state, &token).await?;
    Ok(MessageBody::new("Email verified successfully."))
}
