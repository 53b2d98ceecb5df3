use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use super::repo::Image;
use super::services::{self, UploadItem};
use crate::{
    auth::AuthUser,
    error::{AppError, MessageBody},
    state::AppState,
};

const FILE_FIELD: &str = "profilePic";
const TARGET_FIELD: &str = "userId";

fn bad_multipart(e: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("Invalid multipart body: {e}"))
}

/// POST /v1/user/self/pic, multipart with `profilePic` and optional `userId`.
#[instrument(skip(state, auth, mp), fields(user_id = %auth.id))]
pub async fn upload(
    State(state): State<AppState>,
    auth: AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Image>), AppError> {
    let mut mp = mp.map_err(|e| bad_multipart(e.body_text()))?;

    let mut target: Option<String> = None;
    let mut file: Option<UploadItem> = None;
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field.bytes().await.map_err(bad_multipart)?;
                file = Some(UploadItem { body, content_type });
            }
            Some(TARGET_FIELD) => {
                let text = field.text().await.map_err(bad_multipart)?;
                target = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let image =
        services::upload_profile_picture(&state, auth.id, target.as_deref(), file).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Image>, AppError> {
    Ok(Json(services::get_profile_picture(&state, auth.id).await?))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageBody>, AppError> {
    services::delete_profile_picture(&state, auth.id).await?;
    Ok(MessageBody::new("Profile picture deleted successfully."))
}
