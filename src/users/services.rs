use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CreateUserRequest, LoginResponse, PublicUser, UpdateUserRequest};
use super::repo_types::{NewUser, UserChanges};
use crate::auth::{middleware::check_credentials, token};
use crate::error::AppError;
use crate::notify::UserCreatedEvent;
use crate::state::AppState;
use crate::validation::{
    check_allowed, check_immutable, check_string_values, is_valid_email, validate_name,
    validate_password, IMMUTABLE_ON_UPDATE, SERVER_FIELDS, UPDATABLE_FIELDS,
};

const DUPLICATE_EMAIL: &str = "A user with this email already exists.";

fn as_object(payload: Value) -> Result<Map<String, Value>, AppError> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::validation("Request body must be a JSON object.")),
    }
}

fn required(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

#[instrument(skip_all)]
pub async fn create_user(st: &AppState, payload: Value) -> Result<PublicUser, AppError> {
    let payload = as_object(payload)?;
    check_immutable(&payload, SERVER_FIELDS).map_err(AppError::Validation)?;

    let req: CreateUserRequest = serde_json::from_value(Value::Object(payload))
        .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))?;

    let (Some(email), Some(password), Some(first_name), Some(last_name)) = (
        required(req.email),
        required(req.password),
        required(req.first_name),
        required(req.last_name),
    ) else {
        return Err(AppError::validation("All fields are required."));
    };

    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email address."));
    }
    validate_name("firstName", &first_name).map_err(AppError::Validation)?;
    validate_name("lastName", &last_name).map_err(AppError::Validation)?;
    validate_password(&password).map_err(AppError::Validation)?;

    if st.users.find_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::validation(DUPLICATE_EMAIL));
    }

    let password_hash = st.hasher.hash(&password)?;
    let cfg = &st.config.token;
    let (bearer, bearer_expiry) = token::issue(cfg.ttl_minutes);
    let (verification, verification_expiry) = token::issue(cfg.verification_ttl_minutes);

    let Some(user) = st
        .users
        .insert(NewUser {
            email,
            password_hash,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            token: bearer,
            token_expiry: bearer_expiry,
            verification_token: verification.clone(),
            verification_token_expiry: verification_expiry,
        })
        .await?
    else {
        // lost the race against a concurrent signup
        return Err(AppError::validation(DUPLICATE_EMAIL));
    };

    let event = UserCreatedEvent {
        user_id: user.id,
        email: user.email.clone(),
        verify_url: format!(
            "{}/v1/user/self/verify/{}",
            cfg.verify_base_url.trim_end_matches('/'),
            verification
        ),
        verify_token: verification,
        timestamp: OffsetDateTime::now_utc(),
    };
    if let Err(e) = st.notifier.user_created(&event).await {
        warn!(user_id = %user.id, error = %format!("{e:#}"), "publishing user created event failed");
    }

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user.into())
}

#[instrument(skip(st, payload))]
pub async fn update_user(
    st: &AppState,
    user_id: Uuid,
    payload: Value,
) -> Result<PublicUser, AppError> {
    let payload = as_object(payload)?;
    check_immutable(&payload, IMMUTABLE_ON_UPDATE).map_err(AppError::Validation)?;
    check_allowed(&payload, UPDATABLE_FIELDS).map_err(AppError::Validation)?;
    check_string_values(&payload).map_err(AppError::Validation)?;

    let req: UpdateUserRequest = serde_json::from_value(Value::Object(payload))
        .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))?;

    let mut changes = UserChanges::default();
    if let Some(first) = req.first_name {
        validate_name("firstName", &first).map_err(AppError::Validation)?;
        changes.first_name = Some(first.trim().to_string());
    }
    if let Some(last) = req.last_name {
        validate_name("lastName", &last).map_err(AppError::Validation)?;
        changes.last_name = Some(last.trim().to_string());
    }
    if let Some(password) = req.password {
        validate_password(&password).map_err(AppError::Validation)?;
        changes.password_hash = Some(st.hasher.hash(&password)?);
    }

    let user = st
        .users
        .update(user_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    info!(%user_id, "user updated");
    Ok(user.into())
}

#[instrument(skip(st))]
pub async fn get_user(st: &AppState, user_id: Uuid) -> Result<PublicUser, AppError> {
    st.users
        .find_by_id(user_id)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| AppError::NotFound("User not found.".into()))
}

#[instrument(skip_all)]
pub async fn verify_user(st: &AppState, verification_token: &str) -> Result<(), AppError> {
    let Some(user) = st
        .users
        .find_by_verification_token(verification_token)
        .await?
    else {
        warn!("unknown verification token");
        return Err(AppError::validation("Invalid verification token."));
    };

    if token::is_expired(user.verification_token_expiry) {
        warn!(user_id = %user.id, "verification token expired");
        return Err(AppError::validation("Verification token expired."));
    }
    if user.is_verified {
        return Err(AppError::validation("User already verified."));
    }

    if !st.users.mark_verified(user.id).await? {
        return Err(AppError::NotFound("User not found.".into()));
    }
    info!(user_id = %user.id, "user verified");
    Ok(())
}

#[instrument(skip(st))]
pub async fn delete_user(st: &AppState, email: &str) -> Result<(), AppError> {
    let user = st
        .users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    if let Some(image) = st.images.find_by_user(user.id).await? {
        if let Err(e) = st.storage.delete_object(&image.file_name).await {
            warn!(user_id = %user.id, key = %image.file_name, error = %format!("{e:#}"), "orphaned profile picture");
        }
    }

    if !st.users.delete(user.id).await? {
        return Err(AppError::NotFound("User not found.".into()));
    }
    info!(user_id = %user.id, %email, "user deleted");
    Ok(())
}

#[instrument(skip(st, password))]
pub async fn login(st: &AppState, email: &str, password: &str) -> Result<LoginResponse, AppError> {
    let user = check_credentials(st, email, password).await?;

    let (token, token_expiry) = token::issue(st.config.token.ttl_minutes);
    if !st
        .users
        .set_token(user.id, Some(&token), Some(token_expiry))
        .await?
    {
        return Err(AppError::NotFound("User not found.".into()));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(LoginResponse {
        token,
        token_expiry,
    })
}

#[instrument(skip(st))]
pub async fn logout(st: &AppState, user_id: Uuid) -> Result<(), AppError> {
    if !st.users.set_token(user_id, None, None).await? {
        return Err(AppError::NotFound("User not found.".into()));
    }
    info!(%user_id, "user logged out");
    Ok(())
}
