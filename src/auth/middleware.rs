use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::Response,
};
use base64ct::{Base64, Encoding};
use tracing::{debug, warn};

use super::{extractors::AuthUser, token};
use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo_types::User;

fn malformed() -> AppError {
    AppError::auth("Invalid authorization format.")
}

fn invalid_credentials() -> AppError {
    AppError::auth("Invalid credentials.")
}

/// Email + password check shared by Basic auth and login.
pub(crate) async fn check_credentials(
    st: &AppState,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let Some(user) = st.users.find_by_email(email).await? else {
        warn!(%email, "unknown email");
        return Err(invalid_credentials());
    };
    if !st.hasher.verify(password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "password mismatch");
        return Err(invalid_credentials());
    }
    Ok(user)
}

async fn basic(st: &AppState, credentials: &str) -> Result<User, AppError> {
    let decoded = Base64::decode_vec(credentials).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (email, password) = decoded.split_once(':').ok_or_else(malformed)?;
    check_credentials(st, email, password).await
}

async fn bearer(st: &AppState, credentials: &str) -> Result<User, AppError> {
    let Some(user) = st.users.find_by_token(credentials).await? else {
        warn!("unknown bearer token");
        return Err(AppError::auth("Invalid token."));
    };
    if token::is_expired(user.token_expiry) {
        warn!(user_id = %user.id, "bearer token expired");
        return Err(AppError::auth("Token expired."));
    }
    Ok(user)
}

/// Resolves an `Authorization` header to a user. Never touches token state.
pub async fn resolve(st: &AppState, header: Option<&HeaderValue>) -> Result<User, AppError> {
    let raw = header.ok_or_else(|| AppError::auth("Missing authorization."))?;
    let raw = raw.to_str().map_err(|_| malformed())?;

    let (scheme, credentials) = raw.trim().split_once(' ').ok_or_else(malformed)?;
    let credentials = credentials.trim();
    if credentials.is_empty() {
        return Err(malformed());
    }

    if scheme.eq_ignore_ascii_case("basic") {
        basic(st, credentials).await
    } else if scheme.eq_ignore_ascii_case("bearer") {
        bearer(st, credentials).await
    } else {
        warn!(%scheme, "unsupported authorization scheme");
        Err(AppError::auth("Unsupported authentication method."))
    }
}

/// Attaches [`AuthUser`] to the request or rejects with 401.
pub async fn require_auth(
    State(st): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve(&st, req.headers().get(AUTHORIZATION)).await?;
    debug!(user_id = %user.id, "authenticated");
    req.extensions_mut().insert(AuthUser { id: user.id });
    Ok(next.run(req).await)
}

/// Must run inside [`require_auth`]. Reads verification state fresh from the store.
pub async fn require_verified(
    State(st): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::auth("Missing authorization."))?;

    let user = st
        .users
        .find_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    if !user.is_verified {
        warn!(user_id = %user.id, "unverified user blocked");
        return Err(AppError::Forbidden(
            "Email verification required. Please verify your email to continue.".into(),
        ));
    }
    Ok(next.run(req).await)
}
