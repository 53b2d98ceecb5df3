pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

use crate::auth::middleware::{require_auth, require_verified};
use crate::state::AppState;

pub fn router(st: &AppState) -> Router<AppState> {
    let mut profile = Router::new().route(
        "/v1/user/self",
        get(handlers::get_self).put(handlers::update_self),
    );
    if st.config.gate.profile {
        profile = profile.route_layer(from_fn_with_state(st.clone(), require_verified));
    }

    let authed = Router::new()
        .merge(profile)
        .route("/v1/user/self/logout", post(handlers::logout))
        .route_layer(from_fn_with_state(st.clone(), require_auth));

    // DELETE shares the path with the authenticated GET/PUT but takes no credentials
    Router::new()
        .merge(authed)
        .route("/v1/user", post(handlers::create_user))
        .route("/v1/user/login", post(handlers::login))
        .route("/v1/user/self", delete(handlers::delete_self))
        .route("/v1/user/self/verify/:token", get(handlers::verify))
}
