pub mod handlers;
pub mod repo;
pub mod services;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::post,
    Router,
};

use crate::auth::middleware::{require_auth, require_verified};
use crate::state::AppState;

pub fn router(st: &AppState) -> Router<AppState> {
    let mut pic = Router::new().route(
        "/v1/user/self/pic",
        post(handlers::upload)
            .get(handlers::get)
            .delete(handlers::delete),
    );
    if st.config.gate.picture {
        pic = pic.route_layer(from_fn_with_state(st.clone(), require_verified));
    }
    pic.route_layer(from_fn_with_state(st.clone(), require_auth))
        .layer(DefaultBodyLimit::max(st.config.max_upload_bytes))
}
