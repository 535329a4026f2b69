use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::auth::{self, AppState};
use crate::middleware::require_session;
use crate::questions;

/// Every API route. Admin routes sit behind `require_session`; transport
/// layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route(
            "/api/questions",
            get(questions::list_public).post(questions::create_question),
        )
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout));

    let protected_routes = Router::new()
        .route("/api/admin/questions", get(questions::list_all))
        .route(
            "/api/admin/questions/{id}",
            get(questions::get_question).delete(questions::delete_question),
        )
        .route("/api/admin/questions/{id}/status", patch(questions::update_status))
        .route("/api/user", get(auth::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
