use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::session::SESSION_COOKIE;

/// Identity of the administrator behind the current request.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user_id: i64,
}

/// Resolve the session cookie to a live session, or answer 401 before the
/// handler (and any storage access) runs.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(ApiError::unauthorized)?;

    let session = state
        .sessions
        .get(&token)?
        .ok_or_else(ApiError::unauthorized)?;

    req.extensions_mut().insert(CurrentSession {
        user_id: session.user_id,
    });
    Ok(next.run(req).await)
}
