use std::sync::{Arc, LazyLock};

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use rand_core::OsRng;
use tracing::{info, warn};

use muamma_db::{Database, UserRow};
use muamma_types::User;
use muamma_types::api::{LoginRequest, MessageResponse};

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::CurrentSession;
use crate::session::{SESSION_COOKIE, SessionStore};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub sessions: Arc<dyn SessionStore>,
    /// Mark the session cookie `Secure` (only sent over HTTPS).
    pub secure_cookies: bool,
}

/// Credentials of the administrator account created at startup.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Argon2id with a fresh random salt per password.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Constant-time check of `password` against a stored PHC hash string.
pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("Stored password hash is invalid: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hash checked against when the username is unknown, so both failure paths
/// pay for one argon2 verification.
static DUMMY_HASH: LazyLock<Result<String, String>> =
    LazyLock::new(|| hash_password("muamma-no-such-user").map_err(|e| e.to_string()));

fn dummy_hash() -> anyhow::Result<&'static str> {
    DUMMY_HASH
        .as_deref()
        .map_err(|e| anyhow!("Dummy password hash unavailable: {}", e))
}

/// Look up `username` and verify `password`. `None` means the credentials are
/// wrong; an unknown user and a wrong password take the same argon2 work.
pub fn check_credentials(db: &Database, username: &str, password: &str) -> anyhow::Result<Option<UserRow>> {
    let Some(user) = db.get_user_by_username(username)? else {
        verify_password(password, dummy_hash()?)?;
        warn!("Login failed: unknown user '{}'", username);
        return Ok(None);
    };

    if !verify_password(password, &user.password)? {
        warn!("Login failed: wrong password for '{}'", username);
        return Ok(None);
    }

    Ok(Some(user))
}

/// Create the admin account unless a user with that name already exists.
/// Returns whether a user was created.
pub fn seed_admin(db: &Database, admin: &AdminCredentials) -> anyhow::Result<bool> {
    if db.get_user_by_username(&admin.username)?.is_some() {
        return Ok(false);
    }

    let password_hash = hash_password(&admin.password)?;
    let user = db.create_user(&admin.username, &password_hash)?;
    info!("Admin user '{}' seeded with id {}", user.username, user.id);
    Ok(true)
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    // Argon2 verification blocks for tens of milliseconds; keep it off the async workers.
    let db = state.db.clone();
    let user = tokio::task::spawn_blocking(move || check_credentials(&db, &req.username, &req.password))
        .await
        .map_err(|e| anyhow!("Credential check task failed: {}", e))??
        .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

    let session = state.sessions.create(user.id)?;
    info!("User '{}' logged in", user.username);

    let cookie = Cookie::build((SESSION_COOKIE, session.token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies)
        .build();

    Ok((jar.add(cookie), Json(MessageResponse::new("Logged in successfully"))))
}

/// Always succeeds; a missing or stale cookie simply has nothing to destroy.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value())?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(MessageResponse::new("Logged out"))))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .db
        .get_user_by_id(session.user_id)?
        .ok_or(ApiError::Unauthorized("Not authenticated"))?;

    Ok(Json(User {
        id: user.id,
        username: user.username,
    }))
}
