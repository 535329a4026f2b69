use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use muamma_db::{Database, SessionRow, queries::format_timestamp};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "muamma_session";

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn issue(user_id: i64, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: generate_token(),
            user_id,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// 256 bits from the thread-local CSPRNG, base64url without padding.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Server-side session records keyed by the opaque cookie token.
///
/// Expired sessions are never returned by `get`; `purge_expired` reclaims
/// their storage.
pub trait SessionStore: Send + Sync {
    fn create(&self, user_id: i64) -> Result<Session>;
    fn get(&self, token: &str) -> Result<Option<Session>>;
    fn destroy(&self, token: &str) -> Result<()>;
    fn purge_expired(&self) -> Result<usize>;
}

// -- In-memory --

/// Process-local store. Sessions are lost on restart.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Session>>> {
        self.sessions
            .lock()
            .map_err(|e| anyhow!("Session lock poisoned: {}", e))
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, user_id: i64) -> Result<Session> {
        let session = Session::issue(user_id, self.ttl);
        self.lock()?.insert(session.token.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, token: &str) -> Result<Option<Session>> {
        let mut sessions = self.lock()?;
        let expired = match sessions.get(token) {
            Some(session) => session.is_expired(Utc::now()),
            None => return Ok(None),
        };

        if expired {
            sessions.remove(token);
            return Ok(None);
        }
        Ok(sessions.get(token).cloned())
    }

    fn destroy(&self, token: &str) -> Result<()> {
        self.lock()?.remove(token);
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }
}

// -- SQLite --

/// Persistent store backed by the `sessions` table, survives restarts.
pub struct SqliteSessionStore {
    db: Arc<Database>,
    ttl: Duration,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>, ttl: Duration) -> Self {
        Self { db, ttl }
    }
}

impl SessionStore for SqliteSessionStore {
    fn create(&self, user_id: i64) -> Result<Session> {
        let session = Session::issue(user_id, self.ttl);
        self.db.insert_session(&SessionRow {
            token: session.token.clone(),
            user_id,
            created_at: format_timestamp(session.created_at),
            expires_at: format_timestamp(session.expires_at),
        })?;
        Ok(session)
    }

    fn get(&self, token: &str) -> Result<Option<Session>> {
        let Some(row) = self.db.get_session(token)? else {
            return Ok(None);
        };

        let session = Session {
            created_at: parse_timestamp(&row.created_at)?,
            expires_at: parse_timestamp(&row.expires_at)?,
            token: row.token,
            user_id: row.user_id,
        };

        if session.is_expired(Utc::now()) {
            debug!("Session for user {} expired at {}", session.user_id, session.expires_at);
            self.db.delete_session(token)?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    fn destroy(&self, token: &str) -> Result<()> {
        self.db.delete_session(token)?;
        Ok(())
    }

    fn purge_expired(&self) -> Result<usize> {
        self.db.delete_expired_sessions(Utc::now())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("Corrupt session timestamp '{}'", raw))
}
