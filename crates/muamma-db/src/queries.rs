use crate::Database;
use crate::models::{QuestionRow, SessionRow, UserRow};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use muamma_types::QuestionStatus;
use rusqlite::{Connection, OptionalExtension, Row};

const QUESTION_COLUMNS: &str = "id, content, status, created_at";

/// Fixed-width RFC 3339 so that text ordering in SQLite matches time ordering.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<UserRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                "INSERT INTO users (username, password) VALUES (?1, ?2)
                 RETURNING id, username, password",
                (username, password_hash),
                map_user,
            )?;
            Ok(row)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, password FROM users WHERE username = ?1",
                    [username],
                    map_user,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row("SELECT id, username, password FROM users WHERE id = ?1", [id], map_user)
                .optional()?;
            Ok(row)
        })
    }

    // -- Questions --

    /// New questions always start out pending, whatever the caller sent.
    pub fn create_question(&self, content: &str) -> Result<QuestionRow> {
        let now = format_timestamp(Utc::now());
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO questions (content, status, created_at) VALUES (?1, ?2, ?3)
                     RETURNING {QUESTION_COLUMNS}"
                ),
                (content, QuestionStatus::Pending.as_str(), &now),
                map_question,
            )?;
            Ok(row)
        })
    }

    /// Newest first. `None` lists every status.
    pub fn list_questions(&self, status: Option<QuestionStatus>) -> Result<Vec<QuestionRow>> {
        self.with_conn(|conn| query_questions(conn, status))
    }

    pub fn list_all_questions(&self) -> Result<Vec<QuestionRow>> {
        self.list_questions(None)
    }

    pub fn get_question(&self, id: i64) -> Result<Option<QuestionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"),
                    [id],
                    map_question,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Returns the updated row, or `None` when no question has this id.
    pub fn update_question_status(
        &self,
        id: i64,
        status: QuestionStatus,
    ) -> Result<Option<QuestionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "UPDATE questions SET status = ?2 WHERE id = ?1 RETURNING {QUESTION_COLUMNS}"
                    ),
                    (id, status.as_str()),
                    map_question,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Deleting a missing question is not an error. Returns whether a row went away.
    pub fn delete_question(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM questions WHERE id = ?1", [id])?;
            Ok(affected > 0)
        })
    }

    // -- Sessions --

    pub fn insert_session(&self, session: &SessionRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                (
                    &session.token,
                    session.user_id,
                    &session.created_at,
                    &session.expires_at,
                ),
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self, token: &str) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?1",
                    [token],
                    |row| {
                        Ok(SessionRow {
                            token: row.get(0)?,
                            user_id: row.get(1)?,
                            created_at: row.get(2)?,
                            expires_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(affected > 0)
        })
    }

    pub fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let now = format_timestamp(now);
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [&now])?;
            Ok(affected)
        })
    }
}

fn query_questions(conn: &Connection, status: Option<QuestionStatus>) -> Result<Vec<QuestionRow>> {
    let rows = match status {
        Some(status) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUESTION_COLUMNS} FROM questions
                 WHERE status = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;
            stmt.query_map([status.as_str()], map_question)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {QUESTION_COLUMNS} FROM questions
                 ORDER BY created_at DESC, id DESC"
            ))?;
            stmt.query_map([], map_question)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
    })
}

fn map_question(row: &Row<'_>) -> rusqlite::Result<QuestionRow> {
    Ok(QuestionRow {
        id: row.get(0)?,
        content: row.get(1)?,
        status: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn created_questions_are_pending_with_fresh_ids() {
        let db = db();
        let first = db.create_question("Neden buradayız?").unwrap();
        let second = db.create_question("Neden buradayız?").unwrap();

        assert_eq!(first.status, "pending");
        assert_eq!(second.status, "pending");
        assert_ne!(first.id, second.id);
        assert_eq!(first.content, "Neden buradayız?");
        assert!(first.created_at.parse::<DateTime<Utc>>().is_ok());
    }

    #[test]
    fn listing_filters_by_status_newest_first() {
        let db = db();
        let a = db.create_question("a").unwrap();
        let b = db.create_question("b").unwrap();
        let c = db.create_question("c").unwrap();
        db.update_question_status(a.id, QuestionStatus::Approved).unwrap();
        db.update_question_status(c.id, QuestionStatus::Approved).unwrap();
        db.update_question_status(b.id, QuestionStatus::Rejected).unwrap();

        let approved: Vec<i64> = db
            .list_questions(Some(QuestionStatus::Approved))
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(approved, vec![c.id, a.id]);

        let all: Vec<i64> = db.list_all_questions().unwrap().into_iter().map(|q| q.id).collect();
        assert_eq!(all, vec![c.id, b.id, a.id]);

        assert!(db.list_questions(Some(QuestionStatus::Pending)).unwrap().is_empty());
    }

    #[test]
    fn status_update_leaves_other_columns_alone() {
        let db = db();
        let q = db.create_question("soru").unwrap();

        let updated = db
            .update_question_status(q.id, QuestionStatus::Pending)
            .unwrap()
            .unwrap();
        assert_eq!(updated, q);

        let updated = db
            .update_question_status(q.id, QuestionStatus::Rejected)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "rejected");
        assert_eq!(updated.content, q.content);
        assert_eq!(updated.created_at, q.created_at);
    }

    #[test]
    fn missing_question_update_is_none_and_delete_is_quiet() {
        let db = db();
        let q = db.create_question("kalır").unwrap();

        assert!(db.update_question_status(q.id + 100, QuestionStatus::Approved).unwrap().is_none());
        assert!(!db.delete_question(q.id + 100).unwrap());
        assert_eq!(db.get_question(q.id).unwrap(), Some(q.clone()));

        assert!(db.delete_question(q.id).unwrap());
        assert!(!db.delete_question(q.id).unwrap());
        assert!(db.get_question(q.id).unwrap().is_none());
    }

    #[test]
    fn users_are_found_by_name_and_id() {
        let db = db();
        let user = db.create_user("admin", "$argon2id$hash").unwrap();

        let by_name = db.get_user_by_username("admin").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(by_name.password, "$argon2id$hash");

        let by_id = db.get_user_by_id(user.id).unwrap().unwrap();
        assert_eq!(by_id.username, "admin");

        assert!(db.get_user_by_username("nobody").unwrap().is_none());
        assert!(db.create_user("admin", "other").is_err());
    }

    #[test]
    fn expired_sessions_are_purged() {
        let db = db();
        let user = db.create_user("admin", "hash").unwrap();
        let now = Utc::now();

        for (token, expires) in [("old", now - Duration::minutes(1)), ("live", now + Duration::hours(1))] {
            db.insert_session(&SessionRow {
                token: token.into(),
                user_id: user.id,
                created_at: format_timestamp(now - Duration::hours(2)),
                expires_at: format_timestamp(expires),
            })
            .unwrap();
        }

        assert_eq!(db.delete_expired_sessions(now).unwrap(), 1);
        assert!(db.get_session("old").unwrap().is_none());
        assert_eq!(db.get_session("live").unwrap().unwrap().user_id, user.id);

        assert!(db.delete_session("live").unwrap());
        assert!(db.get_session("live").unwrap().is_none());
    }
}
