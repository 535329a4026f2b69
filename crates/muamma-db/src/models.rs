//! Database row types, mapped directly from SQLite rows.
//! Distinct from muamma-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRow {
    pub id: i64,
    pub content: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub token: String,
    pub user_id: i64,
    pub created_at: String,
    pub expires_at: String,
}
