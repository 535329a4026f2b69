use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::{PathRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use muamma_db::QuestionRow;
use muamma_types::api::{CreateQuestionRequest, QuestionFilter, UpdateStatusRequest};
use muamma_types::{Question, QuestionStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::middleware::CurrentSession;

const NOT_FOUND: &str = "Question not found";

/// Public listing: approved questions only, newest first.
pub async fn list_public(State(state): State<AppState>) -> Result<Json<Vec<Question>>, ApiError> {
    let rows = state.db.list_questions(Some(QuestionStatus::Approved))?;
    Ok(Json(into_questions(rows)?))
}

pub async fn list_all(
    State(state): State<AppState>,
    query: Result<Query<QuestionFilter>, QueryRejection>,
) -> Result<Json<Vec<Question>>, ApiError> {
    let Query(filter) = query?;
    let status = filter
        .parse_status()
        .map_err(|_| ApiError::invalid_field("status", "Invalid status"))?;

    let rows = state.db.list_questions(status)?;
    Ok(Json(into_questions(rows)?))
}

pub async fn get_question(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Question>, ApiError> {
    let Path(id) = path?;
    let row = state.db.get_question(id)?.ok_or(ApiError::NotFound(NOT_FOUND))?;
    Ok(Json(question_from_row(row)?))
}

pub async fn create_question(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state.db.create_question(&req.content)?;
    info!("Question {} submitted", row.id);

    Ok((StatusCode::CREATED, Json(question_from_row(row)?)))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    path: Result<Path<i64>, PathRejection>,
    ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> Result<Json<Question>, ApiError> {
    let Path(id) = path?;
    let status = req
        .parse_status()
        .map_err(|_| ApiError::invalid_field("status", "Invalid status"))?;

    let row = state
        .db
        .update_question_status(id, status)?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    info!("Question {} set to {} by user {}", id, status, session.user_id);

    Ok(Json(question_from_row(row)?))
}

/// Idempotent: deleting an unknown id still answers 204.
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    if state.db.delete_question(id)? {
        info!("Question {} deleted by user {}", id, session.user_id);
    } else {
        debug!("Delete of missing question {} ignored", id);
    }

    Ok(StatusCode::NO_CONTENT)
}

fn into_questions(rows: Vec<QuestionRow>) -> Result<Vec<Question>, ApiError> {
    rows.into_iter().map(question_from_row).collect()
}

fn question_from_row(row: QuestionRow) -> Result<Question, ApiError> {
    let status = row
        .status
        .parse::<QuestionStatus>()
        .with_context(|| format!("Corrupt status on question {}", row.id))?;
    let created_at = row
        .created_at
        .parse::<DateTime<Utc>>()
        .with_context(|| format!("Corrupt created_at '{}' on question {}", row.created_at, row.id))?;

    Ok(Question {
        id: row.id,
        content: row.content,
        status,
        created_at,
    })
}
