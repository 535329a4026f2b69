use std::error::Error as StdError;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

use muamma_types::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized")
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let body = ErrorResponse::from_validation(&errors);
        Self::Validation {
            message: body.message,
            field: body.field,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let field = match &rejection {
            JsonRejection::JsonDataError(err) => offending_field(err),
            _ => None,
        };

        Self::Validation {
            message: rejection.body_text(),
            field,
        }
    }
}

/// Field named by a body that parsed as JSON but did not fit the request type.
fn offending_field(err: &(dyn StdError + 'static)) -> Option<String> {
    let mut source = Some(err);
    while let Some(current) = source {
        if let Some(de) = current.downcast_ref::<serde_path_to_error::Error<serde_json::Error>>() {
            let path = de.path().to_string();
            if path != "." {
                return Some(path);
            }
            // Missing and unknown fields are reported at the root.
            return field_in_message(&de.inner().to_string());
        }
        source = current.source();
    }
    None
}

fn field_in_message(message: &str) -> Option<String> {
    message
        .strip_prefix("missing field `")
        .or_else(|| message.strip_prefix("unknown field `"))
        .and_then(|rest| rest.split('`').next())
        .map(str::to_string)
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
            field: None,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation {
            message: rejection.body_text(),
            field: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation { message, field } => ErrorResponse { message, field },
            Self::Unauthorized(message) | Self::NotFound(message) => ErrorResponse::new(message),
            Self::Internal(e) => {
                // Details stay in the log, never in the response.
                error!("Request failed: {:#}", e);
                ErrorResponse::new("Internal server error")
            }
        };

        (status, Json(body)).into_response()
    }
}
