use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{QuestionStatus, UnknownStatus};

// -- Questions --

/// Public submission. Any extra fields (e.g. a `status`) are ignored: new
/// questions always start out pending.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(
        min = 1,
        max = 300,
        message = "Question must be between 1 and 300 characters"
    ))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    #[validate(custom(function = "known_status"))]
    pub status: String,
}

fn known_status(status: &str) -> Result<(), ValidationError> {
    status
        .parse::<QuestionStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("status").with_message(Cow::Borrowed("Invalid status")))
}

impl UpdateStatusRequest {
    pub fn parse_status(&self) -> Result<QuestionStatus, UnknownStatus> {
        self.status.parse()
    }
}

/// Query string of the admin listing: `?status=pending`.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionFilter {
    pub status: Option<String>,
}

impl QuestionFilter {
    pub fn parse_status(&self) -> Result<Option<QuestionStatus>, UnknownStatus> {
        self.status.as_deref().map(str::parse).transpose()
    }
}

// -- Auth --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// -- Responses --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn for_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Report only the first offending field. Fields are visited in name
    /// order so the choice is stable across runs.
    pub fn from_validation(errors: &ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        fields
            .into_iter()
            .find_map(|(field, errs)| {
                errs.first().map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field));
                    Self::for_field(field.to_string(), message)
                })
            })
            .unwrap_or_else(|| Self::new("Invalid request"))
    }
}
