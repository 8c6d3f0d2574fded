use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use validator::ValidationErrors;

use crate::{crypto::CryptoError, models::ApiResult, repository::RepositoryError};

/// Message returned for every 500. The underlying cause is only logged.
pub const SERVER_ERROR_MESSAGE: &str = "Server Error";

/// AppError
///
/// The single error type surfaced by services, extractors and handlers.
/// Every variant maps to exactly one HTTP status and is rendered as the
/// `{succeeded: false, result: null, errors: [...]}` envelope.
#[derive(Debug, Error)]
pub enum AppError {
    /// Business rule rejection (duplicate slug, password mismatch, unknown category).
    #[error("{0}")]
    BadRequest(String),

    /// Request shape rejection; one message per failed field rule.
    #[error("One or more validation errors occurred.")]
    Validation(Vec<String>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("You do not have permission to access this resource.")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Repository(_)
            | AppError::Crypto(_)
            | AppError::Email(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Messages exposed to the caller. Server-side failures collapse to a generic one.
    pub fn public_messages(&self) -> Vec<String> {
        match self {
            AppError::Validation(messages) => messages.clone(),
            _ if self.status_code().is_server_error() => vec![SERVER_ERROR_MESSAGE.to_string()],
            _ => vec![self.to_string()],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ApiResult::<()>::failure(self.public_messages());
        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid."),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages)
    }
}
