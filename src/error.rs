use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::quiz::{QuizError, round::RoundError, selector::SelectionError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The server holds inconsistent data.
    #[error("internal: {0}")]
    Internal(String),
}

impl From<QuizError> for ServiceError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::EmptyGuess => ServiceError::InvalidInput(err.to_string()),
            QuizError::Selection(SelectionError::InsufficientCatalog { .. })
            | QuizError::NoSession
            | QuizError::InputDisabled
            | QuizError::Transition(_)
            | QuizError::Round(RoundError::Complete | RoundError::HintLocked { .. }) => {
                ServiceError::InvalidState(err.to_string())
            }
            QuizError::Selection(_) | QuizError::MissingCatalogData(_) => {
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Internal(message) => AppError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::HintLevel;

    fn status(err: QuizError) -> StatusCode {
        AppError::from(ServiceError::from(err))
            .into_response()
            .status()
    }

    #[test]
    fn quiz_errors_map_to_http_statuses() {
        assert_eq!(status(QuizError::EmptyGuess), StatusCode::BAD_REQUEST);
        assert_eq!(status(QuizError::NoSession), StatusCode::CONFLICT);
        assert_eq!(status(QuizError::InputDisabled), StatusCode::CONFLICT);
        assert_eq!(
            status(QuizError::Round(RoundError::HintLocked {
                requested: HintLevel::Close,
                unlocked: HintLevel::Far,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(QuizError::Selection(SelectionError::InsufficientCatalog {
                available: 3,
                required: 10,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(QuizError::MissingCatalogData("ghost".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
