use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::marks::MarkingError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unprocessable(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MarkingError> for ApiError {
    fn from(err: MarkingError) -> Self {
        match err {
            MarkingError::RecordNotFound(_) => ApiError::NotFound(err.to_string()),
            MarkingError::Upstream(message) => ApiError::BadGateway(message),
            MarkingError::InvalidMark(_)
            | MarkingError::AttemptLimit(_)
            | MarkingError::MissingSelection
            | MarkingError::EmptySubmission
            | MarkingError::UnknownQuestion(_)
            | MarkingError::UnknownPaper(_) => ApiError::Unprocessable(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::BadGateway(message) => {
                tracing::warn!(error = %message, "Upstream failure");
                message
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                message
            }
            ApiError::BadRequest(message)
            | ApiError::NotFound(message)
            | ApiError::Unprocessable(message) => message,
        };
        (status, Json(ErrorResponse { status: status.as_u16(), detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marks::AttemptViolation;

    #[test]
    fn marking_errors_map_to_statuses() {
        let cases = [
            (MarkingError::RecordNotFound(4), StatusCode::NOT_FOUND),
            (MarkingError::Upstream("down".to_string()), StatusCode::BAD_GATEWAY),
            (MarkingError::EmptySubmission, StatusCode::UNPROCESSABLE_ENTITY),
            (
                MarkingError::AttemptLimit(AttemptViolation::Section {
                    section: "A".to_string(),
                    limit: 1,
                    attempted: 2,
                    total: 2,
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }
}
