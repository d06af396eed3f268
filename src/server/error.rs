//! Error-to-HTTP response conversion.
//!
//! Submission failures are reported as a status code plus a plain-text reason.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// A status code and the reason shown to the submitter.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<transcodeflow_core::Error> for AppError {
    fn from(e: transcodeflow_core::Error) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Server error in submit handler");
        }

        (self.status, self.message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transcodeflow_core::Error;

    #[test]
    fn missing_field_produces_400() {
        let err = AppError::from(Error::MissingField("input_file_path"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn broker_failure_produces_500() {
        let err = AppError::from(Error::broker("connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("connection refused"));
    }
}
