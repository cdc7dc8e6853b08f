use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::python::ProcessError;

/// Errors surfaced by services and handlers.
///
/// Client-facing variants carry the message returned to the caller; the
/// remaining variants are logged and answered with a static message.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Misconfigured(String),

    #[error("script pool saturated")]
    Busy,

    #[error("external process error: {0}")]
    Process(ProcessError),

    #[error("database error: {0}")]
    Database(String),

    #[error("generative model error: {0}")]
    Generative(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ProcessError> for AppError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Saturated { .. } => AppError::Busy,
            other => AppError::Process(other),
        }
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::Database(format!("BSON serialization failed: {}", err))
    }
}

impl AppError {
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Misconfigured(msg) => msg.clone(),
            AppError::Busy => "Server is busy, please retry shortly".to_string(),
            _ => "Internal Server Error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("❌ {}", self);
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "message": self.public_message()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failures_hide_stderr() {
        let err = AppError::from(ProcessError::Failed {
            code: Some(2),
            stderr: "Traceback: secret path".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal Server Error");
    }

    #[test]
    fn test_saturation_maps_to_busy() {
        let err = AppError::from(ProcessError::Saturated { queued: 3 });
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_validation_message_is_public() {
        let err = AppError::Validation("targetCareer is required".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "targetCareer is required");
    }
}
