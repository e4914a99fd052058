use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("request validation failed")]
    Validation { errors: HashMap<String, String> },

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("insufficient behavior data")]
    InsufficientData,

    #[error("candidate generator failed: {0}")]
    Generator(String),

    #[error("result cache unavailable: {0}")]
    Cache(String),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<HashMap<String, String>>,
}

impl EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation { .. } => StatusCode::BAD_REQUEST,
            EngineError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            // InsufficientData and partial generator/cache faults are handled
            // inside the pipeline via fallbacks; reaching here means a bug.
            EngineError::InsufficientData
            | EngineError::Generator(_)
            | EngineError::Cache(_)
            | EngineError::Persistence(_)
            | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let errors = match &self {
            EngineError::Validation { errors } => Some(errors.clone()),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            errors,
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let validation = EngineError::Validation {
            errors: HashMap::from([("limit".to_string(), "must be between 1 and 100".to_string())]),
        };
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            EngineError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            EngineError::Persistence("write failed".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
