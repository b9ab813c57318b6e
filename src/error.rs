/*
 * Responsibility
 * - Boundary error type (AppError)
 * - IntoResponse (HTTP status / JSON error body)
 * - Startup failures are reported here instead of aborting the process
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::services::policy::DecisionError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Broken policy or configuration; not an authorization denial.
    #[error(transparent)]
    PolicyEvaluation(#[from] DecisionError),

    #[error("startup failed: {0}")]
    Startup(String),

    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::PolicyEvaluation(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "POLICY_EVALUATION_ERROR")
            }
            AppError::Startup(_) | AppError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Startup(e.to_string())
    }
}
