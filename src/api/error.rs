use crate::models::ErrorBody;
use crate::services::manager::ManagerError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] ManagerError),

    #[error("Service Unavailable: {0}")]
    Unavailable(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(e) => {
                tracing::error!("Manager error: {}", e);
                let message = e
                    .upstream_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| "Upload service is unavailable".to_string());
                (StatusCode::BAD_GATEWAY, message)
            }
            AppError::Unavailable(msg) => {
                tracing::warn!("Unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
