use crate::AppState;
use crate::api::error::AppError;
use crate::models::{ErrorBody, UploadUrlRequest, UploadUrlResponse};
use crate::utils::validation::sanitize_filename;
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::info;
use validator::Validate;

pub const FORGE_TRANSFORMER_PATH: &str = "/api/forge-transformer";

/// Relays file metadata to the manager and returns where the browser should
/// upload the dataset.
#[utoipa::path(
    post,
    path = "/api/forge-transformer",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Upload URL issued", body = UploadUrlResponse),
        (status = 400, description = "Invalid file metadata", body = ErrorBody),
        (status = 502, description = "Manager service failed", body = ErrorBody),
        (status = 503, description = "Manager service not configured", body = ErrorBody)
    ),
    tag = "forge"
)]
pub async fn create_upload_url(
    State(state): State<AppState>,
    payload: Result<Json<UploadUrlRequest>, JsonRejection>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let manager = state
        .manager
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Upload service is not configured".to_string()))?;

    let file_name =
        sanitize_filename(&req.file_name).map_err(|e| AppError::BadRequest(e.message))?;
    let forwarded = UploadUrlRequest {
        file_name,
        file_type: req.file_type.trim().to_string(),
    };

    let ticket = manager.generate_upload_url(&forwarded).await?;
    info!(
        "📦 Upload session for '{}' ({}) -> job {}",
        forwarded.file_name, forwarded.file_type, ticket.job_id
    );

    Ok(Json(ticket.into()))
}
