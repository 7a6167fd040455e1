//! Image reference endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{require_text, success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateImageRequest, Image};
use crate::AppState;

/// POST /api/images - Register an image URL for later attachment.
pub async fn create_image(
    State(state): State<AppState>,
    Json(request): Json<CreateImageRequest>,
) -> ApiResult<Image> {
    require_text("Url", &request.url)?;

    success(state.repo.create_image(request.url.trim()).await?)
}

/// GET /api/images/{id} - Resolve an image id to its URL.
pub async fn get_image(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Image> {
    match state.repo.get_image(id).await? {
        Some(image) => success(image),
        None => Err(AppError::NotFound(format!("Image {} not found", id))),
    }
}
