//! Category API endpoints.

use axum::{extract::State, Json};

use super::{require_text, success, ApiResult};
use crate::models::{Category, CreateCategoryRequest};
use crate::AppState;

/// GET /api/categories - List all categories.
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    success(state.repo.list_categories().await?)
}

/// POST /api/categories - Create a category.
pub async fn create_category(
    State(state): State<AppState>,
    Json(request): Json<CreateCategoryRequest>,
) -> ApiResult<Category> {
    require_text("Name", &request.name)?;

    success(state.repo.create_category(request.name.trim()).await?)
}
