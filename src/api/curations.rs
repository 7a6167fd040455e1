//! Curation API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{page_bounds, require_member, require_text, success, ApiResult};
use crate::auth::Viewer;
use crate::errors::AppError;
use crate::models::{
    CreateCurationRequest, Curation, CurationDetailResponse, CurationSummary, Page,
    UpdateCurationRequest,
};
use crate::AppState;

/// Best-curation listing parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestQuery {
    #[serde(default = "super::default_page")]
    pub page: u32,
    #[serde(default = "super::default_size")]
    pub size: u32,
    #[serde(default)]
    pub category_id: Option<i64>,
}

/// Like state after a like or unlike call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub curation_id: i64,
    pub is_liked: bool,
    pub curation_like_count: i32,
}

/// POST /api/curations - Create a curation authored by the viewer.
pub async fn create_curation(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(request): Json<CreateCurationRequest>,
) -> ApiResult<CurationDetailResponse> {
    let author = require_member(&state, viewer).await?;

    require_text("Title", &request.title)?;
    require_text("Content", &request.content)?;
    require_text("Emoji", &request.emoji)?;

    let curation = state.repo.create_curation(author, &request).await?;
    tracing::info!("Member {} created curation {}", author, curation.id);

    let detail = curation_detail(&state, curation.clone(), Some(author)).await?;
    reindex(&state, &curation, detail.category()).await;

    success(detail)
}

/// GET /api/curations/{id} - Curation detail as seen by the viewer.
pub async fn get_curation(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> ApiResult<CurationDetailResponse> {
    let curation = visible_curation(&state, id, viewer).await?;
    success(curation_detail(&state, curation, viewer.0).await?)
}

/// PATCH /api/curations/{id} - Update a curation. Only its curator may.
pub async fn update_curation(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCurationRequest>,
) -> ApiResult<CurationDetailResponse> {
    let author = owned_curation(&state, id, viewer).await?.member_id;

    for (field, value) in [
        ("Title", &request.title),
        ("Content", &request.content),
        ("Emoji", &request.emoji),
    ] {
        if let Some(value) = value {
            require_text(field, value)?;
        }
    }

    let curation = state.repo.update_curation(id, &request).await?;
    let detail = curation_detail(&state, curation.clone(), Some(author)).await?;
    reindex(&state, &curation, detail.category()).await;

    success(detail)
}

/// DELETE /api/curations/{id} - Delete a curation. Only its curator may.
pub async fn delete_curation(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    owned_curation(&state, id, viewer).await?;

    state.repo.delete_curation(id).await?;
    tracing::info!("Deleted curation {}", id);

    if let Err(e) = state.search.remove_curation(id).await {
        tracing::warn!("Failed to remove curation {} from index: {}", id, e);
    }

    success(())
}

/// POST /api/curations/{id}/like - Like a curation as the viewer.
pub async fn like_curation(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> ApiResult<LikeStatus> {
    let member = require_member(&state, viewer).await?;
    visible_curation(&state, id, viewer).await?;

    state.repo.like(id, member).await?;

    success(like_status(&state, id, member).await?)
}

/// DELETE /api/curations/{id}/like - Withdraw the viewer's like.
pub async fn unlike_curation(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> ApiResult<LikeStatus> {
    let member = require_member(&state, viewer).await?;
    visible_curation(&state, id, viewer).await?;

    state.repo.unlike(id, member).await?;

    success(like_status(&state, id, member).await?)
}

/// GET /api/curations/best - Most liked public curations.
pub async fn best_curations(
    State(state): State<AppState>,
    Query(params): Query<BestQuery>,
) -> ApiResult<Page<CurationSummary>> {
    let (page, size) = page_bounds(params.page, params.size);

    success(
        state
            .repo
            .best_curations(page, size, params.category_id)
            .await?,
    )
}

/// Assemble the detail view of `curation` for `viewer`.
///
/// The like and subscription flags stay `None` for anonymous viewers.
pub async fn curation_detail(
    state: &AppState,
    curation: Curation,
    viewer: Option<i64>,
) -> Result<CurationDetailResponse, AppError> {
    let curator = state
        .repo
        .curator_summary(curation.member_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", curation.member_id)))?;

    let category = state
        .repo
        .get_category(curation.category_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Category {} not found", curation.category_id))
        })?;

    let (is_liked, is_subscribed) = match viewer {
        Some(member) => (
            Some(state.repo.is_liked(curation.id, member).await?),
            Some(state.repo.is_subscribed(member, curation.member_id).await?),
        ),
        None => (None, None),
    };

    Ok(CurationDetailResponse::builder()
        .curator(curator)
        .category_id(category.category_id)
        .category(category.name)
        .is_liked(is_liked)
        .is_subscribed(is_subscribed)
        .curation_like_count(state.repo.like_count(curation.id).await?)
        .curation_id(curation.id)
        .emoji(curation.emoji)
        .title(curation.title)
        .content(curation.content)
        .image_ids(state.repo.list_image_ids(curation.id).await?)
        .visibility(curation.visibility)
        .created_at(curation.created_at)
        .updated_at(curation.updated_at)
        .build())
}

/// Fetch a curation the viewer is allowed to read.
async fn visible_curation(state: &AppState, id: i64, viewer: Viewer) -> Result<Curation, AppError> {
    let curation = state
        .repo
        .get_curation(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Curation {} not found", id)))?;

    if !curation.is_visible_to(viewer.0) {
        return Err(AppError::Forbidden(format!("Curation {} is private", id)));
    }

    Ok(curation)
}

/// Fetch a curation the viewer authored.
async fn owned_curation(state: &AppState, id: i64, viewer: Viewer) -> Result<Curation, AppError> {
    let member = viewer.require()?;
    let curation = state
        .repo
        .get_curation(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Curation {} not found", id)))?;

    if curation.member_id != member {
        return Err(AppError::Forbidden(format!(
            "Curation {} belongs to another curator",
            id
        )));
    }

    Ok(curation)
}

async fn like_status(state: &AppState, id: i64, member: i64) -> Result<LikeStatus, AppError> {
    Ok(LikeStatus {
        curation_id: id,
        is_liked: state.repo.is_liked(id, member).await?,
        curation_like_count: state.repo.like_count(id).await?,
    })
}

/// Sync the search index after a write. Failures are logged only.
async fn reindex(state: &AppState, curation: &Curation, category: &str) {
    if let Err(e) = state.search.index_curation(curation, category).await {
        tracing::warn!("Failed to index curation {}: {}", curation.id, e);
    }
}
