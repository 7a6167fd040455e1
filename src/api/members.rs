//! Member, profile and subscription API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{
    page_bounds, require_member, require_self, require_text, success, ApiResult, PageQuery,
};
use crate::auth::Viewer;
use crate::errors::AppError;
use crate::models::{
    CreateMemberRequest, CurationSummary, CuratorResponse, MemberProfile, Page,
    UpdateMemberRequest,
};
use crate::AppState;

/// Nickname length bounds, in characters.
const NICKNAME_MIN: usize = 2;
const NICKNAME_MAX: usize = 14;

/// Maximum introduction length, in characters.
const INTRODUCTION_MAX: usize = 200;

/// Subscription state after a subscribe or unsubscribe call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub member_id: i64,
    pub is_subscribed: bool,
    pub my_subscriber: i64,
}

/// POST /api/members - Register a member.
pub async fn create_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> ApiResult<CuratorResponse> {
    validate_nickname(&request.nickname)?;
    if !request.email.contains('@') {
        return Err(AppError::Validation("Email is invalid".to_string()));
    }
    if let Some(introduction) = &request.introduction {
        validate_introduction(introduction)?;
    }

    let member_id = state.repo.create_member(&request).await?;
    tracing::info!("Registered member {}", member_id);

    success(curator_or_not_found(&state, member_id).await?)
}

/// GET /api/members/{id} - Member profile as seen by the viewer.
pub async fn get_member(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> ApiResult<MemberProfile> {
    let curator = curator_or_not_found(&state, id).await?;

    let subscribed = match viewer.0 {
        Some(member) => Some(state.repo.is_subscribed(member, id).await?),
        None => None,
    };

    success(MemberProfile {
        curator,
        subscribed,
    })
}

/// PATCH /api/members/{id} - Edit a profile. Only the member themself may.
pub async fn update_member(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(request): Json<UpdateMemberRequest>,
) -> ApiResult<CuratorResponse> {
    require_self(&state, viewer, id).await?;

    if let Some(nickname) = &request.nickname {
        validate_nickname(nickname)?;
    }
    if let Some(introduction) = &request.introduction {
        validate_introduction(introduction)?;
    }

    state.repo.update_member(id, &request).await?;
    tracing::info!("Updated profile of member {}", id);

    success(curator_or_not_found(&state, id).await?)
}

/// GET /api/members/{id}/curations - Curations the member wrote.
pub async fn member_curations(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Page<CurationSummary>> {
    curator_or_not_found(&state, id).await?;
    let (page, size) = page_bounds(params.page, params.size);

    success(state.repo.member_curations(id, viewer.0, page, size).await?)
}

/// GET /api/members/{id}/likes - Curations the member liked.
pub async fn member_likes(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Page<CurationSummary>> {
    curator_or_not_found(&state, id).await?;
    let (page, size) = page_bounds(params.page, params.size);

    success(state.repo.liked_curations(id, viewer.0, page, size).await?)
}

/// GET /api/members/{id}/subscriptions - Curators the member subscribes to.
pub async fn member_subscriptions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Page<CuratorResponse>> {
    curator_or_not_found(&state, id).await?;
    let (page, size) = page_bounds(params.page, params.size);

    success(state.repo.subscribed_curators(id, page, size).await?)
}

/// POST /api/members/{id}/subscribe - Subscribe the viewer to a curator.
pub async fn subscribe(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> ApiResult<SubscriptionStatus> {
    let subscriber = require_member(&state, viewer).await?;
    curator_or_not_found(&state, id).await?;

    state.repo.subscribe(subscriber, id).await?;

    success(subscription_status(&state, subscriber, id).await?)
}

/// DELETE /api/members/{id}/subscribe - Cancel the viewer's subscription.
pub async fn unsubscribe(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> ApiResult<SubscriptionStatus> {
    let subscriber = require_member(&state, viewer).await?;
    curator_or_not_found(&state, id).await?;

    state.repo.unsubscribe(subscriber, id).await?;

    success(subscription_status(&state, subscriber, id).await?)
}

fn validate_nickname(nickname: &str) -> Result<(), AppError> {
    require_text("Nickname", nickname)?;

    let len = nickname.chars().count();
    if !(NICKNAME_MIN..=NICKNAME_MAX).contains(&len) {
        return Err(AppError::Validation(format!(
            "Nickname must be {} to {} characters",
            NICKNAME_MIN, NICKNAME_MAX
        )));
    }
    if !nickname.chars().all(char::is_alphanumeric) {
        return Err(AppError::Validation(
            "Nickname may only contain letters and digits".to_string(),
        ));
    }
    Ok(())
}

fn validate_introduction(introduction: &str) -> Result<(), AppError> {
    if introduction.chars().count() > INTRODUCTION_MAX {
        return Err(AppError::Validation(format!(
            "Introduction must be at most {} characters",
            INTRODUCTION_MAX
        )));
    }
    Ok(())
}

async fn curator_or_not_found(state: &AppState, id: i64) -> Result<CuratorResponse, AppError> {
    state
        .repo
        .curator_summary(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
}

async fn subscription_status(
    state: &AppState,
    subscriber: i64,
    curator: i64,
) -> Result<SubscriptionStatus, AppError> {
    let summary = curator_or_not_found(state, curator).await?;
    Ok(SubscriptionStatus {
        member_id: curator,
        is_subscribed: state.repo.is_subscribed(subscriber, curator).await?,
        my_subscriber: summary.my_subscriber,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nickname_rules() {
        assert!(validate_nickname("bora").is_ok());
        assert!(validate_nickname("보라돌이").is_ok());
        assert!(validate_nickname("x").is_err());
        assert!(validate_nickname("fifteen15chars1").is_err());
        assert!(validate_nickname("bad name").is_err());
        assert!(validate_nickname("   ").is_err());
    }

    #[test]
    fn test_introduction_limit_counts_characters() {
        assert!(validate_introduction(&"가".repeat(200)).is_ok());
        assert!(validate_introduction(&"a".repeat(201)).is_err());
    }
}
