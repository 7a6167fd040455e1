//! REST API module.
//!
//! Contains all API routes and handlers following the web client contract.

mod categories;
mod curations;
mod images;
mod members;
mod search;

pub use categories::*;
pub use curations::*;
pub use images::*;
pub use members::*;
pub use search::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::Viewer;
use crate::errors::AppError;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Maximum page size for listings.
const MAX_PAGE_SIZE: u32 = 50;

/// Paging parameters shared by listing endpoints.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    10
}

/// Clamp requested paging to a 1-based page and a bounded size.
fn page_bounds(page: u32, size: u32) -> (u32, u32) {
    (page.max(1), size.clamp(1, MAX_PAGE_SIZE))
}

/// Reject blank text fields.
fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// The viewer's member id, provided it is `member_id` itself.
async fn require_self(state: &AppState, viewer: Viewer, member_id: i64) -> Result<i64, AppError> {
    let member = require_member(state, viewer).await?;
    if member != member_id {
        return Err(AppError::Forbidden(format!(
            "Only member {} may edit this profile",
            member_id
        )));
    }
    Ok(member)
}

/// The viewer's member id, provided the member is registered.
async fn require_member(state: &AppState, viewer: Viewer) -> Result<i64, AppError> {
    let member = viewer.require()?;
    if !state.repo.member_exists(member).await? {
        return Err(AppError::NotFound(format!("Member {} not found", member)));
    }
    Ok(member)
}
