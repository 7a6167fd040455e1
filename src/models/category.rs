//! Category and image models.

use serde::{Deserialize, Serialize};

/// A curation category such as "Fiction" or "Essay".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

/// Request body for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

/// A registered image reference that curations can attach.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub image_id: i64,
    pub url: String,
}

/// Request body for registering an image URL.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImageRequest {
    pub url: String,
}
