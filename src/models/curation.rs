//! Curation models, including the detail response shown on the curation page.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::CuratorResponse;

/// Access-control classification of a curation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PUBLIC" => Some(Visibility::Public),
            "PRIVATE" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// A stored curation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curation {
    pub id: i64,
    pub member_id: i64,
    pub category_id: i64,
    pub emoji: String,
    pub title: String,
    pub content: String,
    pub visibility: Visibility,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Curation {
    /// Whether `viewer` may read this curation.
    pub fn is_visible_to(&self, viewer: Option<i64>) -> bool {
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => viewer == Some(self.member_id),
        }
    }
}

/// Response body of the curation detail view.
///
/// Built once per request through [`CurationDetailResponse::builder`] and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurationDetailResponse {
    curator: Option<CuratorResponse>,
    category_id: i64,
    category: String,
    is_liked: Option<bool>,
    is_subscribed: Option<bool>,
    curation_like_count: i32,
    curation_id: i64,
    emoji: String,
    title: String,
    content: String,
    image_ids: Vec<i64>,
    visibility: Visibility,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl CurationDetailResponse {
    pub fn builder() -> CurationDetailResponseBuilder {
        CurationDetailResponseBuilder::default()
    }

    pub fn curator(&self) -> Option<&CuratorResponse> {
        self.curator.as_ref()
    }

    pub fn category_id(&self) -> i64 {
        self.category_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_liked(&self) -> Option<bool> {
        self.is_liked
    }

    pub fn is_subscribed(&self) -> Option<bool> {
        self.is_subscribed
    }

    pub fn curation_like_count(&self) -> i32 {
        self.curation_like_count
    }

    pub fn curation_id(&self) -> i64 {
        self.curation_id
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn image_ids(&self) -> &[i64] {
        &self.image_ids
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> NaiveDateTime {
        self.updated_at
    }
}

/// Staged constructor for [`CurationDetailResponse`].
///
/// Fields that are never set keep their zero value: `0`, empty text, no
/// images, `None` for the curator and the viewer flags, [`Visibility::Public`],
/// and the Unix epoch for timestamps.
///
/// ```rust,ignore
/// let detail = CurationDetailResponse::builder()
///     .curation_id(34)
///     .title("T")
///     .is_liked(Some(true))
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct CurationDetailResponseBuilder {
    curator: Option<CuratorResponse>,
    category_id: i64,
    category: String,
    is_liked: Option<bool>,
    is_subscribed: Option<bool>,
    curation_like_count: i32,
    curation_id: i64,
    emoji: String,
    title: String,
    content: String,
    image_ids: Vec<i64>,
    visibility: Visibility,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl CurationDetailResponseBuilder {
    pub fn curator(mut self, curator: CuratorResponse) -> Self {
        self.curator = Some(curator);
        self
    }

    pub fn category_id(mut self, category_id: i64) -> Self {
        self.category_id = category_id;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the viewer's like status; `None` when the viewer is unknown.
    pub fn is_liked(mut self, is_liked: Option<bool>) -> Self {
        self.is_liked = is_liked;
        self
    }

    /// Set the viewer's subscription status; `None` when the viewer is unknown.
    pub fn is_subscribed(mut self, is_subscribed: Option<bool>) -> Self {
        self.is_subscribed = is_subscribed;
        self
    }

    pub fn curation_like_count(mut self, count: i32) -> Self {
        self.curation_like_count = count;
        self
    }

    pub fn curation_id(mut self, curation_id: i64) -> Self {
        self.curation_id = curation_id;
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = emoji.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the attached images in display order.
    pub fn image_ids(mut self, image_ids: Vec<i64>) -> Self {
        self.image_ids = image_ids;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn updated_at(mut self, updated_at: NaiveDateTime) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn build(self) -> CurationDetailResponse {
        CurationDetailResponse {
            curator: self.curator,
            category_id: self.category_id,
            category: self.category,
            is_liked: self.is_liked,
            is_subscribed: self.is_subscribed,
            curation_like_count: self.curation_like_count,
            curation_id: self.curation_id,
            emoji: self.emoji,
            title: self.title,
            content: self.content,
            image_ids: self.image_ids,
            visibility: self.visibility,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Compact curation entry used by listings and search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurationSummary {
    pub curation_id: i64,
    pub member_id: i64,
    pub nickname: String,
    pub category_id: i64,
    pub emoji: String,
    pub title: String,
    pub content: String,
    pub curation_like_count: i32,
    pub visibility: Visibility,
    pub created_at: NaiveDateTime,
}

/// Request body for creating a new curation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCurationRequest {
    pub category_id: i64,
    pub emoji: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub image_ids: Vec<i64>,
}

/// Request body for updating an existing curation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCurationRequest {
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    /// Replaces the attached images when present
    #[serde(default)]
    pub image_ids: Option<Vec<i64>>,
}
