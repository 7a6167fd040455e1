//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use std::collections::HashSet;

use chrono::{NaiveDateTime, SubsecRound, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Category, CreateCurationRequest, CreateMemberRequest, CuratorResponse, Curation,
    CurationSummary, Image, Page, UpdateCurationRequest, UpdateMemberRequest, Visibility,
};

const CURATION_COLUMNS: &str =
    "id, member_id, category_id, emoji, title, content, visibility, created_at, updated_at";

const SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.member_id, m.nickname, c.category_id, c.emoji, c.title, c.content,
           c.visibility, c.created_at,
           (SELECT COUNT(*) FROM curation_likes l WHERE l.curation_id = c.id) AS like_count
    FROM curations c
    JOIN members m ON m.id = c.member_id
"#;

const CURATOR_SELECT: &str = r#"
    SELECT m.id, m.email, m.nickname, m.introduction, m.image,
           (SELECT COUNT(*) FROM subscriptions s WHERE s.curator_id = m.id) AS subscribers,
           (SELECT COUNT(*) FROM curations c WHERE c.member_id = m.id) AS curations
    FROM members m
"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== MEMBER OPERATIONS ====================

    /// Register a new member and return its id.
    pub async fn create_member(&self, request: &CreateMemberRequest) -> Result<i64, AppError> {
        let result = sqlx::query(
            "INSERT INTO members (email, nickname, introduction, image, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.email)
        .bind(&request.nickname)
        .bind(&request.introduction)
        .bind(&request.image)
        .bind(now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn member_exists(&self, id: i64) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM members WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Public summary of a member with subscriber and curation counts.
    pub async fn curator_summary(&self, member_id: i64) -> Result<Option<CuratorResponse>, AppError> {
        let row = sqlx::query(&format!("{} WHERE m.id = ?", CURATOR_SELECT))
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(curator_from_row)
            .transpose()
            .map_err(AppError::from)
    }

    /// Apply a partial profile update. Absent fields keep their stored value.
    pub async fn update_member(
        &self,
        member_id: i64,
        request: &UpdateMemberRequest,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE members
            SET nickname = COALESCE(?1, nickname),
                introduction = COALESCE(?2, introduction),
                image = COALESCE(?3, image)
            WHERE id = ?4
            "#,
        )
        .bind(&request.nickname)
        .bind(&request.introduction)
        .bind(&request.image)
        .bind(member_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Member {} not found", member_id)));
        }

        Ok(())
    }

    /// Curations written by `member_id`, newest first.
    ///
    /// Private curations are listed only when `viewer` is their author.
    pub async fn member_curations(
        &self,
        member_id: i64,
        viewer: Option<i64>,
        page: u32,
        size: u32,
    ) -> Result<Page<CurationSummary>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE c.member_id = ?1 AND (c.visibility = 'PUBLIC' OR c.member_id = ?2) ORDER BY c.id DESC LIMIT ?3 OFFSET ?4",
            SUMMARY_SELECT
        ))
        .bind(member_id)
        .bind(viewer)
        .bind(i64::from(size))
        .bind(page_offset(page, size))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total_row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM curations c WHERE c.member_id = ?1 AND (c.visibility = 'PUBLIC' OR c.member_id = ?2)",
        )
        .bind(member_id)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(items, page, size, total_row.try_get("cnt")?))
    }

    /// Curations liked by `member_id`, most recently liked first.
    ///
    /// Private curations are listed only when `viewer` is their author.
    pub async fn liked_curations(
        &self,
        member_id: i64,
        viewer: Option<i64>,
        page: u32,
        size: u32,
    ) -> Result<Page<CurationSummary>, AppError> {
        let rows = sqlx::query(&format!(
            "{} JOIN curation_likes ul ON ul.curation_id = c.id WHERE ul.member_id = ?1 AND (c.visibility = 'PUBLIC' OR c.member_id = ?2) ORDER BY ul.created_at DESC, c.id DESC LIMIT ?3 OFFSET ?4",
            SUMMARY_SELECT
        ))
        .bind(member_id)
        .bind(viewer)
        .bind(i64::from(size))
        .bind(page_offset(page, size))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS cnt
            FROM curation_likes ul
            JOIN curations c ON c.id = ul.curation_id
            WHERE ul.member_id = ?1 AND (c.visibility = 'PUBLIC' OR c.member_id = ?2)
            "#,
        )
        .bind(member_id)
        .bind(viewer)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(items, page, size, total_row.try_get("cnt")?))
    }

    /// Curators `subscriber_id` subscribes to, most recent subscription first.
    pub async fn subscribed_curators(
        &self,
        subscriber_id: i64,
        page: u32,
        size: u32,
    ) -> Result<Page<CuratorResponse>, AppError> {
        let rows = sqlx::query(&format!(
            "{} JOIN subscriptions sub ON sub.curator_id = m.id WHERE sub.subscriber_id = ?1 ORDER BY sub.created_at DESC, m.id DESC LIMIT ?2 OFFSET ?3",
            CURATOR_SELECT
        ))
        .bind(subscriber_id)
        .bind(i64::from(size))
        .bind(page_offset(page, size))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(curator_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total_row =
            sqlx::query("SELECT COUNT(*) AS cnt FROM subscriptions WHERE subscriber_id = ?")
                .bind(subscriber_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Page::new(items, page, size, total_row.try_get("cnt")?))
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(category_from_row)
            .collect::<Result<_, _>>()
            .map_err(AppError::from)
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(category_from_row)
            .transpose()
            .map_err(AppError::from)
    }

    /// Create a new category. Names are unique.
    pub async fn create_category(&self, name: &str) -> Result<Category, AppError> {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(Category {
            category_id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    // ==================== IMAGE OPERATIONS ====================

    /// Register an image URL.
    pub async fn create_image(&self, url: &str) -> Result<Image, AppError> {
        let result = sqlx::query("INSERT INTO images (url, created_at) VALUES (?, ?)")
            .bind(url)
            .bind(now())
            .execute(&self.pool)
            .await?;

        Ok(Image {
            image_id: result.last_insert_rowid(),
            url: url.to_string(),
        })
    }

    /// Get an image by ID.
    pub async fn get_image(&self, id: i64) -> Result<Option<Image>, AppError> {
        let row = sqlx::query("SELECT id, url FROM images WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Image {
            image_id: row.try_get("id")?,
            url: row.try_get("url")?,
        }))
    }

    // ==================== CURATION OPERATIONS ====================

    /// Create a curation authored by `member_id` with its ordered images.
    pub async fn create_curation(
        &self,
        member_id: i64,
        request: &CreateCurationRequest,
    ) -> Result<Curation, AppError> {
        let mut tx = self.pool.begin().await?;

        ensure_category_exists(&mut tx, request.category_id).await?;
        ensure_images_attachable(&mut tx, &request.image_ids).await?;

        let now = now();
        let result = sqlx::query(
            "INSERT INTO curations (member_id, category_id, emoji, title, content, visibility, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(member_id)
        .bind(request.category_id)
        .bind(&request.emoji)
        .bind(&request.title)
        .bind(&request.content)
        .bind(request.visibility.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        replace_images(&mut tx, id, &request.image_ids).await?;

        tx.commit().await?;

        tracing::debug!(
            "Created curation {} with {} images",
            id,
            request.image_ids.len()
        );

        Ok(Curation {
            id,
            member_id,
            category_id: request.category_id,
            emoji: request.emoji.clone(),
            title: request.title.clone(),
            content: request.content.clone(),
            visibility: request.visibility,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a curation by ID.
    pub async fn get_curation(&self, id: i64) -> Result<Option<Curation>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_curation(&mut conn, id).await
    }

    /// Apply a partial update. Absent fields keep their stored value.
    pub async fn update_curation(
        &self,
        id: i64,
        request: &UpdateCurationRequest,
    ) -> Result<Curation, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing = fetch_curation(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Curation {} not found", id)))?;

        let category_id = request.category_id.unwrap_or(existing.category_id);
        if category_id != existing.category_id {
            ensure_category_exists(&mut tx, category_id).await?;
        }
        if let Some(image_ids) = &request.image_ids {
            ensure_images_attachable(&mut tx, image_ids).await?;
        }

        let updated = Curation {
            id,
            member_id: existing.member_id,
            category_id,
            emoji: request.emoji.clone().unwrap_or(existing.emoji),
            title: request.title.clone().unwrap_or(existing.title),
            content: request.content.clone().unwrap_or(existing.content),
            visibility: request.visibility.unwrap_or(existing.visibility),
            created_at: existing.created_at,
            updated_at: now(),
        };

        sqlx::query(
            "UPDATE curations SET category_id = ?, emoji = ?, title = ?, content = ?, visibility = ?, updated_at = ? WHERE id = ?",
        )
        .bind(updated.category_id)
        .bind(&updated.emoji)
        .bind(&updated.title)
        .bind(&updated.content)
        .bind(updated.visibility.as_str())
        .bind(updated.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(image_ids) = &request.image_ids {
            replace_images(&mut tx, id, image_ids).await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a curation together with its likes and image links.
    pub async fn delete_curation(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM curations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Curation {} not found", id)));
        }

        Ok(())
    }

    /// Image IDs attached to a curation, in display order.
    pub async fn list_image_ids(&self, curation_id: i64) -> Result<Vec<i64>, AppError> {
        let rows = sqlx::query(
            "SELECT image_id FROM curation_images WHERE curation_id = ? ORDER BY position",
        )
        .bind(curation_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("image_id"))
            .collect::<Result<_, _>>()
            .map_err(AppError::from)
    }

    /// Total number of likes on a curation.
    pub async fn like_count(&self, curation_id: i64) -> Result<i32, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM curation_likes WHERE curation_id = ?")
            .bind(curation_id)
            .fetch_one(&self.pool)
            .await?;

        like_count_from(row.try_get("cnt")?)
    }

    /// Most liked public curations, optionally restricted to one category.
    pub async fn best_curations(
        &self,
        page: u32,
        size: u32,
        category_id: Option<i64>,
    ) -> Result<Page<CurationSummary>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE c.visibility = 'PUBLIC' AND (?1 IS NULL OR c.category_id = ?1) ORDER BY like_count DESC, c.id DESC LIMIT ?2 OFFSET ?3",
            SUMMARY_SELECT
        ))
        .bind(category_id)
        .bind(i64::from(size))
        .bind(page_offset(page, size))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let total_row = sqlx::query(
            "SELECT COUNT(*) AS cnt FROM curations WHERE visibility = 'PUBLIC' AND (?1 IS NULL OR category_id = ?1)",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(items, page, size, total_row.try_get("cnt")?))
    }

    /// Listing entry for a single curation.
    pub async fn curation_summary(&self, id: i64) -> Result<Option<CurationSummary>, AppError> {
        let row = sqlx::query(&format!("{} WHERE c.id = ?", SUMMARY_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(summary_from_row).transpose()
    }

    /// All public curations paired with their category name, for indexing.
    pub async fn list_public_curations(&self) -> Result<Vec<(Curation, String)>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.member_id, c.category_id, c.emoji, c.title, c.content, c.visibility,
                   c.created_at, c.updated_at, k.name AS category_name
            FROM curations c
            JOIN categories k ON k.id = c.category_id
            WHERE c.visibility = 'PUBLIC'
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Ok((curation_from_row(row)?, row.try_get("category_name")?)))
            .collect::<Result<_, sqlx::Error>>()
            .map_err(AppError::from)
    }

    // ==================== LIKE OPERATIONS ====================

    /// Record that `member_id` likes a curation.
    pub async fn like(&self, curation_id: i64, member_id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO curation_likes (curation_id, member_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(curation_id)
        .bind(member_id)
        .bind(now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Curation {} is already liked",
                curation_id
            )));
        }

        Ok(())
    }

    /// Remove a like.
    pub async fn unlike(&self, curation_id: i64, member_id: i64) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM curation_likes WHERE curation_id = ? AND member_id = ?")
                .bind(curation_id)
                .bind(member_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Curation {} is not liked",
                curation_id
            )));
        }

        Ok(())
    }

    pub async fn is_liked(&self, curation_id: i64, member_id: i64) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM curation_likes WHERE curation_id = ? AND member_id = ?) AS liked",
        )
        .bind(curation_id)
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;

        let liked: i64 = row.try_get("liked")?;
        Ok(liked != 0)
    }

    // ==================== SUBSCRIPTION OPERATIONS ====================

    /// Subscribe `subscriber_id` to a curator.
    pub async fn subscribe(&self, subscriber_id: i64, curator_id: i64) -> Result<(), AppError> {
        if subscriber_id == curator_id {
            return Err(AppError::Validation(
                "Cannot subscribe to yourself".to_string(),
            ));
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscriptions (subscriber_id, curator_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(subscriber_id)
        .bind(curator_id)
        .bind(now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Already subscribed to member {}",
                curator_id
            )));
        }

        Ok(())
    }

    /// Cancel a subscription.
    pub async fn unsubscribe(&self, subscriber_id: i64, curator_id: i64) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = ? AND curator_id = ?")
                .bind(subscriber_id)
                .bind(curator_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Not subscribed to member {}",
                curator_id
            )));
        }

        Ok(())
    }

    pub async fn is_subscribed(&self, subscriber_id: i64, curator_id: i64) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE subscriber_id = ? AND curator_id = ?) AS subscribed",
        )
        .bind(subscriber_id)
        .bind(curator_id)
        .fetch_one(&self.pool)
        .await?;

        let subscribed: i64 = row.try_get("subscribed")?;
        Ok(subscribed != 0)
    }
}

// ==================== HELPERS ====================

/// Current UTC time truncated to whole seconds.
fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

/// Row offset of a 1-based page.
fn page_offset(page: u32, size: u32) -> i64 {
    i64::from(page.saturating_sub(1)) * i64::from(size)
}

fn like_count_from(count: i64) -> Result<i32, AppError> {
    i32::try_from(count)
        .map_err(|_| AppError::Internal(format!("Like count {} out of range", count)))
}

async fn fetch_curation(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Curation>, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM curations WHERE id = ?",
        CURATION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref()
        .map(curation_from_row)
        .transpose()
        .map_err(AppError::from)
}

async fn ensure_category_exists(conn: &mut SqliteConnection, category_id: i64) -> Result<(), AppError> {
    let found = sqlx::query("SELECT 1 FROM categories WHERE id = ?")
        .bind(category_id)
        .fetch_optional(&mut *conn)
        .await?;

    if found.is_none() {
        return Err(AppError::Validation(format!(
            "Category {} does not exist",
            category_id
        )));
    }

    Ok(())
}

/// Image lists must be duplicate-free and reference registered images.
async fn ensure_images_attachable(
    conn: &mut SqliteConnection,
    image_ids: &[i64],
) -> Result<(), AppError> {
    let mut seen = HashSet::with_capacity(image_ids.len());
    for id in image_ids {
        if !seen.insert(*id) {
            return Err(AppError::Validation(format!(
                "Image {} is attached more than once",
                id
            )));
        }

        let found = sqlx::query("SELECT 1 FROM images WHERE id = ?")
            .bind(*id)
            .fetch_optional(&mut *conn)
            .await?;

        if found.is_none() {
            return Err(AppError::Validation(format!("Image {} does not exist", id)));
        }
    }

    Ok(())
}

async fn replace_images(
    conn: &mut SqliteConnection,
    curation_id: i64,
    image_ids: &[i64],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM curation_images WHERE curation_id = ?")
        .bind(curation_id)
        .execute(&mut *conn)
        .await?;

    for (position, image_id) in image_ids.iter().enumerate() {
        sqlx::query("INSERT INTO curation_images (curation_id, image_id, position) VALUES (?, ?, ?)")
            .bind(curation_id)
            .bind(*image_id)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

fn visibility_from_column(value: &str) -> Visibility {
    Visibility::from_str(value).unwrap_or_else(|| {
        tracing::warn!("Unknown visibility {:?} in database, treating as PUBLIC", value);
        Visibility::default()
    })
}

fn category_from_row(row: &SqliteRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        category_id: row.try_get("id")?,
        name: row.try_get("name")?,
    })
}

fn curation_from_row(row: &SqliteRow) -> Result<Curation, sqlx::Error> {
    let visibility: String = row.try_get("visibility")?;
    Ok(Curation {
        id: row.try_get("id")?,
        member_id: row.try_get("member_id")?,
        category_id: row.try_get("category_id")?,
        emoji: row.try_get("emoji")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        visibility: visibility_from_column(&visibility),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn curator_from_row(row: &SqliteRow) -> Result<CuratorResponse, sqlx::Error> {
    Ok(CuratorResponse {
        member_id: row.try_get("id")?,
        email: row.try_get("email")?,
        nickname: row.try_get("nickname")?,
        introduction: row.try_get("introduction")?,
        image: row.try_get("image")?,
        my_subscriber: row.try_get("subscribers")?,
        curations: row.try_get("curations")?,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<CurationSummary, AppError> {
    let visibility: String = row.try_get("visibility")?;
    let like_count: i64 = row.try_get("like_count")?;
    Ok(CurationSummary {
        curation_id: row.try_get("id")?,
        member_id: row.try_get("member_id")?,
        nickname: row.try_get("nickname")?,
        category_id: row.try_get("category_id")?,
        emoji: row.try_get("emoji")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        curation_like_count: like_count_from(like_count)?,
        visibility: visibility_from_column(&visibility),
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    struct Fixture {
        repo: Repository,
        _temp_dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        Fixture {
            repo: Repository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    async fn member(repo: &Repository, email: &str) -> i64 {
        repo.create_member(&CreateMemberRequest {
            email: email.to_string(),
            nickname: email.split('@').next().unwrap().to_string(),
            introduction: None,
            image: None,
        })
        .await
        .unwrap()
    }

    fn curation_request(category_id: i64, image_ids: Vec<i64>) -> CreateCurationRequest {
        CreateCurationRequest {
            category_id,
            emoji: "📚".to_string(),
            title: "Winter reads".to_string(),
            content: "Books for long nights".to_string(),
            visibility: Visibility::Public,
            image_ids,
        }
    }

    #[tokio::test]
    async fn test_curation_images_keep_order() {
        let f = fixture().await;
        let author = member(&f.repo, "a@whosbook.dev").await;
        let category = f.repo.create_category("Fiction").await.unwrap();
        let first = f.repo.create_image("https://img/1.png").await.unwrap();
        let second = f.repo.create_image("https://img/2.png").await.unwrap();
        let third = f.repo.create_image("https://img/3.png").await.unwrap();

        let ids = vec![third.image_id, first.image_id, second.image_id];
        let curation = f
            .repo
            .create_curation(author, &curation_request(category.category_id, ids.clone()))
            .await
            .unwrap();

        assert_eq!(f.repo.list_image_ids(curation.id).await.unwrap(), ids);

        let stored = f.repo.get_curation(curation.id).await.unwrap().unwrap();
        assert_eq!(stored, curation);
    }

    #[tokio::test]
    async fn test_curation_rejects_bad_references() {
        let f = fixture().await;
        let author = member(&f.repo, "a@whosbook.dev").await;
        let category = f.repo.create_category("Essay").await.unwrap();
        let image = f.repo.create_image("https://img/1.png").await.unwrap();

        let err = f
            .repo
            .create_curation(author, &curation_request(category.category_id + 100, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f
            .repo
            .create_curation(
                author,
                &curation_request(category.category_id, vec![image.image_id, image.image_id]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f
            .repo
            .create_curation(author, &curation_request(category.category_id, vec![999]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_images_and_keeps_other_fields() {
        let f = fixture().await;
        let author = member(&f.repo, "a@whosbook.dev").await;
        let category = f.repo.create_category("Poetry").await.unwrap();
        let first = f.repo.create_image("https://img/1.png").await.unwrap();
        let second = f.repo.create_image("https://img/2.png").await.unwrap();

        let curation = f
            .repo
            .create_curation(
                author,
                &curation_request(category.category_id, vec![first.image_id]),
            )
            .await
            .unwrap();

        let updated = f
            .repo
            .update_curation(
                curation.id,
                &UpdateCurationRequest {
                    title: Some("Spring reads".to_string()),
                    visibility: Some(Visibility::Private),
                    image_ids: Some(vec![second.image_id, first.image_id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Spring reads");
        assert_eq!(updated.content, curation.content);
        assert_eq!(updated.visibility, Visibility::Private);
        assert_eq!(updated.created_at, curation.created_at);
        assert_eq!(
            f.repo.list_image_ids(curation.id).await.unwrap(),
            vec![second.image_id, first.image_id]
        );
    }

    #[tokio::test]
    async fn test_likes_and_counts() {
        let f = fixture().await;
        let author = member(&f.repo, "a@whosbook.dev").await;
        let reader = member(&f.repo, "b@whosbook.dev").await;
        let category = f.repo.create_category("Fiction").await.unwrap();
        let curation = f
            .repo
            .create_curation(author, &curation_request(category.category_id, vec![]))
            .await
            .unwrap();

        assert_eq!(f.repo.like_count(curation.id).await.unwrap(), 0);
        assert!(!f.repo.is_liked(curation.id, reader).await.unwrap());

        f.repo.like(curation.id, reader).await.unwrap();
        assert!(f.repo.is_liked(curation.id, reader).await.unwrap());
        assert_eq!(f.repo.like_count(curation.id).await.unwrap(), 1);

        let err = f.repo.like(curation.id, reader).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        f.repo.unlike(curation.id, reader).await.unwrap();
        let err = f.repo.unlike(curation.id, reader).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_subscriptions_feed_curator_summary() {
        let f = fixture().await;
        let curator = member(&f.repo, "a@whosbook.dev").await;
        let reader = member(&f.repo, "b@whosbook.dev").await;
        let category = f.repo.create_category("Fiction").await.unwrap();
        f.repo
            .create_curation(curator, &curation_request(category.category_id, vec![]))
            .await
            .unwrap();

        let err = f.repo.subscribe(curator, curator).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        f.repo.subscribe(reader, curator).await.unwrap();
        assert!(f.repo.is_subscribed(reader, curator).await.unwrap());
        assert!(!f.repo.is_subscribed(curator, reader).await.unwrap());

        let summary = f.repo.curator_summary(curator).await.unwrap().unwrap();
        assert_eq!(summary.my_subscriber, 1);
        assert_eq!(summary.curations, 1);
        assert_eq!(summary.nickname, "a");

        let err = f.repo.subscribe(reader, curator).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let f = fixture().await;
        member(&f.repo, "a@whosbook.dev").await;

        let err = f
            .repo
            .create_member(&CreateMemberRequest {
                email: "a@whosbook.dev".to_string(),
                nickname: "other".to_string(),
                introduction: None,
                image: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_best_curations_orders_by_likes_and_hides_private() {
        let f = fixture().await;
        let author = member(&f.repo, "a@whosbook.dev").await;
        let fans = [
            member(&f.repo, "b@whosbook.dev").await,
            member(&f.repo, "c@whosbook.dev").await,
        ];
        let fiction = f.repo.create_category("Fiction").await.unwrap();
        let essay = f.repo.create_category("Essay").await.unwrap();

        let quiet = f
            .repo
            .create_curation(author, &curation_request(fiction.category_id, vec![]))
            .await
            .unwrap();
        let popular = f
            .repo
            .create_curation(author, &curation_request(essay.category_id, vec![]))
            .await
            .unwrap();
        let mut hidden_request = curation_request(fiction.category_id, vec![]);
        hidden_request.visibility = Visibility::Private;
        f.repo.create_curation(author, &hidden_request).await.unwrap();

        for fan in &fans {
            f.repo.like(popular.id, *fan).await.unwrap();
        }
        f.repo.like(quiet.id, fans[0]).await.unwrap();

        let page = f.repo.best_curations(1, 10, None).await.unwrap();
        assert_eq!(page.total, 2);
        let ids: Vec<i64> = page.items.iter().map(|c| c.curation_id).collect();
        assert_eq!(ids, vec![popular.id, quiet.id]);
        assert_eq!(page.items[0].curation_like_count, 2);

        let page = f
            .repo
            .best_curations(1, 10, Some(fiction.category_id))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].curation_id, quiet.id);

        let page = f.repo.best_curations(2, 1, None).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].curation_id, quiet.id);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_delete_curation() {
        let f = fixture().await;
        let author = member(&f.repo, "a@whosbook.dev").await;
        let category = f.repo.create_category("Fiction").await.unwrap();
        let curation = f
            .repo
            .create_curation(author, &curation_request(category.category_id, vec![]))
            .await
            .unwrap();
        f.repo.like(curation.id, author).await.unwrap();

        f.repo.delete_curation(curation.id).await.unwrap();
        assert!(f.repo.get_curation(curation.id).await.unwrap().is_none());
        assert_eq!(f.repo.like_count(curation.id).await.unwrap(), 0);

        let err = f.repo.delete_curation(curation.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_missing_curation_is_not_found() {
        let f = fixture().await;

        let err = f
            .repo
            .update_curation(404, &UpdateCurationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_like_count_out_of_range_is_internal() {
        assert_eq!(like_count_from(7).unwrap(), 7);
        let err = like_count_from(i64::from(i32::MAX) + 1).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_update_member_keeps_absent_fields() {
        let f = fixture().await;
        let id = member(&f.repo, "a@whosbook.dev").await;

        f.repo
            .update_member(
                id,
                &UpdateMemberRequest {
                    introduction: Some("Reads at night".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let summary = f.repo.curator_summary(id).await.unwrap().unwrap();
        assert_eq!(summary.nickname, "a");
        assert_eq!(summary.introduction.as_deref(), Some("Reads at night"));

        let err = f
            .repo
            .update_member(404, &UpdateMemberRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_member_curations_hide_private_from_others() {
        let f = fixture().await;
        let author = member(&f.repo, "a@whosbook.dev").await;
        let other = member(&f.repo, "b@whosbook.dev").await;
        let category = f.repo.create_category("Fiction").await.unwrap();

        let public = f
            .repo
            .create_curation(author, &curation_request(category.category_id, vec![]))
            .await
            .unwrap();
        let mut hidden = curation_request(category.category_id, vec![]);
        hidden.visibility = Visibility::Private;
        let hidden = f.repo.create_curation(author, &hidden).await.unwrap();

        let own = f
            .repo
            .member_curations(author, Some(author), 1, 10)
            .await
            .unwrap();
        let ids: Vec<i64> = own.items.iter().map(|c| c.curation_id).collect();
        assert_eq!(ids, vec![hidden.id, public.id]);
        assert_eq!(own.total, 2);

        for viewer in [Some(other), None] {
            let seen = f
                .repo
                .member_curations(author, viewer, 1, 10)
                .await
                .unwrap();
            assert_eq!(seen.items.len(), 1);
            assert_eq!(seen.items[0].curation_id, public.id);
            assert_eq!(seen.total, 1);
        }
    }

    #[tokio::test]
    async fn test_liked_curations_newest_like_first() {
        let f = fixture().await;
        let author = member(&f.repo, "a@whosbook.dev").await;
        let fan = member(&f.repo, "b@whosbook.dev").await;
        let category = f.repo.create_category("Fiction").await.unwrap();

        let first = f
            .repo
            .create_curation(author, &curation_request(category.category_id, vec![]))
            .await
            .unwrap();
        let second = f
            .repo
            .create_curation(author, &curation_request(category.category_id, vec![]))
            .await
            .unwrap();
        let mut hidden = curation_request(category.category_id, vec![]);
        hidden.visibility = Visibility::Private;
        let hidden = f.repo.create_curation(author, &hidden).await.unwrap();

        f.repo.like(first.id, fan).await.unwrap();
        f.repo.like(second.id, fan).await.unwrap();
        f.repo.like(hidden.id, fan).await.unwrap();

        let liked = f.repo.liked_curations(fan, Some(fan), 1, 10).await.unwrap();
        let ids: Vec<i64> = liked.items.iter().map(|c| c.curation_id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(liked.total, 2);
        assert_eq!(liked.items[0].curation_like_count, 1);

        let by_author = f
            .repo
            .liked_curations(fan, Some(author), 1, 10)
            .await
            .unwrap();
        assert_eq!(by_author.total, 3);

        let paged = f.repo.liked_curations(fan, None, 2, 1).await.unwrap();
        assert_eq!(paged.items.len(), 1);
        assert_eq!(paged.items[0].curation_id, first.id);
    }

    #[tokio::test]
    async fn test_subscribed_curators_carry_counts() {
        let f = fixture().await;
        let reader = member(&f.repo, "r@whosbook.dev").await;
        let busy = member(&f.repo, "busy@whosbook.dev").await;
        let quiet = member(&f.repo, "quiet@whosbook.dev").await;
        let category = f.repo.create_category("Fiction").await.unwrap();
        f.repo
            .create_curation(busy, &curation_request(category.category_id, vec![]))
            .await
            .unwrap();

        f.repo.subscribe(reader, busy).await.unwrap();
        f.repo.subscribe(reader, quiet).await.unwrap();
        f.repo.subscribe(quiet, busy).await.unwrap();

        let page = f.repo.subscribed_curators(reader, 1, 10).await.unwrap();
        let ids: Vec<i64> = page.items.iter().map(|c| c.member_id).collect();
        assert_eq!(ids, vec![quiet, busy]);
        assert_eq!(page.total, 2);
        assert_eq!(page.items[1].my_subscriber, 2);
        assert_eq!(page.items[1].curations, 1);
        assert_eq!(page.items[0].curations, 0);

        let none = f.repo.subscribed_curators(busy, 1, 10).await.unwrap();
        assert!(none.items.is_empty());
        assert_eq!(none.total, 0);
    }
}
