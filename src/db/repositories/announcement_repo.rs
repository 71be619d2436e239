//! Announcement repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppResult, models::Announcement};

/// Repository for announcement database operations
pub struct AnnouncementRepository;

impl AnnouncementRepository {
    /// Insert a new announcement
    pub async fn insert(pool: &PgPool, announcement: &Announcement) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO announcements (id, course_id, title, markdown, author, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(announcement.id)
        .bind(announcement.course_id)
        .bind(&announcement.title)
        .bind(&announcement.markdown)
        .bind(&announcement.author)
        .bind(announcement.created_at)
        .bind(announcement.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Find announcement by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<Announcement>> {
        let announcement =
            sqlx::query_as::<_, Announcement>(r#"SELECT * FROM announcements WHERE id = $1"#)
                .bind(id)
                .fetch_optional(pool)
                .await?;

        Ok(announcement)
    }

    /// Update announcement
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        title: Option<&str>,
        markdown: Option<&str>,
    ) -> AppResult<Announcement> {
        let announcement = sqlx::query_as::<_, Announcement>(
            r#"
            UPDATE announcements
            SET
                title = COALESCE($2, title),
                markdown = COALESCE($3, markdown),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(markdown)
        .fetch_one(pool)
        .await?;

        Ok(announcement)
    }

    /// Delete announcement
    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        sqlx::query(r#"DELETE FROM announcements WHERE id = $1"#)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// List announcements of a course, newest first
    pub async fn list_by_course(pool: &PgPool, course_id: Uuid) -> AppResult<Vec<Announcement>> {
        let announcements = sqlx::query_as::<_, Announcement>(
            r#"SELECT * FROM announcements WHERE course_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;

        Ok(announcements)
    }
}
