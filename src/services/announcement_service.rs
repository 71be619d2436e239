//! Announcement service

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Announcement, AnnouncementUpdate, Course, NewAnnouncement},
    state::AppState,
};

/// Announcement service for business logic
pub struct AnnouncementService;

impl AnnouncementService {
    /// Post an announcement to a course
    pub async fn add(
        state: &AppState,
        author: &str,
        course_name: &str,
        payload: NewAnnouncement,
    ) -> AppResult<Announcement> {
        payload.validate()?;
        let course = Self::course_by_name(state, course_name).await?;

        let now = Utc::now();
        let announcement = Announcement {
            id: Uuid::new_v4(),
            course_id: course.id,
            title: payload.title,
            markdown: payload.markdown,
            author: author.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.announcements().insert(&announcement).await?;

        tracing::info!(announcement_id = %announcement.id, course = %course.name, author, "Announcement posted");

        Ok(announcement)
    }

    /// Edit an announcement.
    ///
    /// Any caller may edit, not only the author.
    // TODO: decide with course staff whether edit/delete should be limited to the author
    pub async fn edit(
        state: &AppState,
        actor: &str,
        announcement_id: Uuid,
        payload: AnnouncementUpdate,
    ) -> AppResult<Announcement> {
        payload.validate()?;
        let existing = Self::get_by_id(state, announcement_id).await?;
        if existing.author != actor {
            tracing::debug!(announcement_id = %announcement_id, actor, author = %existing.author, "Announcement edited by non-author");
        }

        let announcement = state
            .announcements()
            .update(announcement_id, payload.title, payload.markdown)
            .await?;

        tracing::info!(announcement_id = %announcement_id, actor, "Announcement edited");

        Ok(announcement)
    }

    /// Delete an announcement. Any caller may delete, not only the author.
    pub async fn delete(state: &AppState, actor: &str, announcement_id: Uuid) -> AppResult<()> {
        let existing = Self::get_by_id(state, announcement_id).await?;
        state.announcements().delete(existing.id).await?;

        tracing::info!(announcement_id = %announcement_id, actor, "Announcement deleted");

        Ok(())
    }

    /// Get announcement by ID
    pub async fn get_by_id(state: &AppState, announcement_id: Uuid) -> AppResult<Announcement> {
        state
            .announcements()
            .find_by_id(announcement_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))
    }

    /// Announcements of a course, newest first
    pub async fn list_by_course(state: &AppState, course_name: &str) -> AppResult<Vec<Announcement>> {
        let course = Self::course_by_name(state, course_name).await?;
        state.announcements().list_by_course(course.id).await
    }

    async fn course_by_name(state: &AppState, course_name: &str) -> AppResult<Course> {
        state
            .courses()
            .find_by_name(course_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_name)))
    }
}
