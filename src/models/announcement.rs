//! Course announcement model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::constants::{MAX_ANNOUNCEMENT_MARKDOWN_LENGTH, MAX_ANNOUNCEMENT_TITLE_LENGTH};

/// Announcement database model
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Announcement {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub markdown: String,
    /// Username of the poster
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post announcement payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAnnouncement {
    #[validate(length(min = 1, max = MAX_ANNOUNCEMENT_TITLE_LENGTH))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = MAX_ANNOUNCEMENT_MARKDOWN_LENGTH))]
    pub markdown: String,
}

/// Edit announcement payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AnnouncementUpdate {
    #[validate(length(min = 1, max = MAX_ANNOUNCEMENT_TITLE_LENGTH))]
    pub title: Option<String>,

    #[validate(length(max = MAX_ANNOUNCEMENT_MARKDOWN_LENGTH))]
    pub markdown: Option<String>,
}
