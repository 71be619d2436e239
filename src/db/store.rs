//! Store interfaces
//!
//! Services only talk to persistence through these traits. Each method is
//! a single-record atomic operation; nothing here spans records, so
//! multi-record sequences are ordered by the services.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Announcement, Course, CourseRole, Homework, HomeworkChanges, Problem, ProblemId,
        RosterEntry, StudentStatusTable,
    },
};

/// Homework records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HomeworkStore: Send + Sync {
    /// Insert a new record. A duplicate (course, name) fails with `NotUnique`.
    async fn insert(&self, homework: &Homework) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Homework>>;

    async fn find_by_name(&self, course_id: Uuid, name: &str) -> AppResult<Option<Homework>>;

    /// All homeworks of a course, ordered by window start (unset first), then name
    async fn list_by_course(&self, course_id: Uuid) -> AppResult<Vec<Homework>>;

    async fn list_ids(&self) -> AppResult<Vec<Uuid>>;

    /// Overwrite the given scalar fields
    async fn update_fields(&self, id: Uuid, changes: &HomeworkChanges) -> AppResult<()>;

    /// Compare-and-set `problem_ids`, the status table and any scalar
    /// `changes` in one write.
    ///
    /// Succeeds only while the stored revision equals `expected_revision`
    /// and returns the new revision. Otherwise fails with `StaleRevision`,
    /// `NotUnique` on a name clash, or `NotFound` if the record is gone.
    async fn save_status(
        &self,
        id: Uuid,
        expected_revision: i64,
        changes: &HomeworkChanges,
        problem_ids: &[ProblemId],
        status: &StudentStatusTable,
    ) -> AppResult<i64>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Courses and their membership
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Course>>;

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Course>>;

    async fn list_ids(&self) -> AppResult<Vec<Uuid>>;

    /// Enrolled students in roster order
    async fn roster(&self, course_id: Uuid) -> AppResult<Vec<RosterEntry>>;

    /// `Outsider` for users with no membership
    async fn role_of(&self, course_id: Uuid, username: &str) -> AppResult<CourseRole>;

    /// Append to the course homework list if not already present
    async fn push_homework(&self, course_id: Uuid, homework_id: Uuid) -> AppResult<()>;

    async fn pull_homework(&self, course_id: Uuid, homework_id: Uuid) -> AppResult<()>;
}

/// Problems, as far as homework linkage goes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn find_by_id(&self, id: ProblemId) -> AppResult<Option<Problem>>;

    /// Append to the problem's back-references if not already present
    async fn push_homework(&self, problem_id: ProblemId, homework_id: Uuid) -> AppResult<()>;

    async fn pull_homework(&self, problem_id: ProblemId, homework_id: Uuid) -> AppResult<()>;

    /// Problems holding a back-reference to `homework_id`
    async fn find_referencing(&self, homework_id: Uuid) -> AppResult<Vec<ProblemId>>;
}

/// Course announcements
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnouncementStore: Send + Sync {
    async fn insert(&self, announcement: &Announcement) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Announcement>>;

    /// Overwrite title and/or body, returning the updated record
    async fn update(
        &self,
        id: Uuid,
        title: Option<String>,
        markdown: Option<String>,
    ) -> AppResult<Announcement>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Newest first
    async fn list_by_course(&self, course_id: Uuid) -> AppResult<Vec<Announcement>>;
}
