//! PostgreSQL-backed store

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    repositories::{
        AnnouncementRepository, CourseRepository, HomeworkRepository, ProblemRepository,
    },
    store::{AnnouncementStore, CourseStore, HomeworkStore, ProblemStore},
};
use crate::{
    error::AppResult,
    models::{
        Announcement, Course, CourseRole, Homework, HomeworkChanges, Problem, ProblemId,
        RosterEntry, StudentStatusTable,
    },
};

/// Store traits over a connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HomeworkStore for PgStore {
    async fn insert(&self, homework: &Homework) -> AppResult<()> {
        HomeworkRepository::insert(&self.pool, homework).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Homework>> {
        HomeworkRepository::find_by_id(&self.pool, id).await
    }

    async fn find_by_name(&self, course_id: Uuid, name: &str) -> AppResult<Option<Homework>> {
        HomeworkRepository::find_by_name(&self.pool, course_id, name).await
    }

    async fn list_by_course(&self, course_id: Uuid) -> AppResult<Vec<Homework>> {
        HomeworkRepository::list_by_course(&self.pool, course_id).await
    }

    async fn list_ids(&self) -> AppResult<Vec<Uuid>> {
        HomeworkRepository::list_ids(&self.pool).await
    }

    async fn update_fields(&self, id: Uuid, changes: &HomeworkChanges) -> AppResult<()> {
        HomeworkRepository::update_fields(&self.pool, id, changes).await
    }

    async fn save_status(
        &self,
        id: Uuid,
        expected_revision: i64,
        changes: &HomeworkChanges,
        problem_ids: &[ProblemId],
        status: &StudentStatusTable,
    ) -> AppResult<i64> {
        HomeworkRepository::save_status(&self.pool, id, expected_revision, changes, problem_ids, status)
            .await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        HomeworkRepository::delete(&self.pool, id).await
    }
}

#[async_trait]
impl CourseStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Course>> {
        CourseRepository::find_by_id(&self.pool, id).await
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Course>> {
        CourseRepository::find_by_name(&self.pool, name).await
    }

    async fn list_ids(&self) -> AppResult<Vec<Uuid>> {
        CourseRepository::list_ids(&self.pool).await
    }

    async fn roster(&self, course_id: Uuid) -> AppResult<Vec<RosterEntry>> {
        CourseRepository::roster(&self.pool, course_id).await
    }

    async fn role_of(&self, course_id: Uuid, username: &str) -> AppResult<CourseRole> {
        CourseRepository::role_of(&self.pool, course_id, username).await
    }

    async fn push_homework(&self, course_id: Uuid, homework_id: Uuid) -> AppResult<()> {
        CourseRepository::push_homework(&self.pool, course_id, homework_id).await
    }

    async fn pull_homework(&self, course_id: Uuid, homework_id: Uuid) -> AppResult<()> {
        CourseRepository::pull_homework(&self.pool, course_id, homework_id).await
    }
}

#[async_trait]
impl ProblemStore for PgStore {
    async fn find_by_id(&self, id: ProblemId) -> AppResult<Option<Problem>> {
        ProblemRepository::find_by_id(&self.pool, id).await
    }

    async fn push_homework(&self, problem_id: ProblemId, homework_id: Uuid) -> AppResult<()> {
        ProblemRepository::push_homework(&self.pool, problem_id, homework_id).await
    }

    async fn pull_homework(&self, problem_id: ProblemId, homework_id: Uuid) -> AppResult<()> {
        ProblemRepository::pull_homework(&self.pool, problem_id, homework_id).await
    }

    async fn find_referencing(&self, homework_id: Uuid) -> AppResult<Vec<ProblemId>> {
        ProblemRepository::find_referencing(&self.pool, homework_id).await
    }
}

#[async_trait]
impl AnnouncementStore for PgStore {
    async fn insert(&self, announcement: &Announcement) -> AppResult<()> {
        AnnouncementRepository::insert(&self.pool, announcement).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Announcement>> {
        AnnouncementRepository::find_by_id(&self.pool, id).await
    }

    async fn update(
        &self,
        id: Uuid,
        title: Option<String>,
        markdown: Option<String>,
    ) -> AppResult<Announcement> {
        AnnouncementRepository::update(&self.pool, id, title.as_deref(), markdown.as_deref()).await
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        AnnouncementRepository::delete(&self.pool, id).await
    }

    async fn list_by_course(&self, course_id: Uuid) -> AppResult<Vec<Announcement>> {
        AnnouncementRepository::list_by_course(&self.pool, course_id).await
    }
}
