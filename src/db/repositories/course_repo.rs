//! Course repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Course, CourseRole, RosterEntry},
};

/// Repository for course database operations
pub struct CourseRepository;

impl CourseRepository {
    /// Create a new course
    pub async fn create(pool: &PgPool, name: &str) -> AppResult<Course> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, course_name)
            VALUES ($1, $2)
            RETURNING id, course_name, homework_ids, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(course)
    }

    /// Add or update a member
    pub async fn add_member(
        pool: &PgPool,
        course_id: Uuid,
        username: &str,
        nickname: &str,
        role: CourseRole,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO course_members (course_id, username, nickname, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (course_id, username)
            DO UPDATE SET nickname = EXCLUDED.nickname, role = EXCLUDED.role
            "#,
        )
        .bind(course_id)
        .bind(username)
        .bind(nickname)
        .bind(role.level())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Find course by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"SELECT id, course_name, homework_ids, created_at FROM courses WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(course)
    }

    /// Find course by name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> AppResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"SELECT id, course_name, homework_ids, created_at FROM courses WHERE course_name = $1"#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(course)
    }

    /// List every course ID
    pub async fn list_ids(pool: &PgPool) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(r#"SELECT id FROM courses ORDER BY created_at"#)
            .fetch_all(pool)
            .await?;

        Ok(ids)
    }

    /// Enrolled students in join order
    pub async fn roster(pool: &PgPool, course_id: Uuid) -> AppResult<Vec<RosterEntry>> {
        let roster = sqlx::query_as::<_, RosterEntry>(
            r#"
            SELECT username, nickname FROM course_members
            WHERE course_id = $1 AND role = $2
            ORDER BY joined_at, username
            "#,
        )
        .bind(course_id)
        .bind(CourseRole::Student.level())
        .fetch_all(pool)
        .await?;

        Ok(roster)
    }

    /// Role of a user in a course
    pub async fn role_of(pool: &PgPool, course_id: Uuid, username: &str) -> AppResult<CourseRole> {
        let level = sqlx::query_scalar::<_, i16>(
            r#"SELECT role FROM course_members WHERE course_id = $1 AND username = $2"#,
        )
        .bind(course_id)
        .bind(username)
        .fetch_optional(pool)
        .await?;

        match level {
            None => Ok(CourseRole::Outsider),
            Some(level) => CourseRole::from_level(level)
                .ok_or_else(|| AppError::Database(format!("Unknown course role {}", level))),
        }
    }

    /// Append a homework to the course list
    pub async fn push_homework(pool: &PgPool, course_id: Uuid, homework_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE courses
            SET homework_ids = array_append(homework_ids, $2)
            WHERE id = $1 AND NOT ($2 = ANY(homework_ids))
            "#,
        )
        .bind(course_id)
        .bind(homework_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Remove a homework from the course list
    pub async fn pull_homework(pool: &PgPool, course_id: Uuid, homework_id: Uuid) -> AppResult<()> {
        sqlx::query(r#"UPDATE courses SET homework_ids = array_remove(homework_ids, $2) WHERE id = $1"#)
            .bind(course_id)
            .bind(homework_id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
