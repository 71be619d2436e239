//! Homework repository

use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Homework, HomeworkChanges, ProblemId, ScoreboardStatus, StudentStatusTable, TimeWindow,
    },
};

/// Row shape of the `homeworks` table
#[derive(Debug, FromRow)]
struct HomeworkRow {
    id: Uuid,
    course_id: Uuid,
    homework_name: String,
    problem_ids: Vec<i64>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    scoreboard_status: i16,
    markdown: String,
    penalty: String,
    ip_filters: Vec<String>,
    student_status: Json<StudentStatusTable>,
    revision: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<HomeworkRow> for Homework {
    type Error = AppError;

    fn try_from(row: HomeworkRow) -> Result<Self, Self::Error> {
        Ok(Homework {
            id: row.id,
            course_id: row.course_id,
            name: row.homework_name,
            problem_ids: row.problem_ids,
            window: TimeWindow::new(row.start_time, row.end_time),
            scoreboard_status: ScoreboardStatus::try_from(row.scoreboard_status)
                .map_err(AppError::Database)?,
            markdown: row.markdown,
            penalty: row.penalty,
            ip_filters: row.ip_filters,
            student_status: row.student_status.0,
            revision: row.revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for homework database operations
pub struct HomeworkRepository;

impl HomeworkRepository {
    /// Insert a new homework
    pub async fn insert(pool: &PgPool, homework: &Homework) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO homeworks (
                id, course_id, homework_name, problem_ids, start_time, end_time,
                scoreboard_status, markdown, penalty, ip_filters, student_status,
                revision, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(homework.id)
        .bind(homework.course_id)
        .bind(&homework.name)
        .bind(&homework.problem_ids)
        .bind(homework.window.start)
        .bind(homework.window.end)
        .bind(i16::from(homework.scoreboard_status))
        .bind(&homework.markdown)
        .bind(&homework.penalty)
        .bind(&homework.ip_filters)
        .bind(Json(&homework.student_status))
        .bind(homework.revision)
        .bind(homework.created_at)
        .bind(homework.updated_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Find homework by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<Homework>> {
        let row = sqlx::query_as::<_, HomeworkRow>(r#"SELECT * FROM homeworks WHERE id = $1"#)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        row.map(Homework::try_from).transpose()
    }

    /// Find homework by course and name
    pub async fn find_by_name(
        pool: &PgPool,
        course_id: Uuid,
        name: &str,
    ) -> AppResult<Option<Homework>> {
        let row = sqlx::query_as::<_, HomeworkRow>(
            r#"SELECT * FROM homeworks WHERE course_id = $1 AND homework_name = $2"#,
        )
        .bind(course_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        row.map(Homework::try_from).transpose()
    }

    /// List homeworks of a course by window start
    pub async fn list_by_course(pool: &PgPool, course_id: Uuid) -> AppResult<Vec<Homework>> {
        let rows = sqlx::query_as::<_, HomeworkRow>(
            r#"
            SELECT * FROM homeworks
            WHERE course_id = $1
            ORDER BY start_time ASC NULLS FIRST, homework_name ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Homework::try_from).collect()
    }

    /// List every homework ID
    pub async fn list_ids(pool: &PgPool) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(r#"SELECT id FROM homeworks ORDER BY created_at"#)
            .fetch_all(pool)
            .await?;

        Ok(ids)
    }

    /// Overwrite scalar fields
    pub async fn update_fields(pool: &PgPool, id: Uuid, changes: &HomeworkChanges) -> AppResult<()> {
        let window = changes.window.unwrap_or_default();

        let result = sqlx::query(
            r#"
            UPDATE homeworks
            SET
                homework_name = COALESCE($2, homework_name),
                markdown = COALESCE($3, markdown),
                penalty = COALESCE($4, penalty),
                start_time = CASE WHEN $5 THEN $6::timestamptz ELSE start_time END,
                end_time = CASE WHEN $5 THEN $7::timestamptz ELSE end_time END,
                scoreboard_status = COALESCE($8, scoreboard_status),
                ip_filters = COALESCE($9, ip_filters),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.markdown.as_deref())
        .bind(changes.penalty.as_deref())
        .bind(changes.window.is_some())
        .bind(window.start)
        .bind(window.end)
        .bind(changes.scoreboard_status.map(i16::from))
        .bind(changes.ip_filters.as_deref())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Homework not found".to_string()));
        }

        Ok(())
    }

    /// Compare-and-set problem list, status table and scalar fields on `revision`
    pub async fn save_status(
        pool: &PgPool,
        id: Uuid,
        expected_revision: i64,
        changes: &HomeworkChanges,
        problem_ids: &[ProblemId],
        status: &StudentStatusTable,
    ) -> AppResult<i64> {
        let window = changes.window.unwrap_or_default();

        let revision = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE homeworks
            SET
                problem_ids = $3,
                student_status = $4,
                homework_name = COALESCE($5, homework_name),
                markdown = COALESCE($6, markdown),
                penalty = COALESCE($7, penalty),
                start_time = CASE WHEN $8 THEN $9::timestamptz ELSE start_time END,
                end_time = CASE WHEN $8 THEN $10::timestamptz ELSE end_time END,
                scoreboard_status = COALESCE($11, scoreboard_status),
                ip_filters = COALESCE($12, ip_filters),
                revision = revision + 1,
                updated_at = NOW()
            WHERE id = $1 AND revision = $2
            RETURNING revision
            "#,
        )
        .bind(id)
        .bind(expected_revision)
        .bind(problem_ids)
        .bind(Json(status))
        .bind(changes.name.as_deref())
        .bind(changes.markdown.as_deref())
        .bind(changes.penalty.as_deref())
        .bind(changes.window.is_some())
        .bind(window.start)
        .bind(window.end)
        .bind(changes.scoreboard_status.map(i16::from))
        .bind(changes.ip_filters.as_deref())
        .fetch_optional(pool)
        .await?;

        if let Some(revision) = revision {
            return Ok(revision);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM homeworks WHERE id = $1)"#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        if exists {
            Err(AppError::StaleRevision {
                homework_id: id,
                expected: expected_revision,
            })
        } else {
            Err(AppError::NotFound("Homework not found".to_string()))
        }
    }

    /// Delete homework
    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        sqlx::query(r#"DELETE FROM homeworks WHERE id = $1"#)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
