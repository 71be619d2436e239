//! Problem repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Problem, ProblemId},
};

/// Repository for problem database operations
pub struct ProblemRepository;

impl ProblemRepository {
    /// Register a problem ID
    pub async fn create(pool: &PgPool, id: ProblemId) -> AppResult<Problem> {
        let problem = sqlx::query_as::<_, Problem>(
            r#"INSERT INTO problems (id) VALUES ($1) RETURNING id, homework_ids"#,
        )
        .bind(id)
        .fetch_one(pool)
        .await?;

        Ok(problem)
    }

    /// Find problem by ID
    pub async fn find_by_id(pool: &PgPool, id: ProblemId) -> AppResult<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>(
            r#"SELECT id, homework_ids FROM problems WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(problem)
    }

    /// Add a homework back-reference
    pub async fn push_homework(pool: &PgPool, id: ProblemId, homework_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE problems
            SET homework_ids = array_append(homework_ids, $2)
            WHERE id = $1 AND NOT ($2 = ANY(homework_ids))
            "#,
        )
        .bind(id)
        .bind(homework_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Remove a homework back-reference
    pub async fn pull_homework(pool: &PgPool, id: ProblemId, homework_id: Uuid) -> AppResult<()> {
        sqlx::query(r#"UPDATE problems SET homework_ids = array_remove(homework_ids, $2) WHERE id = $1"#)
            .bind(id)
            .bind(homework_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Problems referencing a homework
    pub async fn find_referencing(pool: &PgPool, homework_id: Uuid) -> AppResult<Vec<ProblemId>> {
        let ids = sqlx::query_scalar::<_, i64>(
            r#"SELECT id FROM problems WHERE $1 = ANY(homework_ids) ORDER BY id"#,
        )
        .bind(homework_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }
}
