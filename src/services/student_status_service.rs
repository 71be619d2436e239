//! Student status synchronizer
//!
//! Keeps each homework's status table keyed by exactly
//! (tracked students x `problem_ids`). Every write is a compare-and-set on
//! the homework revision: read, check, mutate in memory, save. A lost race
//! re-runs the whole step, so preconditions are always checked against
//! the record that actually gets replaced.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Homework, HomeworkChanges, ProblemDiff, ProblemId},
    state::AppState,
    utils::validate_student_batch,
};

/// Student status service for business logic
pub struct StudentStatusService;

impl StudentStatusService {
    /// Start tracking students, giving each a default row per problem.
    ///
    /// Fails with `AlreadyTracked` listing every given student that is
    /// already tracked; nothing is written in that case.
    pub async fn add_students(
        state: &AppState,
        homework_id: Uuid,
        students: &[String],
    ) -> AppResult<Homework> {
        validate_student_batch(students)?;

        let unchanged = HomeworkChanges::default();
        let (homework, ()) = Self::write_status(state, homework_id, &unchanged, |homework| {
            Self::ensure_consistent(homework)?;

            let tracked: Vec<String> = students
                .iter()
                .filter(|s| homework.student_status.is_tracked(s))
                .cloned()
                .collect();
            if !tracked.is_empty() {
                return Err(AppError::AlreadyTracked(tracked));
            }

            for student in students {
                homework
                    .student_status
                    .track_student(student, &homework.problem_ids);
            }
            Ok(())
        })
        .await?;

        tracing::info!(
            homework_id = %homework_id,
            count = students.len(),
            revision = homework.revision,
            "Students added to homework"
        );

        Ok(homework)
    }

    /// Stop tracking students, dropping all their rows.
    ///
    /// Fails with `NotTracked` listing every given student that is not
    /// tracked; nothing is written in that case.
    pub async fn remove_students(
        state: &AppState,
        homework_id: Uuid,
        students: &[String],
    ) -> AppResult<Homework> {
        validate_student_batch(students)?;

        let unchanged = HomeworkChanges::default();
        let (homework, ()) = Self::write_status(state, homework_id, &unchanged, |homework| {
            Self::ensure_consistent(homework)?;

            let untracked: Vec<String> = students
                .iter()
                .filter(|s| !homework.student_status.is_tracked(s))
                .cloned()
                .collect();
            if !untracked.is_empty() {
                return Err(AppError::NotTracked(untracked));
            }

            for student in students {
                homework.student_status.untrack_student(student);
            }
            Ok(())
        })
        .await?;

        tracing::info!(
            homework_id = %homework_id,
            count = students.len(),
            revision = homework.revision,
            "Students removed from homework"
        );

        Ok(homework)
    }

    /// Check the stored table against the stored problem list
    pub async fn verify(state: &AppState, homework_id: Uuid) -> AppResult<()> {
        let homework = state
            .homeworks()
            .find_by_id(homework_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Homework not found".to_string()))?;

        Self::ensure_consistent(&homework)
    }

    /// Replace the problem list and bring the table along.
    ///
    /// Added problems get default rows for every tracked student, removed
    /// ones lose their rows, untouched rows are kept. `changes` land in the
    /// same write. Returns the diff against the list that was actually
    /// replaced.
    pub(crate) async fn sync_problems(
        state: &AppState,
        homework_id: Uuid,
        changes: &HomeworkChanges,
        problem_ids: &[ProblemId],
    ) -> AppResult<(Homework, ProblemDiff)> {
        let (homework, diff) = Self::write_status(state, homework_id, changes, |homework| {
            Self::ensure_consistent(homework)?;

            let diff = ProblemDiff::between(&homework.problem_ids, problem_ids);
            for pid in &diff.removed {
                homework.student_status.remove_problem(*pid);
            }
            for pid in &diff.added {
                homework.student_status.add_problem(*pid);
            }
            homework.problem_ids = problem_ids.to_vec();
            Ok(diff)
        })
        .await?;

        tracing::info!(
            homework_id = %homework_id,
            added = ?diff.added,
            removed = ?diff.removed,
            revision = homework.revision,
            "Homework problem set synchronized"
        );

        Ok((homework, diff))
    }

    /// Rebuild missing rows and drop stale ones. Returns whether anything changed.
    pub(crate) async fn repair(state: &AppState, homework_id: Uuid) -> AppResult<bool> {
        let homework = state
            .homeworks()
            .find_by_id(homework_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Homework not found".to_string()))?;
        if Self::ensure_consistent(&homework).is_ok() {
            return Ok(false);
        }

        Self::write_status(state, homework_id, &HomeworkChanges::default(), |homework| {
            homework.student_status.repair(&homework.problem_ids);
            Ok(())
        })
        .await?;

        Ok(true)
    }

    pub(crate) fn ensure_consistent(homework: &Homework) -> AppResult<()> {
        homework
            .student_status
            .verify(&homework.problem_ids)
            .map_err(|mismatch| {
                AppError::InconsistentState(format!("homework {}: {}", homework.id, mismatch))
            })
    }

    /// Read-mutate-save loop on the homework revision
    async fn write_status<T, F>(
        state: &AppState,
        homework_id: Uuid,
        changes: &HomeworkChanges,
        mut mutate: F,
    ) -> AppResult<(Homework, T)>
    where
        F: FnMut(&mut Homework) -> AppResult<T>,
    {
        let attempts = state.config().status_write_attempts.max(1);

        for attempt in 1..=attempts {
            let mut homework = state
                .homeworks()
                .find_by_id(homework_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Homework not found".to_string()))?;

            let outcome = mutate(&mut homework)?;
            changes.apply_to(&mut homework);

            match state
                .homeworks()
                .save_status(
                    homework.id,
                    homework.revision,
                    changes,
                    &homework.problem_ids,
                    &homework.student_status,
                )
                .await
            {
                Ok(revision) => {
                    homework.revision = revision;
                    return Ok((homework, outcome));
                }
                Err(AppError::StaleRevision { expected, .. }) => {
                    tracing::warn!(
                        homework_id = %homework_id,
                        attempt,
                        expected_revision = expected,
                        "Status table changed concurrently, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(format!(
            "homework {} status table kept changing after {} attempts",
            homework_id, attempts
        )))
    }
}
