//! Reconciliation pass
//!
//! Finds and optionally repairs what an interrupted multi-record write
//! leaves behind: status tables out of step with `problem_ids`, missing
//! or stale problem back-references, and course homework lists that
//! disagree with the homework records.

use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use super::StudentStatusService;
use crate::{
    error::{AppError, AppResult},
    models::{Homework, ProblemId, TableMismatch},
    state::AppState,
};

/// Findings for one homework
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub homework_id: Uuid,
    /// Status rows expected but absent
    pub missing_status_rows: usize,
    /// Status rows for problems not in `problem_ids`
    pub stale_status_rows: usize,
    /// Listed problems whose back-reference list lacks this homework
    pub missing_back_references: Vec<ProblemId>,
    /// Problems pointing at this homework without being listed
    pub stale_back_references: Vec<ProblemId>,
    /// Listed problems that no longer exist
    pub missing_problems: Vec<ProblemId>,
    /// The course exists but does not list this homework
    pub course_link_missing: bool,
    /// The course record is gone
    pub course_missing: bool,
    pub repaired: bool,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.missing_status_rows == 0
            && self.stale_status_rows == 0
            && self.missing_back_references.is_empty()
            && self.stale_back_references.is_empty()
            && self.missing_problems.is_empty()
            && !self.course_link_missing
            && !self.course_missing
    }
}

/// Findings for one course
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourseReport {
    pub course_id: Uuid,
    pub homeworks: Vec<ReconcileReport>,
    /// Course list entries with no matching homework record
    pub dangling_homework_ids: Vec<Uuid>,
    pub repaired: bool,
}

impl CourseReport {
    pub fn is_clean(&self) -> bool {
        self.dangling_homework_ids.is_empty() && self.homeworks.iter().all(ReconcileReport::is_clean)
    }
}

/// Totals for a full pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub courses_checked: usize,
    pub homeworks_checked: usize,
    pub homeworks_inconsistent: usize,
    pub dangling_course_entries: usize,
    pub repaired: bool,
}

/// Reconciliation service
pub struct ReconcileService;

impl ReconcileService {
    /// Report inconsistencies around one homework without changing anything
    pub async fn inspect(state: &AppState, homework: &Homework) -> AppResult<ReconcileReport> {
        let mut report = ReconcileReport {
            homework_id: homework.id,
            ..Default::default()
        };

        if let Err(TableMismatch { missing, stale }) =
            homework.student_status.verify(&homework.problem_ids)
        {
            report.missing_status_rows = missing.len();
            report.stale_status_rows = stale.len();
        }

        for pid in &homework.problem_ids {
            match state.problems().find_by_id(*pid).await? {
                None => report.missing_problems.push(*pid),
                Some(problem) if !problem.is_referenced_by(homework.id) => {
                    report.missing_back_references.push(*pid)
                }
                Some(_) => {}
            }
        }

        let listed: BTreeSet<ProblemId> = homework.problem_ids.iter().copied().collect();
        report.stale_back_references = state
            .problems()
            .find_referencing(homework.id)
            .await?
            .into_iter()
            .filter(|pid| !listed.contains(pid))
            .collect();

        match state.courses().find_by_id(homework.course_id).await? {
            Some(course) => report.course_link_missing = !course.homework_ids.contains(&homework.id),
            None => report.course_missing = true,
        }

        Ok(report)
    }

    /// Inspect one homework and, with `repair`, fix what can be fixed
    pub async fn reconcile_homework(
        state: &AppState,
        homework_id: Uuid,
        repair: bool,
    ) -> AppResult<ReconcileReport> {
        let homework = state
            .homeworks()
            .find_by_id(homework_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Homework not found".to_string()))?;

        let mut report = Self::inspect(state, &homework).await?;
        if report.is_clean() {
            return Ok(report);
        }

        tracing::warn!(homework_id = %homework_id, ?report, "Homework references are inconsistent");

        if !repair {
            return Ok(report);
        }

        if report.missing_status_rows > 0 || report.stale_status_rows > 0 {
            StudentStatusService::repair(state, homework_id).await?;
        }
        for pid in &report.missing_back_references {
            state.problems().push_homework(*pid, homework_id).await?;
        }
        for pid in &report.stale_back_references {
            state.problems().pull_homework(*pid, homework_id).await?;
        }
        if report.course_link_missing {
            state
                .courses()
                .push_homework(homework.course_id, homework_id)
                .await?;
        }
        if !report.missing_problems.is_empty() || report.course_missing {
            tracing::warn!(
                homework_id = %homework_id,
                missing_problems = ?report.missing_problems,
                course_missing = report.course_missing,
                "Dangling homework references left for manual review"
            );
        }

        report.repaired = true;
        tracing::info!(homework_id = %homework_id, "Homework references repaired");

        Ok(report)
    }

    /// Reconcile every homework of a course and the course homework list
    pub async fn reconcile_course(
        state: &AppState,
        course_id: Uuid,
        repair: bool,
    ) -> AppResult<CourseReport> {
        let course = state
            .courses()
            .find_by_id(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let mut report = CourseReport {
            course_id,
            ..Default::default()
        };

        for homework in state.homeworks().list_by_course(course_id).await? {
            report
                .homeworks
                .push(Self::reconcile_homework(state, homework.id, repair).await?);
        }

        for homework_id in &course.homework_ids {
            let belongs = state
                .homeworks()
                .find_by_id(*homework_id)
                .await?
                .is_some_and(|h| h.course_id == course_id);
            if !belongs {
                report.dangling_homework_ids.push(*homework_id);
            }
        }

        if repair && !report.dangling_homework_ids.is_empty() {
            for homework_id in &report.dangling_homework_ids {
                state.courses().pull_homework(course_id, *homework_id).await?;
            }
            tracing::info!(
                course = %course.name,
                dropped = report.dangling_homework_ids.len(),
                "Dangling course homework entries removed"
            );
        }
        report.repaired = repair && !report.is_clean();

        Ok(report)
    }

    /// Reconcile every course, then any homework whose course is gone
    pub async fn reconcile_all(state: &AppState, repair: bool) -> AppResult<ReconcileSummary> {
        let mut summary = ReconcileSummary {
            repaired: repair,
            ..Default::default()
        };
        let mut seen = BTreeSet::new();

        for course_id in state.courses().list_ids().await? {
            let report = Self::reconcile_course(state, course_id, repair).await?;
            summary.courses_checked += 1;
            summary.dangling_course_entries += report.dangling_homework_ids.len();
            for homework in &report.homeworks {
                seen.insert(homework.homework_id);
                summary.homeworks_checked += 1;
                if !homework.is_clean() {
                    summary.homeworks_inconsistent += 1;
                }
            }
        }

        for homework_id in state.homeworks().list_ids().await? {
            if seen.contains(&homework_id) {
                continue;
            }
            let report = Self::reconcile_homework(state, homework_id, repair).await?;
            summary.homeworks_checked += 1;
            if !report.is_clean() {
                summary.homeworks_inconsistent += 1;
            }
        }

        tracing::info!(
            courses = summary.courses_checked,
            homeworks = summary.homeworks_checked,
            inconsistent = summary.homeworks_inconsistent,
            dangling = summary.dangling_course_entries,
            repair,
            "Reconciliation finished"
        );

        Ok(summary)
    }
}
