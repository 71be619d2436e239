//! Homework service
//!
//! Homework, problem and course records are written one at a time, never
//! in a transaction. Writes are ordered so that a back-reference never
//! points at a homework that does not exist:
//!
//! - create: homework record, then problem back-references, then course list
//! - update: scalar fields together with the problem list and status
//!   table in one revision-checked write, then back-references for added
//!   problems, then removed ones
//! - delete: problem back-references, then course list, then the record
//!
//! A crash part way through leaves a homework missing some references,
//! which [`ReconcileService`](super::ReconcileService) repairs.

use std::collections::BTreeSet;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::StudentStatusService;
use crate::{
    error::{AppError, AppResult},
    models::{
        Course, CourseRole, Homework, HomeworkUpdate, NewHomework, ProblemDiff, ProblemId,
        StudentStatusTable,
    },
    penalty,
    state::AppState,
};

/// Homework service for business logic
pub struct HomeworkService;

impl HomeworkService {
    /// Create a homework in a course.
    ///
    /// Every student on the course roster starts with a default row for
    /// every listed problem.
    pub async fn create(
        state: &AppState,
        actor: &str,
        course_name: &str,
        payload: NewHomework,
    ) -> AppResult<Homework> {
        payload.validate()?;

        let course = Self::course_by_name(state, course_name).await?;
        Self::require_staff(state, &course, actor).await?;

        if state
            .homeworks()
            .find_by_name(course.id, &payload.name)
            .await?
            .is_some()
        {
            return Err(AppError::NotUnique(format!(
                "Homework {:?} already exists in course {}",
                payload.name, course.name
            )));
        }

        penalty::validate(&payload.penalty)?;
        Self::ensure_problems_exist(state, &payload.problem_ids).await?;

        let roster = state.courses().roster(course.id).await?;
        let student_status = StudentStatusTable::for_students(
            roster.iter().map(|entry| entry.username.as_str()),
            &payload.problem_ids,
        );

        let now = Utc::now();
        let homework = Homework {
            id: Uuid::new_v4(),
            course_id: course.id,
            name: payload.name,
            problem_ids: payload.problem_ids,
            window: payload.window,
            scoreboard_status: payload.scoreboard_status,
            markdown: payload.markdown,
            penalty: payload.penalty,
            ip_filters: payload.ip_filters,
            student_status,
            revision: 0,
            created_at: now,
            updated_at: now,
        };

        state.homeworks().insert(&homework).await?;

        for pid in &homework.problem_ids {
            state.problems().push_homework(*pid, homework.id).await?;
        }
        state.courses().push_homework(course.id, homework.id).await?;

        tracing::info!(
            homework_id = %homework.id,
            course = %course.name,
            actor,
            problems = homework.problem_ids.len(),
            students = homework.student_status.student_count(),
            "Homework created"
        );

        Ok(homework)
    }

    /// Update a homework. Fields left `None` are unchanged.
    pub async fn update(
        state: &AppState,
        actor: &str,
        homework_id: Uuid,
        payload: HomeworkUpdate,
    ) -> AppResult<Homework> {
        payload.validate()?;

        let homework = Self::get_by_id(state, homework_id).await?;
        let course = state
            .courses()
            .find_by_id(homework.course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
        Self::require_staff(state, &course, actor).await?;

        let mut changes = payload.changes();

        // Renaming to the current name is a no-op
        if changes.name.as_deref() == Some(homework.name.as_str()) {
            changes.name = None;
        }
        if let Some(name) = &changes.name {
            if state
                .homeworks()
                .find_by_name(course.id, name)
                .await?
                .is_some()
            {
                return Err(AppError::NotUnique(format!(
                    "Homework {:?} already exists in course {}",
                    name, course.name
                )));
            }
        }

        if let Some(formula) = &payload.penalty {
            penalty::validate(formula)?;
        }

        let new_problem_ids = payload
            .problem_ids
            .filter(|ids| *ids != homework.problem_ids);

        match &new_problem_ids {
            Some(ids) => {
                StudentStatusService::ensure_consistent(&homework)?;
                let requested = ProblemDiff::between(&homework.problem_ids, ids);
                Self::ensure_problems_exist(state, &requested.added).await?;

                // scalar fields and the problem list share one write
                let (_, diff) =
                    StudentStatusService::sync_problems(state, homework_id, &changes, ids).await?;

                for pid in &diff.added {
                    state.problems().push_homework(*pid, homework_id).await?;
                }
                for pid in &diff.removed {
                    state.problems().pull_homework(*pid, homework_id).await?;
                }
            }
            None if !changes.is_empty() => {
                state.homeworks().update_fields(homework_id, &changes).await?;
            }
            None => {}
        }

        tracing::info!(homework_id = %homework_id, actor, "Homework updated");

        Self::get_by_id(state, homework_id).await
    }

    /// Delete a homework and retract every reference to it.
    ///
    /// Performs no permission check; callers decide who may delete.
    pub async fn delete(state: &AppState, homework_id: Uuid) -> AppResult<()> {
        let homework = Self::get_by_id(state, homework_id).await?;
        Self::retire(state, &homework).await
    }

    /// Retire a homework of `course` entirely. Teacher or TA only.
    pub async fn delete_problems(
        state: &AppState,
        actor: &str,
        course_name: &str,
        homework_id: Uuid,
    ) -> AppResult<()> {
        let course = Self::course_by_name(state, course_name).await?;
        let homework = Self::get_by_id(state, homework_id).await?;
        if homework.course_id != course.id {
            return Err(AppError::NotFound(format!(
                "Homework not found in course {}",
                course.name
            )));
        }
        Self::require_staff(state, &course, actor).await?;

        Self::retire(state, &homework).await
    }

    /// Get homework by ID
    pub async fn get_by_id(state: &AppState, homework_id: Uuid) -> AppResult<Homework> {
        state
            .homeworks()
            .find_by_id(homework_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Homework not found".to_string()))
    }

    /// Get homework by course name and homework name
    pub async fn get_by_name(state: &AppState, course_name: &str, name: &str) -> AppResult<Homework> {
        let course = Self::course_by_name(state, course_name).await?;
        state
            .homeworks()
            .find_by_name(course.id, name)
            .await?
            .ok_or_else(|| AppError::NotFound("Homework not found".to_string()))
    }

    /// Homeworks of a course by window start, unset start first
    pub async fn list_by_course(state: &AppState, course_name: &str) -> AppResult<Vec<Homework>> {
        let course = Self::course_by_name(state, course_name).await?;
        state.homeworks().list_by_course(course.id).await
    }

    /// Score after the homework's late penalty
    pub fn penalized_score(homework: &Homework, score: f64, overtime: f64) -> AppResult<f64> {
        Ok(penalty::evaluate(&homework.penalty, score, overtime)?)
    }

    async fn retire(state: &AppState, homework: &Homework) -> AppResult<()> {
        let mut referencing: BTreeSet<ProblemId> = homework.problem_ids.iter().copied().collect();
        referencing.extend(state.problems().find_referencing(homework.id).await?);

        for pid in referencing {
            state.problems().pull_homework(pid, homework.id).await?;
        }
        state
            .courses()
            .pull_homework(homework.course_id, homework.id)
            .await?;
        state.homeworks().delete(homework.id).await?;

        tracing::info!(homework_id = %homework.id, name = %homework.name, "Homework deleted");

        Ok(())
    }

    async fn course_by_name(state: &AppState, course_name: &str) -> AppResult<Course> {
        state
            .courses()
            .find_by_name(course_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course {} not found", course_name)))
    }

    pub(crate) async fn require_staff(
        state: &AppState,
        course: &Course,
        actor: &str,
    ) -> AppResult<CourseRole> {
        let role = state.courses().role_of(course.id, actor).await?;
        tracing::debug!(course = %course.name, actor, %role, "Checked course role");

        if role.is_staff() {
            Ok(role)
        } else {
            Err(AppError::PermissionDenied(format!(
                "{} is not a teacher or TA of {}",
                actor, course.name
            )))
        }
    }

    async fn ensure_problems_exist(state: &AppState, problem_ids: &[ProblemId]) -> AppResult<()> {
        let found = futures::future::try_join_all(
            problem_ids.iter().map(|pid| state.problems().find_by_id(*pid)),
        )
        .await?;

        let missing: Vec<String> = problem_ids
            .iter()
            .zip(found)
            .filter(|(_, problem)| problem.is_none())
            .map(|(pid, _)| pid.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "Problems not found: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::{predicate::eq, Sequence};

    use super::*;
    use crate::{
        config::HomeworkConfig,
        db::store::{MockAnnouncementStore, MockCourseStore, MockHomeworkStore, MockProblemStore},
        models::{Problem, RosterEntry},
    };

    fn course() -> Course {
        Course {
            id: Uuid::new_v4(),
            name: "algo".into(),
            homework_ids: vec![],
            created_at: Utc::now(),
        }
    }

    fn state(
        homeworks: MockHomeworkStore,
        courses: MockCourseStore,
        problems: MockProblemStore,
    ) -> AppState {
        AppState::new(
            Arc::new(homeworks),
            Arc::new(courses),
            Arc::new(problems),
            Arc::new(MockAnnouncementStore::new()),
            HomeworkConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_permission_denied_writes_nothing() {
        let course = course();
        let mut courses = MockCourseStore::new();
        let found = course.clone();
        courses
            .expect_find_by_name()
            .returning(move |_| Ok(Some(found.clone())));
        courses
            .expect_role_of()
            .returning(|_, _| Ok(CourseRole::Student));
        courses.expect_push_homework().never();

        let mut homeworks = MockHomeworkStore::new();
        homeworks.expect_insert().never();

        let mut problems = MockProblemStore::new();
        problems.expect_push_homework().never();

        let state = state(homeworks, courses, problems);
        let payload = NewHomework {
            name: "hw1".into(),
            problem_ids: vec![7],
            ..Default::default()
        };

        let err = HomeworkService::create(&state, "student", "algo", payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_create_writes_record_before_back_references() {
        let course = course();
        let course_id = course.id;
        let mut seq = Sequence::new();

        let mut courses = MockCourseStore::new();
        courses
            .expect_find_by_name()
            .returning(move |_| Ok(Some(course.clone())));
        courses
            .expect_role_of()
            .returning(|_, _| Ok(CourseRole::Teacher));
        courses.expect_roster().returning(|_| {
            Ok(vec![RosterEntry {
                username: "s1".into(),
                nickname: "One".into(),
            }])
        });

        let mut homeworks = MockHomeworkStore::new();
        homeworks.expect_find_by_name().returning(|_, _| Ok(None));

        let mut problems = MockProblemStore::new();
        problems
            .expect_find_by_id()
            .returning(|id| Ok(Some(Problem::new(id))));

        homeworks
            .expect_insert()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        problems
            .expect_push_homework()
            .with(eq(7), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        problems
            .expect_push_homework()
            .with(eq(9), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        courses
            .expect_push_homework()
            .with(eq(course_id), mockall::predicate::always())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let state = state(homeworks, courses, problems);
        let payload = NewHomework {
            name: "hw1".into(),
            problem_ids: vec![7, 9],
            ..Default::default()
        };

        let homework = HomeworkService::create(&state, "teacher", "algo", payload)
            .await
            .unwrap();
        assert_eq!(homework.student_status.len(), 2);
    }

    fn homework(course_id: Uuid, problem_ids: Vec<ProblemId>, students: &[&str]) -> Homework {
        Homework {
            id: Uuid::new_v4(),
            course_id,
            name: "hw1".into(),
            student_status: StudentStatusTable::for_students(students.iter().copied(), &problem_ids),
            problem_ids,
            window: Default::default(),
            scoreboard_status: Default::default(),
            markdown: String::new(),
            penalty: String::new(),
            ip_filters: vec![],
            revision: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Stores for an update of `homework` by a teacher
    fn update_mocks(
        course: &Course,
        homework: &Homework,
    ) -> (MockHomeworkStore, MockCourseStore, MockProblemStore) {
        let mut homeworks = MockHomeworkStore::new();
        let stored = homework.clone();
        homeworks
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        homeworks.expect_find_by_name().returning(|_, _| Ok(None));
        homeworks.expect_update_fields().never();

        let mut courses = MockCourseStore::new();
        let found = course.clone();
        courses
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));
        courses
            .expect_role_of()
            .returning(|_, _| Ok(CourseRole::Teacher));

        let mut problems = MockProblemStore::new();
        problems
            .expect_find_by_id()
            .returning(|id| Ok(Some(Problem::new(id))));

        (homeworks, courses, problems)
    }

    #[tokio::test]
    async fn test_update_writes_record_before_back_references() {
        let course = course();
        let homework = homework(course.id, vec![7], &["s1"]);
        let homework_id = homework.id;
        let (mut homeworks, courses, mut problems) = update_mocks(&course, &homework);
        let mut seq = Sequence::new();

        homeworks
            .expect_save_status()
            .withf(|_, rev, changes, ids, table| {
                *rev == 0
                    && changes.name.as_deref() == Some("week 1")
                    && changes.markdown.as_deref() == Some("Read chapter 3")
                    && ids.to_vec() == vec![9]
                    && table.get("s1", 9).is_some()
                    && table.get("s1", 7).is_none()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _, _| Ok(1));
        problems
            .expect_push_homework()
            .with(eq(9), eq(homework_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        problems
            .expect_pull_homework()
            .with(eq(7), eq(homework_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let state = state(homeworks, courses, problems);
        let update = HomeworkUpdate {
            name: Some("week 1".into()),
            markdown: Some("Read chapter 3".into()),
            problem_ids: Some(vec![9]),
            ..Default::default()
        };
        HomeworkService::update(&state, "teacher", homework_id, update)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_conflict_writes_no_fields() {
        let course = course();
        let homework = homework(course.id, vec![7], &["s1"]);
        let homework_id = homework.id;
        let (mut homeworks, courses, mut problems) = update_mocks(&course, &homework);

        homeworks
            .expect_save_status()
            .times(HomeworkConfig::default().status_write_attempts as usize)
            .returning(|id, rev, _, _, _| {
                Err(AppError::StaleRevision {
                    homework_id: id,
                    expected: rev,
                })
            });
        problems.expect_push_homework().never();
        problems.expect_pull_homework().never();

        let state = state(homeworks, courses, problems);
        let update = HomeworkUpdate {
            name: Some("week 1".into()),
            problem_ids: Some(vec![9]),
            ..Default::default()
        };
        let err = HomeworkService::update(&state, "teacher", homework_id, update)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_retracts_references_before_record() {
        let course = course();
        let homework = homework(course.id, vec![7], &[]);
        let homework_id = homework.id;
        let mut seq = Sequence::new();

        let mut homeworks = MockHomeworkStore::new();
        homeworks
            .expect_find_by_id()
            .returning(move |_| Ok(Some(homework.clone())));

        let mut problems = MockProblemStore::new();
        problems
            .expect_find_referencing()
            .returning(|_| Ok(vec![7, 8]));

        let mut courses = MockCourseStore::new();

        problems
            .expect_pull_homework()
            .with(eq(7), eq(homework_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        problems
            .expect_pull_homework()
            .with(eq(8), eq(homework_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        courses
            .expect_pull_homework()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        homeworks
            .expect_delete()
            .with(eq(homework_id))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let state = state(homeworks, courses, problems);
        HomeworkService::delete(&state, homework_id).await.unwrap();
    }
}
