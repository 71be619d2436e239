//! In-memory store
//!
//! Implements every store trait over a single `RwLock`. Each trait method
//! takes the lock once, so methods are atomic per call just like their
//! PostgreSQL counterparts. Used by tests and local tooling.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{AnnouncementStore, CourseStore, HomeworkStore, ProblemStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        Announcement, Course, CourseRole, Homework, HomeworkChanges, Problem, ProblemId,
        RosterEntry, StudentStatusTable,
    },
};

#[derive(Debug, Clone)]
struct Member {
    username: String,
    nickname: String,
    role: CourseRole,
}

#[derive(Debug, Default)]
struct MemoryData {
    courses: HashMap<Uuid, Course>,
    members: HashMap<Uuid, Vec<Member>>,
    problems: BTreeMap<ProblemId, Problem>,
    homeworks: HashMap<Uuid, Homework>,
    announcements: HashMap<Uuid, Announcement>,
}

impl MemoryData {
    fn name_taken(&self, course_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
        self.homeworks
            .values()
            .any(|h| h.course_id == course_id && h.name == name && Some(h.id) != except)
    }
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a course with no members
    pub async fn add_course(&self, name: &str) -> Course {
        let course = Course {
            id: Uuid::new_v4(),
            name: name.to_string(),
            homework_ids: Vec::new(),
            created_at: Utc::now(),
        };
        self.data.write().await.courses.insert(course.id, course.clone());
        course
    }

    /// Add or replace a course membership
    pub async fn enroll(&self, course_id: Uuid, username: &str, nickname: &str, role: CourseRole) {
        let mut data = self.data.write().await;
        let members = data.members.entry(course_id).or_default();
        members.retain(|m| m.username != username);
        members.push(Member {
            username: username.to_string(),
            nickname: nickname.to_string(),
            role,
        });
    }

    pub async fn add_problem(&self, id: ProblemId) -> Problem {
        let problem = Problem::new(id);
        self.data.write().await.problems.insert(id, problem.clone());
        problem
    }

    pub async fn remove_problem(&self, id: ProblemId) {
        self.data.write().await.problems.remove(&id);
    }
}

#[async_trait]
impl HomeworkStore for MemoryStore {
    async fn insert(&self, homework: &Homework) -> AppResult<()> {
        let mut data = self.data.write().await;
        if data.homeworks.contains_key(&homework.id)
            || data.name_taken(homework.course_id, &homework.name, None)
        {
            return Err(AppError::NotUnique(format!(
                "Homework {:?} already exists in course",
                homework.name
            )));
        }
        data.homeworks.insert(homework.id, homework.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Homework>> {
        Ok(self.data.read().await.homeworks.get(&id).cloned())
    }

    async fn find_by_name(&self, course_id: Uuid, name: &str) -> AppResult<Option<Homework>> {
        Ok(self
            .data
            .read()
            .await
            .homeworks
            .values()
            .find(|h| h.course_id == course_id && h.name == name)
            .cloned())
    }

    async fn list_by_course(&self, course_id: Uuid) -> AppResult<Vec<Homework>> {
        let mut homeworks: Vec<Homework> = self
            .data
            .read()
            .await
            .homeworks
            .values()
            .filter(|h| h.course_id == course_id)
            .cloned()
            .collect();
        homeworks.sort_by(|a, b| (a.window.start, &a.name).cmp(&(b.window.start, &b.name)));
        Ok(homeworks)
    }

    async fn list_ids(&self) -> AppResult<Vec<Uuid>> {
        Ok(self.data.read().await.homeworks.keys().copied().collect())
    }

    async fn update_fields(&self, id: Uuid, changes: &HomeworkChanges) -> AppResult<()> {
        let mut data = self.data.write().await;
        let course_id = data
            .homeworks
            .get(&id)
            .map(|h| h.course_id)
            .ok_or_else(|| AppError::NotFound("Homework not found".to_string()))?;

        if let Some(name) = &changes.name {
            if data.name_taken(course_id, name, Some(id)) {
                return Err(AppError::NotUnique(format!(
                    "Homework {:?} already exists in course",
                    name
                )));
            }
        }

        let Some(homework) = data.homeworks.get_mut(&id) else {
            return Err(AppError::NotFound("Homework not found".to_string()));
        };
        changes.apply_to(homework);
        homework.updated_at = Utc::now();
        Ok(())
    }

    async fn save_status(
        &self,
        id: Uuid,
        expected_revision: i64,
        changes: &HomeworkChanges,
        problem_ids: &[ProblemId],
        status: &StudentStatusTable,
    ) -> AppResult<i64> {
        let mut data = self.data.write().await;
        let (course_id, revision) = data
            .homeworks
            .get(&id)
            .map(|h| (h.course_id, h.revision))
            .ok_or_else(|| AppError::NotFound("Homework not found".to_string()))?;

        if revision != expected_revision {
            return Err(AppError::StaleRevision {
                homework_id: id,
                expected: expected_revision,
            });
        }
        if let Some(name) = &changes.name {
            if data.name_taken(course_id, name, Some(id)) {
                return Err(AppError::NotUnique(format!(
                    "Homework {:?} already exists in course",
                    name
                )));
            }
        }

        let Some(homework) = data.homeworks.get_mut(&id) else {
            return Err(AppError::NotFound("Homework not found".to_string()));
        };
        changes.apply_to(homework);
        homework.problem_ids = problem_ids.to_vec();
        homework.student_status = status.clone();
        homework.revision += 1;
        homework.updated_at = Utc::now();
        Ok(homework.revision)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.data.write().await.homeworks.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Course>> {
        Ok(self.data.read().await.courses.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Course>> {
        Ok(self
            .data
            .read()
            .await
            .courses
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn list_ids(&self) -> AppResult<Vec<Uuid>> {
        Ok(self.data.read().await.courses.keys().copied().collect())
    }

    async fn roster(&self, course_id: Uuid) -> AppResult<Vec<RosterEntry>> {
        Ok(self
            .data
            .read()
            .await
            .members
            .get(&course_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|m| m.role == CourseRole::Student)
                    .map(|m| RosterEntry {
                        username: m.username.clone(),
                        nickname: m.nickname.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn role_of(&self, course_id: Uuid, username: &str) -> AppResult<CourseRole> {
        Ok(self
            .data
            .read()
            .await
            .members
            .get(&course_id)
            .and_then(|members| members.iter().find(|m| m.username == username))
            .map(|m| m.role)
            .unwrap_or(CourseRole::Outsider))
    }

    async fn push_homework(&self, course_id: Uuid, homework_id: Uuid) -> AppResult<()> {
        if let Some(course) = self.data.write().await.courses.get_mut(&course_id) {
            if !course.homework_ids.contains(&homework_id) {
                course.homework_ids.push(homework_id);
            }
        }
        Ok(())
    }

    async fn pull_homework(&self, course_id: Uuid, homework_id: Uuid) -> AppResult<()> {
        if let Some(course) = self.data.write().await.courses.get_mut(&course_id) {
            course.homework_ids.retain(|id| *id != homework_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn find_by_id(&self, id: ProblemId) -> AppResult<Option<Problem>> {
        Ok(self.data.read().await.problems.get(&id).cloned())
    }

    async fn push_homework(&self, problem_id: ProblemId, homework_id: Uuid) -> AppResult<()> {
        if let Some(problem) = self.data.write().await.problems.get_mut(&problem_id) {
            if !problem.homework_ids.contains(&homework_id) {
                problem.homework_ids.push(homework_id);
            }
        }
        Ok(())
    }

    async fn pull_homework(&self, problem_id: ProblemId, homework_id: Uuid) -> AppResult<()> {
        if let Some(problem) = self.data.write().await.problems.get_mut(&problem_id) {
            problem.homework_ids.retain(|id| *id != homework_id);
        }
        Ok(())
    }

    async fn find_referencing(&self, homework_id: Uuid) -> AppResult<Vec<ProblemId>> {
        Ok(self
            .data
            .read()
            .await
            .problems
            .values()
            .filter(|p| p.is_referenced_by(homework_id))
            .map(|p| p.id)
            .collect())
    }
}

#[async_trait]
impl AnnouncementStore for MemoryStore {
    async fn insert(&self, announcement: &Announcement) -> AppResult<()> {
        self.data
            .write()
            .await
            .announcements
            .insert(announcement.id, announcement.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Announcement>> {
        Ok(self.data.read().await.announcements.get(&id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        title: Option<String>,
        markdown: Option<String>,
    ) -> AppResult<Announcement> {
        let mut data = self.data.write().await;
        let announcement = data
            .announcements
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Announcement not found".to_string()))?;
        if let Some(title) = title {
            announcement.title = title;
        }
        if let Some(markdown) = markdown {
            announcement.markdown = markdown;
        }
        announcement.updated_at = Utc::now();
        Ok(announcement.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.data.write().await.announcements.remove(&id);
        Ok(())
    }

    async fn list_by_course(&self, course_id: Uuid) -> AppResult<Vec<Announcement>> {
        let mut announcements: Vec<Announcement> = self
            .data
            .read()
            .await
            .announcements
            .values()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect();
        announcements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(announcements)
    }
}
