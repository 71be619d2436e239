//! Homework model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::problem::ProblemId;
use super::student_status::StudentStatusTable;
use crate::constants::{
    scoreboard_status, MAX_HOMEWORK_MARKDOWN_LENGTH, MAX_HOMEWORK_NAME_LENGTH, MAX_PENALTY_LENGTH,
};
use crate::utils::ip_filter::IpFilter;

/// Homework record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Homework {
    pub id: Uuid,
    pub course_id: Uuid,
    pub name: String,
    /// Ordered, no duplicates
    pub problem_ids: Vec<ProblemId>,
    pub window: TimeWindow,
    pub scoreboard_status: ScoreboardStatus,
    pub markdown: String,
    /// Late-penalty formula source, empty for none
    pub penalty: String,
    /// Allowed submission origins, empty for unrestricted
    pub ip_filters: Vec<String>,
    pub student_status: StudentStatusTable,
    /// Bumped on every write of `problem_ids` or `student_status`
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Homework {
    pub fn has_problem(&self, problem_id: ProblemId) -> bool {
        self.problem_ids.contains(&problem_id)
    }
}

/// Submission window, either bound optional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// `start <= end` when both are set
    pub fn is_ordered(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    /// Check if `at` falls inside the window
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if at < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if at > end {
                return false;
            }
        }
        true
    }
}

/// Scoreboard visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum ScoreboardStatus {
    #[default]
    Visible,
    Hidden,
}

impl From<ScoreboardStatus> for i16 {
    fn from(status: ScoreboardStatus) -> Self {
        match status {
            ScoreboardStatus::Visible => scoreboard_status::VISIBLE,
            ScoreboardStatus::Hidden => scoreboard_status::HIDDEN,
        }
    }
}

impl TryFrom<i16> for ScoreboardStatus {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            scoreboard_status::VISIBLE => Ok(Self::Visible),
            scoreboard_status::HIDDEN => Ok(Self::Hidden),
            other => Err(format!("unknown scoreboard status {}", other)),
        }
    }
}

/// Create homework payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_new_homework_window"))]
pub struct NewHomework {
    #[validate(length(min = 1, max = MAX_HOMEWORK_NAME_LENGTH))]
    pub name: String,

    #[serde(default)]
    #[validate(custom(function = "validate_problem_ids"))]
    pub problem_ids: Vec<ProblemId>,

    #[serde(default)]
    #[validate(length(max = MAX_HOMEWORK_MARKDOWN_LENGTH))]
    pub markdown: String,

    #[serde(default)]
    pub scoreboard_status: ScoreboardStatus,

    #[serde(default)]
    pub window: TimeWindow,

    #[serde(default)]
    #[validate(length(max = MAX_PENALTY_LENGTH))]
    pub penalty: String,

    #[serde(default)]
    #[validate(custom(function = "validate_ip_filters"))]
    pub ip_filters: Vec<String>,
}

/// Update homework payload. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_update_window"))]
pub struct HomeworkUpdate {
    #[validate(length(min = 1, max = MAX_HOMEWORK_NAME_LENGTH))]
    pub name: Option<String>,

    #[validate(length(max = MAX_HOMEWORK_MARKDOWN_LENGTH))]
    pub markdown: Option<String>,

    /// New problem list, in the order it should be stored
    #[validate(custom(function = "validate_problem_ids"))]
    pub problem_ids: Option<Vec<ProblemId>>,

    #[validate(length(max = MAX_PENALTY_LENGTH))]
    pub penalty: Option<String>,

    /// Replaces both bounds
    pub window: Option<TimeWindow>,

    pub scoreboard_status: Option<ScoreboardStatus>,

    #[validate(custom(function = "validate_ip_filters"))]
    pub ip_filters: Option<Vec<String>>,
}

impl HomeworkUpdate {
    /// Field set written in a single record update, everything but `problem_ids`
    pub fn changes(&self) -> HomeworkChanges {
        HomeworkChanges {
            name: self.name.clone(),
            markdown: self.markdown.clone(),
            penalty: self.penalty.clone(),
            window: self.window,
            scoreboard_status: self.scoreboard_status,
            ip_filters: self.ip_filters.clone(),
        }
    }
}

/// Scalar homework fields to overwrite
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomeworkChanges {
    pub name: Option<String>,
    pub markdown: Option<String>,
    pub penalty: Option<String>,
    pub window: Option<TimeWindow>,
    pub scoreboard_status: Option<ScoreboardStatus>,
    pub ip_filters: Option<Vec<String>>,
}

impl HomeworkChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the set fields of an in-memory record
    pub fn apply_to(&self, homework: &mut Homework) {
        if let Some(name) = &self.name {
            homework.name = name.clone();
        }
        if let Some(markdown) = &self.markdown {
            homework.markdown = markdown.clone();
        }
        if let Some(penalty) = &self.penalty {
            homework.penalty = penalty.clone();
        }
        if let Some(window) = self.window {
            homework.window = window;
        }
        if let Some(status) = self.scoreboard_status {
            homework.scoreboard_status = status;
        }
        if let Some(filters) = &self.ip_filters {
            homework.ip_filters = filters.clone();
        }
    }
}

/// Difference between a stored and a requested problem list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemDiff {
    /// In the new list only, in new-list order
    pub added: Vec<ProblemId>,
    /// In the old list only, in old-list order
    pub removed: Vec<ProblemId>,
}

impl ProblemDiff {
    pub fn between(old: &[ProblemId], new: &[ProblemId]) -> Self {
        let old_set: BTreeSet<_> = old.iter().collect();
        let new_set: BTreeSet<_> = new.iter().collect();

        Self {
            added: new.iter().filter(|p| !old_set.contains(p)).copied().collect(),
            removed: old.iter().filter(|p| !new_set.contains(p)).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

// Validators

fn validation_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

#[allow(clippy::ptr_arg)]
fn validate_problem_ids(problem_ids: &Vec<ProblemId>) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for pid in problem_ids {
        if !seen.insert(pid) {
            return Err(validation_error(
                "duplicate_problem",
                format!("Problem {} is listed more than once", pid),
            ));
        }
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn validate_ip_filters(filters: &Vec<String>) -> Result<(), ValidationError> {
    for filter in filters {
        if let Err(e) = IpFilter::parse(filter) {
            return Err(validation_error("invalid_ip_filter", e.to_string()));
        }
    }
    Ok(())
}

fn validate_window(window: &TimeWindow) -> Result<(), ValidationError> {
    if window.is_ordered() {
        Ok(())
    } else {
        Err(validation_error(
            "invalid_window",
            "Homework start must not be after its end".to_string(),
        ))
    }
}

fn validate_new_homework_window(payload: &NewHomework) -> Result<(), ValidationError> {
    validate_window(&payload.window)
}

fn validate_update_window(payload: &HomeworkUpdate) -> Result<(), ValidationError> {
    payload.window.as_ref().map_or(Ok(()), validate_window)
}
