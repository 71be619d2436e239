//! Course model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::constants::course_roles;

/// Course database model
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    #[sqlx(rename = "course_name")]
    pub name: String,
    /// Homeworks registered on this course
    pub homework_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One enrolled student, in roster order
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RosterEntry {
    pub username: String,
    pub nickname: String,
}

/// A user's standing in a course, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseRole {
    Outsider,
    Student,
    Ta,
    Teacher,
}

impl CourseRole {
    /// Stored ordinal
    pub fn level(&self) -> i16 {
        match self {
            Self::Outsider => course_roles::OUTSIDER,
            Self::Student => course_roles::STUDENT,
            Self::Ta => course_roles::TA,
            Self::Teacher => course_roles::TEACHER,
        }
    }

    pub fn from_level(level: i16) -> Option<Self> {
        match level {
            course_roles::OUTSIDER => Some(Self::Outsider),
            course_roles::STUDENT => Some(Self::Student),
            course_roles::TA => Some(Self::Ta),
            course_roles::TEACHER => Some(Self::Teacher),
            _ => None,
        }
    }

    /// TA or teacher
    pub fn is_staff(&self) -> bool {
        *self >= Self::Ta
    }
}

impl std::fmt::Display for CourseRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outsider => write!(f, "outsider"),
            Self::Student => write!(f, "student"),
            Self::Ta => write!(f, "ta"),
            Self::Teacher => write!(f, "teacher"),
        }
    }
}
