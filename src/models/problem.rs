//! Problem model
//!
//! Problems are owned by the problem-management side of the platform. This
//! crate only checks that they exist and maintains their homework
//! back-reference list.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Numeric problem identifier
pub type ProblemId = i64;

/// Problem database model
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    /// Homeworks that include this problem
    pub homework_ids: Vec<Uuid>,
}

impl Problem {
    pub fn new(id: ProblemId) -> Self {
        Self {
            id,
            homework_ids: Vec::new(),
        }
    }

    pub fn is_referenced_by(&self, homework_id: Uuid) -> bool {
        self.homework_ids.contains(&homework_id)
    }
}
