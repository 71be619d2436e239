//! Per-student, per-problem homework status
//!
//! The table is keyed by (username, problem id). For every tracked student
//! the set of problem keys must equal the homework's `problem_ids`; rows
//! are only created and dropped through the status synchronizer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::problem::ProblemId;

/// Judge result recorded for a student's latest attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemStatus {
    Pending,
    Accepted,
    WrongAnswer,
    CompileError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    JudgeError,
    OutputLimitExceeded,
}

impl ProblemStatus {
    /// Get short code for status
    pub fn code(&self) -> &'static str {
        match self {
            ProblemStatus::Pending => "PD",
            ProblemStatus::Accepted => "AC",
            ProblemStatus::WrongAnswer => "WA",
            ProblemStatus::CompileError => "CE",
            ProblemStatus::TimeLimitExceeded => "TLE",
            ProblemStatus::MemoryLimitExceeded => "MLE",
            ProblemStatus::RuntimeError => "RE",
            ProblemStatus::JudgeError => "JE",
            ProblemStatus::OutputLimitExceeded => "OLE",
        }
    }
}

/// One (student, problem) row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProblemStatus {
    pub score: f64,
    pub problem_status: Option<ProblemStatus>,
    pub submission_ids: Vec<String>,
}

/// Keys present in the table that disagree with a problem list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMismatch {
    /// Expected but absent
    pub missing: Vec<(String, ProblemId)>,
    /// Present but not in the problem list
    pub stale: Vec<(String, ProblemId)>,
}

impl TableMismatch {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

impl std::fmt::Display for TableMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} missing and {} stale status rows",
            self.missing.len(),
            self.stale.len()
        )
    }
}

/// Student status table: username -> problem id -> row
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentStatusTable(BTreeMap<String, BTreeMap<ProblemId, StudentProblemStatus>>);

impl StudentStatusTable {
    /// Default rows for every (student, problem) pair
    pub fn for_students<'a>(
        students: impl IntoIterator<Item = &'a str>,
        problem_ids: &[ProblemId],
    ) -> Self {
        let mut table = Self::default();
        for student in students {
            table.track_student(student, problem_ids);
        }
        table
    }

    pub fn get(&self, student: &str, problem_id: ProblemId) -> Option<&StudentProblemStatus> {
        self.0.get(student)?.get(&problem_id)
    }

    /// Rows for one student
    pub fn student(&self, student: &str) -> Option<&BTreeMap<ProblemId, StudentProblemStatus>> {
        self.0.get(student)
    }

    pub fn is_tracked(&self, student: &str) -> bool {
        self.0.contains_key(student)
    }

    pub fn students(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn student_count(&self) -> usize {
        self.0.len()
    }

    /// Number of (student, problem) rows
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = (&str, ProblemId)> {
        self.0
            .iter()
            .flat_map(|(student, rows)| rows.keys().map(move |pid| (student.as_str(), *pid)))
    }

    /// Compare the table against a homework's problem list
    pub fn verify(&self, problem_ids: &[ProblemId]) -> Result<(), TableMismatch> {
        let expected: BTreeSet<ProblemId> = problem_ids.iter().copied().collect();
        let mut mismatch = TableMismatch::default();

        for (student, rows) in &self.0 {
            for pid in &expected {
                if !rows.contains_key(pid) {
                    mismatch.missing.push((student.clone(), *pid));
                }
            }
            for pid in rows.keys() {
                if !expected.contains(pid) {
                    mismatch.stale.push((student.clone(), *pid));
                }
            }
        }

        if mismatch.is_empty() {
            Ok(())
        } else {
            Err(mismatch)
        }
    }

    pub(crate) fn track_student(&mut self, student: &str, problem_ids: &[ProblemId]) {
        let rows = problem_ids
            .iter()
            .map(|pid| (*pid, StudentProblemStatus::default()))
            .collect();
        self.0.insert(student.to_string(), rows);
    }

    pub(crate) fn untrack_student(&mut self, student: &str) -> bool {
        self.0.remove(student).is_some()
    }

    /// Give every tracked student a default row for `problem_id`, keeping existing rows
    pub(crate) fn add_problem(&mut self, problem_id: ProblemId) {
        for rows in self.0.values_mut() {
            rows.entry(problem_id).or_default();
        }
    }

    pub(crate) fn remove_problem(&mut self, problem_id: ProblemId) {
        for rows in self.0.values_mut() {
            rows.remove(&problem_id);
        }
    }

    /// Add missing default rows and drop stale ones so the table matches `problem_ids`
    pub(crate) fn repair(&mut self, problem_ids: &[ProblemId]) {
        let expected: BTreeSet<ProblemId> = problem_ids.iter().copied().collect();
        for rows in self.0.values_mut() {
            rows.retain(|pid, _| expected.contains(pid));
            for pid in &expected {
                rows.entry(*pid).or_default();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn row_mut(&mut self, student: &str, problem_id: ProblemId) -> Option<&mut StudentProblemStatus> {
        self.0.get_mut(student)?.get_mut(&problem_id)
    }
}
