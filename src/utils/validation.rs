//! Input validation utilities

use std::collections::BTreeSet;

use crate::error::{AppError, AppResult};

/// Validate username format
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        return Err("Username must not be empty");
    }
    if username.chars().any(char::is_whitespace) {
        return Err("Username must not contain whitespace");
    }
    Ok(())
}

/// Check a batch of usernames for the status synchronizer.
///
/// Every name must be well formed and appear once.
pub fn validate_student_batch(students: &[String]) -> AppResult<()> {
    if students.is_empty() {
        return Err(AppError::Validation("No students given".to_string()));
    }

    let mut seen = BTreeSet::new();
    for student in students {
        validate_username(student)
            .map_err(|e| AppError::Validation(format!("{}: {:?}", e, student)))?;
        if !seen.insert(student.as_str()) {
            return Err(AppError::Validation(format!(
                "Student {:?} is listed more than once",
                student
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("b08902001").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("a b").is_err());
    }

    #[test]
    fn test_student_batch() {
        assert!(validate_student_batch(&["s1".into(), "s2".into()]).is_ok());
        assert!(matches!(validate_student_batch(&[]), Err(AppError::Validation(_))));
        assert!(matches!(
            validate_student_batch(&["s1".into(), "s1".into()]),
            Err(AppError::Validation(_))
        ));
    }
}
