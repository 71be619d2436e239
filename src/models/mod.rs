//! Domain models
//!
//! This module contains all domain models used throughout the application.

pub mod announcement;
pub mod course;
pub mod homework;
pub mod problem;
pub mod student_status;

pub use announcement::*;
pub use course::*;
pub use homework::*;
pub use problem::*;
pub use student_status::*;
