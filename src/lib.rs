//! Homework registry
//!
//! The homework side of a course judge: homework records and their links
//! to problems and courses, a per-student, per-problem status table kept
//! in step with each homework's problem list, and a small late-penalty
//! formula language that is checked when stored and evaluated at grading
//! time.
//!
//! # Architecture
//!
//! The crate follows a layered architecture:
//! - **Services**: Business logic (registry, status synchronizer,
//!   reconciliation, announcements)
//! - **Stores**: Persistence traits with PostgreSQL and in-memory backends
//! - **Models**: Domain models and payloads
//! - **Penalty**: Formula lexer, parser and interpreter

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod penalty;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
