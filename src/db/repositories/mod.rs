//! Database repositories
//!
//! Repositories handle all direct database interactions.

pub mod announcement_repo;
pub mod course_repo;
pub mod homework_repo;
pub mod problem_repo;

pub use announcement_repo::AnnouncementRepository;
pub use course_repo::CourseRepository;
pub use homework_repo::HomeworkRepository;
pub use problem_repo::ProblemRepository;
