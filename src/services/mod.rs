//! Business logic services

pub mod announcement_service;
pub mod homework_service;
pub mod reconcile_service;
pub mod student_status_service;

pub use announcement_service::AnnouncementService;
pub use homework_service::HomeworkService;
pub use reconcile_service::{CourseReport, ReconcileReport, ReconcileService, ReconcileSummary};
pub use student_status_service::StudentStatusService;
