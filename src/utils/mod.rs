//! Utility functions

pub mod ip_filter;
pub mod validation;

pub use ip_filter::{is_eligible, IpFilter, IpFilterError};
pub use validation::{validate_student_batch, validate_username};
