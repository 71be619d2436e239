//! Application-wide constants
//!
//! This module contains all constant values used throughout the application.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

// =============================================================================
// LOGGING DEFAULTS
// =============================================================================

/// Default tracing filter when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

// =============================================================================
// HOMEWORK DEFAULTS
// =============================================================================

/// How many times a status-table write is re-read and retried after
/// losing a revision race
pub const DEFAULT_STATUS_WRITE_ATTEMPTS: u32 = 5;

/// Maximum homework name length
pub const MAX_HOMEWORK_NAME_LENGTH: u64 = 128;

/// Maximum homework description length
pub const MAX_HOMEWORK_MARKDOWN_LENGTH: u64 = 65535;

/// Maximum penalty formula length
pub const MAX_PENALTY_LENGTH: u64 = 1024;

/// Maximum announcement title length
pub const MAX_ANNOUNCEMENT_TITLE_LENGTH: u64 = 256;

/// Maximum announcement body length
pub const MAX_ANNOUNCEMENT_MARKDOWN_LENGTH: u64 = 65535;

// =============================================================================
// PENALTY FORMULA VOCABULARY
// =============================================================================

/// The word and character set accepted in penalty formulas.
///
/// Formula editors rely on this exact set.
pub mod penalty {
    /// Characters that separate words
    pub const PUNCTUATION: &[char] = &['+', '-', '*', '/', '=', '.', '(', ')', ':', '>', '<'];

    /// The only non-numeric words allowed
    pub const KEYWORDS: &[&str] = &["score", "overtime", "if", "else"];

    /// Deepest parenthesis or indentation nesting a formula may use
    pub const MAX_NESTING: usize = 100;
}

// =============================================================================
// SCOREBOARD
// =============================================================================

/// Stored scoreboard visibility values
pub mod scoreboard_status {
    pub const VISIBLE: i16 = 0;
    pub const HIDDEN: i16 = 1;
}

// =============================================================================
// COURSE ROLES
// =============================================================================

/// Stored course role levels (ordinal)
pub mod course_roles {
    pub const OUTSIDER: i16 = 0;
    pub const STUDENT: i16 = 1;
    pub const TA: i16 = 2;
    pub const TEACHER: i16 = 3;
}
