//! Application state management
//!
//! This module contains the shared state handed to every service call:
//! the stores and the homework configuration.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::HomeworkConfig,
    db::{AnnouncementStore, CourseStore, HomeworkStore, MemoryStore, PgStore, ProblemStore},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    homeworks: Arc<dyn HomeworkStore>,
    courses: Arc<dyn CourseStore>,
    problems: Arc<dyn ProblemStore>,
    announcements: Arc<dyn AnnouncementStore>,

    /// Homework registry configuration
    config: HomeworkConfig,
}

impl AppState {
    /// Create a new application state from individual stores
    pub fn new(
        homeworks: Arc<dyn HomeworkStore>,
        courses: Arc<dyn CourseStore>,
        problems: Arc<dyn ProblemStore>,
        announcements: Arc<dyn AnnouncementStore>,
        config: HomeworkConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                homeworks,
                courses,
                problems,
                announcements,
                config,
            }),
        }
    }

    /// State backed by PostgreSQL
    pub fn with_postgres(pool: PgPool, config: HomeworkConfig) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self::new(store.clone(), store.clone(), store.clone(), store, config)
    }

    /// State backed by an in-memory store
    pub fn with_memory(store: Arc<MemoryStore>, config: HomeworkConfig) -> Self {
        Self::new(store.clone(), store.clone(), store.clone(), store, config)
    }

    pub fn homeworks(&self) -> &dyn HomeworkStore {
        self.inner.homeworks.as_ref()
    }

    pub fn courses(&self) -> &dyn CourseStore {
        self.inner.courses.as_ref()
    }

    pub fn problems(&self) -> &dyn ProblemStore {
        self.inner.problems.as_ref()
    }

    pub fn announcements(&self) -> &dyn AnnouncementStore {
        self.inner.announcements.as_ref()
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &HomeworkConfig {
        &self.inner.config
    }
}
