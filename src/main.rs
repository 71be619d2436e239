//! Homework registry maintenance entry point
//!
//! Applies migrations and runs a reconciliation pass over every course
//! and homework, repairing when `RECONCILE_REPAIR` is set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homework_registry::{
    config::Config,
    db,
    services::ReconcileService,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.rust_log.clone().into());
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting homework registry maintenance...");

    // Initialize database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::connect(&config.database).await?;

    // Run database migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&db_pool).await?;

    let repair = config.homework.repair_on_reconcile;
    let state = AppState::with_postgres(db_pool, config.homework);

    let summary = ReconcileService::reconcile_all(&state, repair).await?;
    tracing::info!(
        courses = summary.courses_checked,
        homeworks = summary.homeworks_checked,
        inconsistent = summary.homeworks_inconsistent,
        dangling = summary.dangling_course_entries,
        repaired = summary.repaired,
        "Maintenance pass complete"
    );

    Ok(())
}
