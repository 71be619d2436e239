//! PostgreSQL store tests
//!
//! Need a Docker daemon; run with `cargo test -- --ignored`.

use sqlx::PgPool;
use tokio::sync::OnceCell;
use uuid::Uuid;

use homework_registry::{
    config::HomeworkConfig,
    db::{
        repositories::{CourseRepository, HomeworkRepository, ProblemRepository},
        run_migrations, HomeworkStore, PgStore,
    },
    models::{CourseRole, HomeworkChanges, HomeworkUpdate, NewHomework, ProblemId},
    services::{HomeworkService, ReconcileService, StudentStatusService},
    AppError, AppState,
};

mod containers {
    use std::sync::OnceLock;
    use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
    use testcontainers_modules::postgres::Postgres;

    static POSTGRES: OnceLock<ContainerAsync<Postgres>> = OnceLock::new();

    /// Get or start a PostgreSQL container (lazy initialization)
    pub async fn get_postgres() -> &'static ContainerAsync<Postgres> {
        if POSTGRES.get().is_none() {
            let container = Postgres::default()
                .with_user("registry")
                .with_password("registry_test")
                .with_db_name("registry_test")
                .start()
                .await
                .expect("Failed to start PostgreSQL container");

            let _ = POSTGRES.set(container);
        }
        POSTGRES.get().unwrap()
    }

    pub async fn postgres_url() -> String {
        let container = get_postgres().await;
        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(5432).await.unwrap();
        format!("postgres://registry:registry_test@{}:{}/registry_test", host, port)
    }
}

static MIGRATED: OnceCell<()> = OnceCell::const_new();

async fn pool() -> PgPool {
    let pool = PgPool::connect(&containers::postgres_url().await)
        .await
        .expect("Failed to connect to test database");
    MIGRATED
        .get_or_init(|| async {
            run_migrations(&pool).await.expect("Failed to run migrations");
        })
        .await;
    pool
}

fn problem_id() -> ProblemId {
    (Uuid::new_v4().as_u128() as i64) & i64::MAX
}

/// A fresh course with a teacher, the given students and problems
async fn seed(pool: &PgPool, students: &[&str], problems: usize) -> (String, Vec<ProblemId>) {
    let course_name = format!("course-{}", Uuid::new_v4());
    let course = CourseRepository::create(pool, &course_name).await.unwrap();
    CourseRepository::add_member(pool, course.id, "teacher", "Teacher", CourseRole::Teacher)
        .await
        .unwrap();
    for student in students {
        CourseRepository::add_member(pool, course.id, student, student, CourseRole::Student)
            .await
            .unwrap();
    }

    let mut ids = Vec::new();
    for _ in 0..problems {
        ids.push(ProblemRepository::create(pool, problem_id()).await.unwrap().id);
    }
    (course_name, ids)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_homework_lifecycle() {
    let pool = pool().await;
    let (course, problems) = seed(&pool, &["s1", "s2"], 3).await;
    let state = AppState::with_postgres(pool.clone(), HomeworkConfig::default());

    let payload = NewHomework {
        name: "hw1".into(),
        problem_ids: problems[..2].to_vec(),
        penalty: "if overtime > 0: score = score - overtime".into(),
        ..Default::default()
    };
    let hw = HomeworkService::create(&state, "teacher", &course, payload)
        .await
        .unwrap();
    assert_eq!(hw.student_status.len(), 4);

    let fetched = HomeworkService::get_by_name(&state, &course, "hw1").await.unwrap();
    assert_eq!(fetched.student_status, hw.student_status);
    assert_eq!(fetched.penalty, hw.penalty);

    let update = HomeworkUpdate {
        problem_ids: Some(vec![problems[1], problems[2]]),
        markdown: Some("Read chapter 3".into()),
        ..Default::default()
    };
    let hw = HomeworkService::update(&state, "teacher", hw.id, update)
        .await
        .unwrap();
    assert_eq!(hw.problem_ids, vec![problems[1], problems[2]]);
    assert_eq!(hw.markdown, "Read chapter 3");
    assert!(hw.student_status.get("s1", problems[0]).is_none());
    assert!(hw.student_status.get("s2", problems[2]).is_some());

    let first = ProblemRepository::find_by_id(&pool, problems[0]).await.unwrap().unwrap();
    assert!(!first.is_referenced_by(hw.id));
    let last = ProblemRepository::find_by_id(&pool, problems[2]).await.unwrap().unwrap();
    assert!(last.is_referenced_by(hw.id));

    let hw = StudentStatusService::add_students(&state, hw.id, &["s3".to_string()])
        .await
        .unwrap();
    assert_eq!(hw.student_status.student_count(), 3);

    let report = ReconcileService::reconcile_homework(&state, hw.id, false)
        .await
        .unwrap();
    assert!(report.is_clean(), "{report:?}");

    HomeworkService::delete_problems(&state, "teacher", &course, hw.id)
        .await
        .unwrap();
    assert!(HomeworkRepository::find_by_id(&pool, hw.id).await.unwrap().is_none());
    let last = ProblemRepository::find_by_id(&pool, problems[2]).await.unwrap().unwrap();
    assert!(last.homework_ids.is_empty());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_duplicate_name_maps_to_not_unique() {
    let pool = pool().await;
    let (course, _) = seed(&pool, &[], 0).await;
    let state = AppState::with_postgres(pool, HomeworkConfig::default());

    let payload = || NewHomework {
        name: "hw1".into(),
        ..Default::default()
    };
    HomeworkService::create(&state, "teacher", &course, payload())
        .await
        .unwrap();
    let err = HomeworkService::create(&state, "teacher", &course, payload())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotUnique(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_status_write_rejects_stale_revision() {
    let pool = pool().await;
    let (course, problems) = seed(&pool, &["s1"], 1).await;
    let state = AppState::with_postgres(pool.clone(), HomeworkConfig::default());

    let payload = NewHomework {
        name: "hw1".into(),
        problem_ids: problems.clone(),
        ..Default::default()
    };
    let hw = HomeworkService::create(&state, "teacher", &course, payload)
        .await
        .unwrap();

    let store = PgStore::new(pool);
    let unchanged = HomeworkChanges::default();
    let revision = store
        .save_status(hw.id, hw.revision, &unchanged, &hw.problem_ids, &hw.student_status)
        .await
        .unwrap();
    assert_eq!(revision, hw.revision + 1);

    let err = store
        .save_status(hw.id, hw.revision, &unchanged, &hw.problem_ids, &hw.student_status)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::StaleRevision { homework_id, expected } if homework_id == hw.id && expected == hw.revision
    ));

    let err = store
        .save_status(Uuid::new_v4(), 0, &unchanged, &[], &hw.student_status)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
