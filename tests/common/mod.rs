// tests/common/mod.rs
#![allow(dead_code)]

use school_backend::{config::Config, routes, state::AppState, utils::jwt::sign_jwt};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::time::Duration;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Fresh in-memory database with migrations applied.
///
/// A single connection that never expires, so the database lives as long as the pool.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        admin_username: None,
        admin_password: None,
    }
}

/// Spawns the app on a random port. Returns the base URL and a handle on its database.
pub async fn spawn_app() -> (String, SqlitePool) {
    let pool = test_pool().await;
    let state = AppState {
        pool: pool.clone(),
        config: test_config(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

pub fn token_for(user_id: i64, role: &str) -> String {
    sign_jwt(user_id, role, JWT_SECRET, 600).expect("Failed to sign test token")
}

// Seeding helpers. They write rows directly and never trigger a recompute.

pub async fn user(pool: &SqlitePool, username: &str, role: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (username, password, role) VALUES (?, 'x', ?) RETURNING id")
        .bind(username)
        .bind(role)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn academic_year(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO academic_years (name, is_active) VALUES (?, 1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn exam(pool: &SqlitePool, year_id: i64, name: &str, weightage: f64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO exams (academic_year_id, name, weightage) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(year_id)
    .bind(name)
    .bind(weightage)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn classroom(pool: &SqlitePool, name: &str, teacher_id: Option<i64>) -> i64 {
    sqlx::query_scalar("INSERT INTO classrooms (name, teacher_id) VALUES (?, ?) RETURNING id")
        .bind(name)
        .bind(teacher_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn subject(pool: &SqlitePool, code: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO subjects (name, code) VALUES (?, ?) RETURNING id")
        .bind(format!("Subject {}", code))
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn enrollment(
    pool: &SqlitePool,
    student_id: i64,
    year_id: i64,
    classroom_id: i64,
    admission_no: &str,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO enrollments (student_id, academic_year_id, classroom_id, admission_no, is_active)
        VALUES (?, ?, ?, ?, 1)
        RETURNING id
        "#,
    )
    .bind(student_id)
    .bind(year_id)
    .bind(classroom_id)
    .bind(admission_no)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn grade_scale(
    pool: &SqlitePool,
    year_id: i64,
    min: f64,
    max: f64,
    letter: &str,
    gpa: f64,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO grade_scales (academic_year_id, min_percentage, max_percentage, letter, gpa_points)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(year_id)
    .bind(min)
    .bind(max)
    .bind(letter)
    .bind(gpa)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn mark(
    pool: &SqlitePool,
    enrollment_id: i64,
    subject_id: i64,
    exam_id: i64,
    obtained: f64,
    max: f64,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO marks (enrollment_id, subject_id, exam_id, max_marks, marks_obtained)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(enrollment_id)
    .bind(subject_id)
    .bind(exam_id)
    .bind(max)
    .bind(obtained)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// A year with one exam (weight 100) and one classroom.
pub struct Fixture {
    pub year_id: i64,
    pub exam_id: i64,
    pub classroom_id: i64,
}

pub async fn basic_fixture(pool: &SqlitePool) -> Fixture {
    let year_id = academic_year(pool, "2025-2026").await;
    let exam_id = exam(pool, year_id, "Midterm", 100.0).await;
    let classroom_id = classroom(pool, "10A", None).await;
    Fixture {
        year_id,
        exam_id,
        classroom_id,
    }
}

/// Enrolls a new student and gives them one mark of `percentage`/100 in `exam_id`.
pub async fn student_scoring(
    pool: &SqlitePool,
    name: &str,
    year_id: i64,
    classroom_id: i64,
    exam_id: i64,
    subject_id: i64,
    percentage: f64,
) -> i64 {
    let student_id = user(pool, name, "student").await;
    let enrollment_id = enrollment(pool, student_id, year_id, classroom_id, name).await;
    mark(pool, enrollment_id, subject_id, exam_id, percentage, 100.0).await;
    enrollment_id
}
