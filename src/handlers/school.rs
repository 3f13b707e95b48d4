// src/handlers/school.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        school::{Classroom, CreateClassroomRequest, CreateSubjectRequest, Subject},
        user::ROLE_TEACHER,
    },
};

pub async fn list_classrooms(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let classrooms = sqlx::query_as::<_, Classroom>(
        "SELECT id, name, section, teacher_id FROM classrooms ORDER BY name",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(classrooms))
}

async fn ensure_teacher(pool: &SqlitePool, teacher_id: i64) -> Result<(), AppError> {
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?;

    match role.as_deref() {
        Some(ROLE_TEACHER) => Ok(()),
        Some(_) => Err(AppError::BadRequest(format!(
            "User {} is not a teacher",
            teacher_id
        ))),
        None => Err(AppError::NotFound(format!("User {} not found", teacher_id))),
    }
}

/// Creates a classroom. An assigned teacher must hold the teacher role.
/// Admin only.
pub async fn create_classroom(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateClassroomRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(teacher_id) = payload.teacher_id {
        ensure_teacher(&pool, teacher_id).await?;
    }

    let classroom = sqlx::query_as::<_, Classroom>(
        r#"
        INSERT INTO classrooms (name, section, teacher_id)
        VALUES (?, ?, ?)
        RETURNING id, name, section, teacher_id
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.section)
    .bind(payload.teacher_id)
    .fetch_one(&pool)
    .await
    .map_err(|e| AppError::from_write(e, format!("Classroom '{}' already exists", payload.name)))?;

    Ok((StatusCode::CREATED, Json(classroom)))
}

pub async fn list_subjects(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let mut subjects = sqlx::query_as::<_, Subject>(
        "SELECT id, name, code, description, teacher_id FROM subjects ORDER BY code",
    )
    .fetch_all(&pool)
    .await?;

    let links: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT subject_id, classroom_id FROM subject_classrooms ORDER BY subject_id, classroom_id",
    )
    .fetch_all(&pool)
    .await?;

    for subject in subjects.iter_mut() {
        subject.classroom_ids = links
            .iter()
            .filter(|(subject_id, _)| *subject_id == subject.id)
            .map(|(_, classroom_id)| *classroom_id)
            .collect();
    }

    Ok(Json(subjects))
}

/// Creates a subject with its optional subject teacher and the classrooms
/// that study it. Admin only.
pub async fn create_subject(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if let Some(teacher_id) = payload.teacher_id {
        ensure_teacher(&pool, teacher_id).await?;
    }

    let mut classroom_ids = payload.classroom_ids.clone();
    classroom_ids.sort_unstable();
    classroom_ids.dedup();

    let mut tx = pool.begin().await?;

    let mut subject = sqlx::query_as::<_, Subject>(
        r#"
        INSERT INTO subjects (name, code, description, teacher_id)
        VALUES (?, ?, ?, ?)
        RETURNING id, name, code, description, teacher_id
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.code)
    .bind(&payload.description)
    .bind(payload.teacher_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            format!("Subject '{}' or code '{}' already exists", payload.name, payload.code),
        )
    })?;

    for classroom_id in &classroom_ids {
        sqlx::query("INSERT INTO subject_classrooms (subject_id, classroom_id) VALUES (?, ?)")
            .bind(subject.id)
            .bind(classroom_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::from_write(e, format!("Classroom {} already linked", classroom_id))
            })?;
    }

    tx.commit().await?;

    subject.classroom_ids = classroom_ids;
    Ok((StatusCode::CREATED, Json(subject)))
}
