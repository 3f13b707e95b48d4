// src/handlers/enrollments.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        enrollment::{CreateEnrollmentRequest, Enrollment, EnrollmentListParams, EnrollmentView},
        user::ROLE_STUDENT,
    },
    utils::{jwt::Claims, scope::Scope},
};

/// Lists enrollments visible to the caller, optionally filtered by year and classroom.
pub async fn list_enrollments(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<EnrollmentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let scope = Scope::from_claims(&claims)?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT
            e.id, e.student_id, u.username AS student_name,
            e.academic_year_id, e.classroom_id, c.name AS classroom_name,
            e.roll_no, e.admission_no, e.is_active
        FROM enrollments e
        JOIN users u ON u.id = e.student_id
        JOIN classrooms c ON c.id = e.classroom_id
        WHERE 1 = 1
        "#,
    );

    if let Some(year_id) = params.academic_year_id {
        builder.push(" AND e.academic_year_id = ");
        builder.push_bind(year_id);
    }
    if let Some(classroom_id) = params.classroom_id {
        builder.push(" AND e.classroom_id = ");
        builder.push_bind(classroom_id);
    }
    scope.push_predicate(&mut builder);
    builder.push(" ORDER BY c.name, e.roll_no, e.id");

    let enrollments: Vec<EnrollmentView> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list enrollments: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(enrollments))
}

/// Enrolls a student in a classroom for an academic year.
/// Admin only.
pub async fn create_enrollment(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateEnrollmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(payload.student_id)
        .fetch_optional(&pool)
        .await?;

    match role.as_deref() {
        Some(ROLE_STUDENT) => {}
        Some(_) => {
            return Err(AppError::BadRequest(format!(
                "User {} is not a student",
                payload.student_id
            )));
        }
        None => {
            return Err(AppError::NotFound(format!(
                "Student {} not found",
                payload.student_id
            )));
        }
    }

    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments
            (student_id, academic_year_id, classroom_id, roll_no, admission_no, is_active)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, student_id, academic_year_id, classroom_id, roll_no, admission_no, is_active
        "#,
    )
    .bind(payload.student_id)
    .bind(payload.academic_year_id)
    .bind(payload.classroom_id)
    .bind(payload.roll_no)
    .bind(&payload.admission_no)
    .bind(payload.is_active.unwrap_or(true))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            "Student is already enrolled in this classroom for the year, or the admission number is taken",
        )
    })?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Deletes an enrollment with its marks and result summaries.
/// Admin only.
pub async fn delete_enrollment(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM enrollments WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Enrollment {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}
