// src/handlers/marks.rs
//
// Every write here ends with `results::after_mark_write`, which keeps the
// affected result summary in step with its marks.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::mark::{
        CreateMarkRequest, Mark, MarkListParams, MarkView, UpdateMarkRequest, check_score,
        merge_remarks,
    },
    services::results,
    utils::{jwt::Claims, scope::Scope},
};

const MARK_COLUMNS: &str = "id, enrollment_id, subject_id, exam_id, assessment_type_id, \
     max_marks, marks_obtained, remarks, created_by, created_at, updated_at";

async fn fetch_mark(pool: &SqlitePool, id: i64) -> Result<Mark, AppError> {
    sqlx::query_as::<_, Mark>(&format!("SELECT {} FROM marks WHERE id = ?", MARK_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Mark {} not found", id)))
}

/// Lists marks visible to the caller.
pub async fn list_marks(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<MarkListParams>,
) -> Result<impl IntoResponse, AppError> {
    let scope = Scope::from_claims(&claims)?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT
            m.id, m.enrollment_id, u.username AS student_name,
            m.subject_id, s.name AS subject_name,
            m.exam_id, x.name AS exam_name,
            m.assessment_type_id, m.max_marks, m.marks_obtained, m.remarks
        FROM marks m
        JOIN enrollments e ON e.id = m.enrollment_id
        JOIN classrooms c ON c.id = e.classroom_id
        JOIN users u ON u.id = e.student_id
        JOIN subjects s ON s.id = m.subject_id
        JOIN exams x ON x.id = m.exam_id
        WHERE 1 = 1
        "#,
    );

    if let Some(exam_id) = params.exam_id {
        builder.push(" AND m.exam_id = ");
        builder.push_bind(exam_id);
    }
    if let Some(enrollment_id) = params.enrollment_id {
        builder.push(" AND m.enrollment_id = ");
        builder.push_bind(enrollment_id);
    }
    scope.push_subject_predicate(&mut builder);
    builder.push(" ORDER BY m.exam_id, m.enrollment_id, s.code, m.assessment_type_id");

    let marks: Vec<MarkView> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list marks: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(marks))
}

/// Records a mark, then recomputes the (enrollment, exam) result summary.
/// Teachers may only mark enrollments in their own classrooms, or their own
/// subject in the classrooms that study it.
pub async fn create_mark(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateMarkRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    check_score(payload.marks_obtained, payload.max_marks).map_err(AppError::BadRequest)?;

    let scope = Scope::from_claims(&claims)?;
    scope
        .ensure_subject(&pool, payload.enrollment_id, payload.subject_id)
        .await?;

    results::ensure_same_year(&pool, payload.enrollment_id, payload.exam_id).await?;

    let mark = sqlx::query_as::<_, Mark>(&format!(
        r#"
        INSERT INTO marks
            (enrollment_id, subject_id, exam_id, assessment_type_id, max_marks, marks_obtained, remarks, created_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        MARK_COLUMNS
    ))
    .bind(payload.enrollment_id)
    .bind(payload.subject_id)
    .bind(payload.exam_id)
    .bind(payload.assessment_type_id)
    .bind(payload.max_marks)
    .bind(payload.marks_obtained)
    .bind(&payload.remarks)
    .bind(claims.user_id()?)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            "A mark already exists for this subject, exam and assessment type",
        )
    })?;

    let summary = results::after_mark_write(&pool, mark.enrollment_id, mark.exam_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "mark": mark, "result": summary })),
    ))
}

/// Updates scores or remarks of a mark, then recomputes its result summary.
pub async fn update_mark(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateMarkRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = fetch_mark(&pool, id).await?;
    Scope::from_claims(&claims)?
        .ensure_subject(&pool, current.enrollment_id, current.subject_id)
        .await?;

    let max_marks = payload.max_marks.unwrap_or(current.max_marks);
    let marks_obtained = payload.marks_obtained.unwrap_or(current.marks_obtained);
    check_score(marks_obtained, max_marks).map_err(AppError::BadRequest)?;

    let remarks = merge_remarks(payload.remarks, current.remarks);

    let mark = sqlx::query_as::<_, Mark>(&format!(
        r#"
        UPDATE marks
        SET max_marks = ?, marks_obtained = ?, remarks = ?, updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        RETURNING {}
        "#,
        MARK_COLUMNS
    ))
    .bind(max_marks)
    .bind(marks_obtained)
    .bind(remarks)
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| AppError::from_write(e, "Mark update conflicts with an existing mark"))?
    .ok_or_else(|| AppError::NotFound(format!("Mark {} not found", id)))?;

    let summary = results::after_mark_write(&pool, mark.enrollment_id, mark.exam_id).await?;

    Ok(Json(json!({ "mark": mark, "result": summary })))
}

/// Deletes a mark. Removing the last mark of a pair removes its summary.
pub async fn delete_mark(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mark = fetch_mark(&pool, id).await?;
    Scope::from_claims(&claims)?
        .ensure_subject(&pool, mark.enrollment_id, mark.subject_id)
        .await?;

    sqlx::query("DELETE FROM marks WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete mark {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    results::after_mark_write(&pool, mark.enrollment_id, mark.exam_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
