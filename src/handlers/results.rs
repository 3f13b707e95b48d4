// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    config::{DEFAULT_TOP_N, MAX_TOP_N},
    error::AppError,
    models::result::{CgpaResponse, RecomputeRequest, ResultListParams, ResultView, TopNParams},
    services::results,
    utils::{jwt::Claims, scope::Scope},
};

const RESULT_VIEW_QUERY: &str = r#"
    SELECT
        rs.id, rs.enrollment_id, u.username AS student_name, c.name AS classroom_name,
        rs.exam_id, x.name AS exam_name,
        rs.total_obtained, rs.total_max, rs.percentage, rs.grade_letter,
        rs.gpa_points, rs.class_rank, rs.computed_at
    FROM result_summaries rs
    JOIN enrollments e ON e.id = rs.enrollment_id
    JOIN users u ON u.id = e.student_id
    JOIN classrooms c ON c.id = e.classroom_id
    JOIN exams x ON x.id = rs.exam_id
    WHERE 1 = 1
"#;

/// Lists result summaries visible to the caller, optionally for one exam.
pub async fn list_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ResultListParams>,
) -> Result<impl IntoResponse, AppError> {
    let scope = Scope::from_claims(&claims)?;

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(RESULT_VIEW_QUERY);
    if let Some(exam_id) = params.exam_id {
        builder.push(" AND rs.exam_id = ");
        builder.push_bind(exam_id);
    }
    scope.push_predicate(&mut builder);
    builder.push(" ORDER BY rs.exam_id, c.name, rs.class_rank, rs.percentage DESC");

    let rows: Vec<ResultView> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list results: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
struct EnrollmentResults {
    enrollment_id: i64,
    cgpa: f64,
    results: Vec<ResultView>,
}

/// A student's own dashboard: results and CGPA for each of their enrollments.
pub async fn my_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let enrollment_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM enrollments WHERE student_id = ? ORDER BY id")
            .bind(student_id)
            .fetch_all(&pool)
            .await?;

    let mut out = Vec::with_capacity(enrollment_ids.len());
    for enrollment_id in enrollment_ids {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(RESULT_VIEW_QUERY);
        builder.push(" AND rs.enrollment_id = ");
        builder.push_bind(enrollment_id);
        builder.push(" ORDER BY x.start_date, x.id");

        let rows: Vec<ResultView> = builder.build_query_as().fetch_all(&pool).await?;
        let cgpa = results::compute_cgpa(&pool, enrollment_id).await?;

        out.push(EnrollmentResults {
            enrollment_id,
            cgpa,
            results: rows,
        });
    }

    Ok(Json(out))
}

/// CGPA of one enrollment, within the caller's scope.
pub async fn enrollment_cgpa(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(enrollment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Scope::from_claims(&claims)?
        .ensure_enrollment(&pool, enrollment_id)
        .await?;

    let cgpa = results::compute_cgpa(&pool, enrollment_id).await?;

    Ok(Json(CgpaResponse {
        enrollment_id,
        cgpa,
    }))
}

/// Recomputes one (enrollment, exam) summary on demand. The pair must share
/// an academic year. Admin only.
pub async fn recompute_one(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RecomputeRequest>,
) -> Result<impl IntoResponse, AppError> {
    results::ensure_same_year(&pool, payload.enrollment_id, payload.exam_id).await?;
    let summary = results::recompute(&pool, payload.enrollment_id, payload.exam_id).await?;

    Ok(Json(json!({ "result": summary })))
}

/// Recomputes all summaries of an exam and reports per-enrollment failures.
/// Admin only.
pub async fn recompute_exam(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let report = results::recompute_all(&pool, exam_id).await?;

    Ok(Json(report))
}

/// Admin only.
pub async fn recompute_exam_ranks(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let ranked = results::recompute_ranks(&pool, exam_id).await?;

    Ok(Json(json!({ "exam_id": exam_id, "ranked": ranked })))
}

/// Top `n` (default 3) students of an exam by percentage.
/// Admin only.
pub async fn top_results(
    State(pool): State<SqlitePool>,
    Path(exam_id): Path<i64>,
    Query(params): Query<TopNParams>,
) -> Result<impl IntoResponse, AppError> {
    let n = params.n.unwrap_or(DEFAULT_TOP_N);
    if !(1..=MAX_TOP_N).contains(&n) {
        return Err(AppError::BadRequest(format!(
            "n must be between 1 and {}",
            MAX_TOP_N
        )));
    }

    let top = results::top_n(&pool, exam_id, n).await?;

    Ok(Json(top))
}
