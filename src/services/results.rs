// src/services/results.rs
//
// Entry points the request layer calls: the post-write hook for marks and the
// administrative recompute/read operations.

use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::result::{BatchFailure, BatchReport, ResultSummary, TopResult},
    services::aggregate::ensure_exam,
};

pub use crate::services::aggregate::{ensure_same_year, recompute};
pub use crate::services::cgpa::compute_cgpa;
pub use crate::services::ranking::recompute_ranks;

/// Post-write hook. Mark handlers call this right after a mark for
/// `(enrollment_id, exam_id)` is created, updated or deleted.
pub async fn after_mark_write(
    pool: &SqlitePool,
    enrollment_id: i64,
    exam_id: i64,
) -> Result<Option<ResultSummary>, AppError> {
    recompute(pool, enrollment_id, exam_id).await.inspect_err(|e| {
        tracing::error!(
            "Result recompute after mark write failed (enrollment {}, exam {}): {}",
            enrollment_id,
            exam_id,
            e
        );
    })
}

/// Recomputes the summary of every active enrollment in the exam's academic year.
///
/// Each enrollment is independent: failures are collected into the report
/// and the batch carries on.
pub async fn recompute_all(pool: &SqlitePool, exam_id: i64) -> Result<BatchReport, AppError> {
    let academic_year_id = ensure_exam(pool, exam_id).await?;

    let enrollment_ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM enrollments
        WHERE academic_year_id = ? AND is_active = 1
        ORDER BY id
        "#,
    )
    .bind(academic_year_id)
    .fetch_all(pool)
    .await?;

    let mut report = BatchReport {
        exam_id,
        ..BatchReport::default()
    };

    for enrollment_id in enrollment_ids {
        report.processed += 1;
        match recompute(pool, enrollment_id, exam_id).await {
            Ok(_) => report.succeeded += 1,
            Err(e) => {
                tracing::warn!(
                    "Recompute failed for enrollment {} in exam {}: {}",
                    enrollment_id,
                    exam_id,
                    e
                );
                report.failures.push(BatchFailure {
                    enrollment_id,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Batch recompute for exam {}: {}/{} succeeded",
        exam_id,
        report.succeeded,
        report.processed
    );

    Ok(report)
}

/// Best `n` summaries of an exam by percentage, across all classrooms. Read-only.
pub async fn top_n(pool: &SqlitePool, exam_id: i64, n: i64) -> Result<Vec<TopResult>, AppError> {
    ensure_exam(pool, exam_id).await?;

    let rows = sqlx::query_as::<_, TopResult>(
        r#"
        SELECT
            rs.enrollment_id,
            u.username AS student,
            c.name AS classroom,
            rs.percentage,
            rs.grade_letter AS grade,
            rs.class_rank AS rank
        FROM result_summaries rs
        JOIN enrollments e ON e.id = rs.enrollment_id
        JOIN users u ON u.id = e.student_id
        JOIN classrooms c ON c.id = e.classroom_id
        WHERE rs.exam_id = ?
        ORDER BY rs.percentage DESC, rs.id ASC
        LIMIT ?
        "#,
    )
    .bind(exam_id)
    .bind(n.max(0))
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch top results for exam {}: {:?}", exam_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(rows)
}
