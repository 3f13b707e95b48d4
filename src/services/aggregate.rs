// src/services/aggregate.rs

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{enrollment::Enrollment, result::ResultSummary},
    services::{grading, round2},
};

/// Sums of one (enrollment, exam) pair's marks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub total_obtained: f64,
    pub total_max: f64,
    /// Unrounded; the grade band is chosen from this value.
    pub raw_percentage: f64,
    /// Rounded to 2 decimals for storage.
    pub percentage: f64,
}

/// Aggregates `(marks_obtained, max_marks)` pairs.
///
/// A zero `total_max` yields 0%, never NaN.
pub fn totals(marks: &[(f64, f64)]) -> Totals {
    let (total_obtained, total_max) = marks
        .iter()
        .fold((0.0, 0.0), |(obtained, max), (o, m)| (obtained + o, max + m));

    let raw_percentage = if total_max > 0.0 {
        total_obtained / total_max * 100.0
    } else {
        0.0
    };

    Totals {
        total_obtained,
        total_max,
        raw_percentage,
        percentage: round2(raw_percentage),
    }
}

pub(crate) async fn fetch_enrollment(
    pool: &SqlitePool,
    enrollment_id: i64,
) -> Result<Enrollment, AppError> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        SELECT id, student_id, academic_year_id, classroom_id, roll_no, admission_no, is_active
        FROM enrollments
        WHERE id = ?
        "#,
    )
    .bind(enrollment_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Enrollment {} not found", enrollment_id)))
}

pub(crate) async fn ensure_exam(pool: &SqlitePool, exam_id: i64) -> Result<i64, AppError> {
    let academic_year_id: Option<i64> =
        sqlx::query_scalar("SELECT academic_year_id FROM exams WHERE id = ?")
            .bind(exam_id)
            .fetch_optional(pool)
            .await?;

    academic_year_id.ok_or_else(|| AppError::NotFound(format!("Exam {} not found", exam_id)))
}

/// Fails with `NotFound` for a missing enrollment or exam and `BadRequest`
/// when the two belong to different academic years.
pub async fn ensure_same_year(
    pool: &SqlitePool,
    enrollment_id: i64,
    exam_id: i64,
) -> Result<(), AppError> {
    let enrollment = fetch_enrollment(pool, enrollment_id).await?;
    let exam_year = ensure_exam(pool, exam_id).await?;

    if enrollment.academic_year_id != exam_year {
        return Err(AppError::BadRequest(
            "Exam and enrollment belong to different academic years".to_string(),
        ));
    }
    Ok(())
}

/// Rebuilds the result summary of one (enrollment, exam) pair from its marks.
///
/// Without marks the summary is removed and `None` returned. Otherwise the
/// summary is upserted in a single statement; `class_rank` is left untouched.
pub async fn recompute(
    pool: &SqlitePool,
    enrollment_id: i64,
    exam_id: i64,
) -> Result<Option<ResultSummary>, AppError> {
    let enrollment = fetch_enrollment(pool, enrollment_id).await?;
    ensure_exam(pool, exam_id).await?;

    // Slot order keeps float sums independent of insertion order.
    let marks: Vec<(f64, f64)> = sqlx::query_as(
        r#"
        SELECT marks_obtained, max_marks
        FROM marks
        WHERE enrollment_id = ? AND exam_id = ?
        ORDER BY subject_id, COALESCE(assessment_type_id, 0)
        "#,
    )
    .bind(enrollment_id)
    .bind(exam_id)
    .fetch_all(pool)
    .await?;

    if marks.is_empty() {
        let removed = sqlx::query(
            "DELETE FROM result_summaries WHERE enrollment_id = ? AND exam_id = ?",
        )
        .bind(enrollment_id)
        .bind(exam_id)
        .execute(pool)
        .await?
        .rows_affected();

        if removed > 0 {
            tracing::info!(
                "Removed result summary for enrollment {} exam {} (no marks left)",
                enrollment_id,
                exam_id
            );
        }
        return Ok(None);
    }

    let totals = totals(&marks);
    let grade = grading::resolve(pool, enrollment.academic_year_id, totals.raw_percentage).await?;

    let summary = sqlx::query_as::<_, ResultSummary>(
        r#"
        INSERT INTO result_summaries
            (enrollment_id, exam_id, total_obtained, total_max, percentage, grade_letter, gpa_points, computed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(enrollment_id, exam_id) DO UPDATE SET
            total_obtained = excluded.total_obtained,
            total_max = excluded.total_max,
            percentage = excluded.percentage,
            grade_letter = excluded.grade_letter,
            gpa_points = excluded.gpa_points,
            computed_at = excluded.computed_at
        RETURNING id, enrollment_id, exam_id, total_obtained, total_max, percentage,
                  grade_letter, gpa_points, class_rank, computed_at
        "#,
    )
    .bind(enrollment_id)
    .bind(exam_id)
    .bind(totals.total_obtained)
    .bind(totals.total_max)
    .bind(totals.percentage)
    .bind(grade.letter)
    .bind(grade.gpa_points)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!(
            "Failed to upsert result summary for enrollment {} exam {}: {:?}",
            enrollment_id,
            exam_id,
            e
        );
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::debug!(
        "Recomputed enrollment {} exam {}: {}/{} = {}% ({:?})",
        enrollment_id,
        exam_id,
        summary.total_obtained,
        summary.total_max,
        summary.percentage,
        summary.grade_letter
    );

    Ok(Some(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_and_rounds_percentage() {
        let t = totals(&[(80.0, 100.0), (45.0, 50.0)]);
        assert_eq!(t.total_obtained, 125.0);
        assert_eq!(t.total_max, 150.0);
        assert_eq!(t.percentage, 83.33);
        assert!((t.raw_percentage - 83.333_333).abs() < 1e-4);
    }

    #[test]
    fn rounding_only_touches_the_stored_percentage() {
        let t = totals(&[(7999.6, 10000.0)]);
        assert_eq!(t.percentage, 80.0);
        assert!(t.raw_percentage < 80.0);
    }

    #[test]
    fn zero_maximum_is_zero_percent() {
        let t = totals(&[(0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(t.total_max, 0.0);
        assert_eq!(t.percentage, 0.0);
        assert!(!t.percentage.is_nan());
    }

    #[test]
    fn empty_input_is_all_zero() {
        let t = totals(&[]);
        assert_eq!(
            t,
            Totals {
                total_obtained: 0.0,
                total_max: 0.0,
                raw_percentage: 0.0,
                percentage: 0.0
            }
        );
    }
}
