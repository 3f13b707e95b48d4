// src/services/cgpa.rs

use sqlx::SqlitePool;

use crate::{
    config::DEFAULT_EXAM_WEIGHTAGE,
    error::AppError,
    services::{aggregate::fetch_enrollment, round2},
};

/// Weight an exam contributes. Missing, negative or non-finite weightage
/// falls back to the default; an explicit zero stays zero.
pub fn effective_weight(weightage: Option<f64>) -> f64 {
    match weightage {
        Some(w) if w.is_finite() && w >= 0.0 => w,
        _ => DEFAULT_EXAM_WEIGHTAGE,
    }
}

/// Weighted mean of `(gpa_points, weightage)` pairs, rounded to 2 decimals.
/// Returns 0 for no input or a zero total weight.
pub fn weighted_cgpa(results: &[(f64, Option<f64>)]) -> f64 {
    let (weighted, total_weight) =
        results
            .iter()
            .fold((0.0, 0.0), |(weighted, total), (gpa, weightage)| {
                let weight = effective_weight(*weightage);
                (weighted + gpa * weight, total + weight)
            });

    if total_weight > 0.0 {
        round2(weighted / total_weight)
    } else {
        0.0
    }
}

/// CGPA of one enrollment across all of its exam results.
pub async fn compute_cgpa(pool: &SqlitePool, enrollment_id: i64) -> Result<f64, AppError> {
    fetch_enrollment(pool, enrollment_id).await?;

    let results: Vec<(f64, Option<f64>)> = sqlx::query_as(
        r#"
        SELECT rs.gpa_points, x.weightage
        FROM result_summaries rs
        JOIN exams x ON x.id = rs.exam_id
        WHERE rs.enrollment_id = ?
        ORDER BY x.id
        "#,
    )
    .bind(enrollment_id)
    .fetch_all(pool)
    .await?;

    Ok(weighted_cgpa(&results))
}
