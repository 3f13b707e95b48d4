// src/services/ranking.rs

use sqlx::{FromRow, SqlitePool};

use crate::{error::AppError, services::aggregate::ensure_exam};

/// One summary as seen by the ranking pass.
#[derive(Debug, Clone, FromRow)]
pub struct RankRow {
    pub summary_id: i64,
    pub classroom_id: i64,
    pub percentage: f64,
}

/// Assigns standard competition ranks ("1224") per classroom.
///
/// `rows` must be ordered by classroom, then percentage descending. Ties
/// compare the stored percentage exactly. Returns `(summary_id, rank)` in input order.
pub fn assign_ranks(rows: &[RankRow]) -> Vec<(i64, i64)> {
    let mut ranks = Vec::with_capacity(rows.len());

    let mut current_classroom: Option<i64> = None;
    let mut rank = 0_i64;
    let mut tie_count = 0_i64;
    let mut last_percentage = 0.0_f64;

    for row in rows {
        if current_classroom != Some(row.classroom_id) {
            current_classroom = Some(row.classroom_id);
            rank = 1;
            tie_count = 0;
            last_percentage = row.percentage;
        } else if row.percentage == last_percentage {
            tie_count += 1;
        } else {
            rank += tie_count + 1;
            tie_count = 0;
            last_percentage = row.percentage;
        }

        ranks.push((row.summary_id, rank));
    }

    ranks
}

/// Recomputes `class_rank` for every summary of an exam.
///
/// Reads the whole exam, then writes all ranks in one transaction. Summaries
/// recomputed concurrently may keep a stale rank until the next pass.
/// Returns the number of summaries ranked.
pub async fn recompute_ranks(pool: &SqlitePool, exam_id: i64) -> Result<u64, AppError> {
    ensure_exam(pool, exam_id).await?;

    let rows = sqlx::query_as::<_, RankRow>(
        r#"
        SELECT rs.id AS summary_id, e.classroom_id, rs.percentage
        FROM result_summaries rs
        JOIN enrollments e ON e.id = rs.enrollment_id
        WHERE rs.exam_id = ?
        ORDER BY e.classroom_id ASC, rs.percentage DESC, rs.id ASC
        "#,
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load summaries for ranking exam {}: {:?}", exam_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let ranks = assign_ranks(&rows);

    let mut tx = pool.begin().await?;
    for (summary_id, rank) in &ranks {
        sqlx::query("UPDATE result_summaries SET class_rank = ? WHERE id = ?")
            .bind(rank)
            .bind(summary_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!("Ranked {} result summaries for exam {}", ranks.len(), exam_id);

    Ok(ranks.len() as u64)
}
