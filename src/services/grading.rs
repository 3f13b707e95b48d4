// src/services/grading.rs

use sqlx::SqlitePool;

use crate::{error::AppError, models::academic::GradeScale};

/// Letter grade and GPA points for one percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGrade {
    pub letter: Option<String>,
    pub gpa_points: f64,
}

impl ResolvedGrade {
    pub fn ungraded() -> Self {
        Self {
            letter: None,
            gpa_points: 0.0,
        }
    }
}

/// Picks the band covering `percentage` with the highest floor.
///
/// Overlapping bands resolve to the narrower, higher one; equal floors fall
/// back to the lowest id.
pub fn pick_band(scales: &[GradeScale], percentage: f64) -> Option<&GradeScale> {
    scales
        .iter()
        .filter(|scale| scale.covers(percentage))
        .fold(None, |best: Option<&GradeScale>, scale| match best {
            None => Some(scale),
            Some(current)
                if scale.min_percentage > current.min_percentage
                    || (scale.min_percentage == current.min_percentage
                        && scale.id < current.id) =>
            {
                Some(scale)
            }
            keep => keep,
        })
}

/// Resolves `percentage` against the grade scale of an academic year.
///
/// A year without a matching band yields an ungraded result, not an error.
pub async fn resolve(
    pool: &SqlitePool,
    academic_year_id: i64,
    percentage: f64,
) -> Result<ResolvedGrade, AppError> {
    let candidates = sqlx::query_as::<_, GradeScale>(
        r#"
        SELECT id, academic_year_id, min_percentage, max_percentage, letter, gpa_points, remark
        FROM grade_scales
        WHERE academic_year_id = ?
          AND min_percentage <= ?
          AND max_percentage >= ?
        ORDER BY min_percentage DESC, id ASC
        "#,
    )
    .bind(academic_year_id)
    .bind(percentage)
    .bind(percentage)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load grade scale for year {}: {:?}", academic_year_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(match pick_band(&candidates, percentage) {
        Some(band) => ResolvedGrade {
            letter: Some(band.letter.clone()),
            gpa_points: band.gpa_points,
        },
        None => {
            tracing::debug!(
                "No grade band covers {:.2}% in academic year {}",
                percentage,
                academic_year_id
            );
            ResolvedGrade::ungraded()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(id: i64, min: f64, max: f64, letter: &str, gpa: f64) -> GradeScale {
        GradeScale {
            id,
            academic_year_id: 1,
            min_percentage: min,
            max_percentage: max,
            letter: letter.to_string(),
            gpa_points: gpa,
            remark: None,
        }
    }

    #[test]
    fn overlapping_bands_prefer_highest_floor() {
        let scales = vec![
            band(1, 0.0, 59.0, "F", 0.0),
            band(2, 60.0, 79.0, "C", 2.0),
            band(3, 80.0, 100.0, "A", 4.0),
            band(4, 50.0, 69.0, "D", 1.0),
        ];
        assert_eq!(pick_band(&scales, 65.0).unwrap().letter, "C");
        assert_eq!(pick_band(&scales, 55.0).unwrap().letter, "D");
        assert_eq!(pick_band(&scales, 10.0).unwrap().letter, "F");
    }

    #[test]
    fn bounds_are_inclusive() {
        let scales = vec![band(1, 80.0, 100.0, "A", 4.0)];
        assert_eq!(pick_band(&scales, 80.0).unwrap().letter, "A");
        assert_eq!(pick_band(&scales, 100.0).unwrap().letter, "A");
        assert!(pick_band(&scales, 79.99).is_none());
    }

    #[test]
    fn gaps_and_empty_scales_are_ungraded() {
        let scales = vec![band(1, 0.0, 59.0, "F", 0.0), band(2, 60.0, 100.0, "P", 1.0)];
        assert!(pick_band(&scales, 59.5).is_none());
        assert!(pick_band(&[], 50.0).is_none());
    }

    #[test]
    fn equal_floors_fall_back_to_lowest_id() {
        let scales = vec![band(9, 70.0, 100.0, "B", 3.0), band(4, 70.0, 90.0, "B+", 3.3)];
        assert_eq!(pick_band(&scales, 85.0).unwrap().id, 4);
    }
}
