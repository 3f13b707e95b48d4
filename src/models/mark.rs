// src/models/mark.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'marks' table: one subject-assessment score for one
/// enrollment within one exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Mark {
    pub id: i64,
    pub enrollment_id: i64,
    pub subject_id: i64,
    pub exam_id: i64,
    pub assessment_type_id: Option<i64>,
    pub max_marks: f64,
    pub marks_obtained: f64,
    pub remarks: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Mark joined with names, as returned by list endpoints.
#[derive(Debug, Serialize, FromRow)]
pub struct MarkView {
    pub id: i64,
    pub enrollment_id: i64,
    pub student_name: String,
    pub subject_id: i64,
    pub subject_name: String,
    pub exam_id: i64,
    pub exam_name: String,
    pub assessment_type_id: Option<i64>,
    pub max_marks: f64,
    pub marks_obtained: f64,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMarkRequest {
    pub enrollment_id: i64,
    pub subject_id: i64,
    pub exam_id: i64,
    pub assessment_type_id: Option<i64>,
    #[validate(range(min = 0.0, message = "Maximum marks cannot be negative."))]
    pub max_marks: f64,
    #[validate(range(min = 0.0, message = "Marks obtained cannot be negative."))]
    pub marks_obtained: f64,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

/// DTO for updating a mark. The slot (enrollment, subject, exam, assessment type)
/// is fixed once written; only the scores and remarks change.
/// An empty `remarks` string clears the remarks.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMarkRequest {
    #[validate(range(min = 0.0, message = "Maximum marks cannot be negative."))]
    pub max_marks: Option<f64>,
    #[validate(range(min = 0.0, message = "Marks obtained cannot be negative."))]
    pub marks_obtained: Option<f64>,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkListParams {
    pub exam_id: Option<i64>,
    pub enrollment_id: Option<i64>,
}

/// Rejects scores outside `0..=max_marks`.
pub fn check_score(marks_obtained: f64, max_marks: f64) -> Result<(), String> {
    if !marks_obtained.is_finite() || !max_marks.is_finite() {
        return Err("Marks must be finite numbers.".to_string());
    }
    if max_marks < 0.0 || marks_obtained < 0.0 {
        return Err("Marks cannot be negative.".to_string());
    }
    if marks_obtained > max_marks {
        return Err("Marks obtained cannot exceed maximum marks.".to_string());
    }
    Ok(())
}

/// Remarks after an update: absent keeps the current text, blank clears it.
pub fn merge_remarks(update: Option<String>, current: Option<String>) -> Option<String> {
    match update {
        Some(text) if text.trim().is_empty() => None,
        Some(text) => Some(text),
        None => current,
    }
}
