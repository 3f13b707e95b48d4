// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'result_summaries' table.
/// Cached aggregate of all marks for one (enrollment, exam) pair; only the
/// result services write to it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ResultSummary {
    pub id: i64,
    pub enrollment_id: i64,
    pub exam_id: i64,
    pub total_obtained: f64,
    pub total_max: f64,
    /// Rounded to 2 decimals.
    pub percentage: f64,
    pub grade_letter: Option<String>,
    pub gpa_points: f64,
    /// Stale until ranks are recomputed for the exam.
    pub class_rank: Option<i64>,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

/// Summary joined with student, classroom and exam names.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultView {
    pub id: i64,
    pub enrollment_id: i64,
    pub student_name: String,
    pub classroom_name: String,
    pub exam_id: i64,
    pub exam_name: String,
    pub total_obtained: f64,
    pub total_max: f64,
    pub percentage: f64,
    pub grade_letter: Option<String>,
    pub gpa_points: f64,
    pub class_rank: Option<i64>,
    pub computed_at: chrono::DateTime<chrono::Utc>,
}

/// One row of the top-N listing for an exam.
#[derive(Debug, Serialize, FromRow)]
pub struct TopResult {
    pub enrollment_id: i64,
    pub student: String,
    pub classroom: String,
    pub percentage: f64,
    pub grade: Option<String>,
    pub rank: Option<i64>,
}

/// Outcome of recomputing every summary of an exam.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub exam_id: i64,
    /// Enrollments the batch visited.
    pub processed: usize,
    /// Enrollments recomputed without error (with or without a resulting summary).
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
}

#[derive(Debug, Serialize)]
pub struct BatchFailure {
    pub enrollment_id: i64,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct CgpaResponse {
    pub enrollment_id: i64,
    pub cgpa: f64,
}

#[derive(Debug, Deserialize)]
pub struct ResultListParams {
    pub exam_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TopNParams {
    pub n: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecomputeRequest {
    pub enrollment_id: i64,
    pub exam_id: i64,
}
