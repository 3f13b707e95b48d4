// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'enrollments' table: a student's registration in one
/// classroom for one academic year.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub academic_year_id: i64,
    pub classroom_id: i64,
    pub roll_no: Option<i64>,
    pub admission_no: String,
    pub is_active: bool,
}

/// Enrollment joined with the student's and classroom's display names.
#[derive(Debug, Serialize, FromRow)]
pub struct EnrollmentView {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub academic_year_id: i64,
    pub classroom_id: i64,
    pub classroom_name: String,
    pub roll_no: Option<i64>,
    pub admission_no: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEnrollmentRequest {
    pub student_id: i64,
    pub academic_year_id: i64,
    pub classroom_id: i64,
    #[validate(range(min = 1))]
    pub roll_no: Option<i64>,
    #[validate(length(min = 1, max = 30))]
    pub admission_no: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentListParams {
    pub academic_year_id: Option<i64>,
    pub classroom_id: Option<i64>,
}
