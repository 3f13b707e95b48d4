// src/models/academic.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'academic_years' table. Owns exams and grade scales.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AcademicYear {
    pub id: i64,
    /// Unique display name, e.g. "2025-2026".
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAcademicYearRequest {
    #[validate(length(min = 1, max = 20))]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Represents the 'exams' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub academic_year_id: i64,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Weight of this exam towards CGPA.
    pub weightage: f64,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_exam_dates))]
pub struct CreateExamRequest {
    pub academic_year_id: i64,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, message = "Weightage cannot be negative."))]
    pub weightage: Option<f64>,
}

fn validate_exam_dates(req: &CreateExamRequest) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (req.start_date, req.end_date) {
        if end < start {
            return Err(ValidationError::new("end_date_before_start_date"));
        }
    }
    Ok(())
}

/// Represents the 'grade_scales' table: one percentage band of a year's grading scheme.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GradeScale {
    pub id: i64,
    pub academic_year_id: i64,
    pub min_percentage: f64,
    pub max_percentage: f64,
    pub letter: String,
    pub gpa_points: f64,
    pub remark: Option<String>,
}

impl GradeScale {
    /// Inclusive on both ends.
    pub fn covers(&self, percentage: f64) -> bool {
        self.min_percentage <= percentage && percentage <= self.max_percentage
    }
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_band))]
pub struct CreateGradeScaleRequest {
    pub academic_year_id: i64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_percentage: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_percentage: f64,
    #[validate(length(min = 1, max = 5))]
    pub letter: String,
    #[validate(range(min = 0.0, max = 10.0))]
    pub gpa_points: f64,
    #[validate(length(max = 100))]
    pub remark: Option<String>,
}

fn validate_band(req: &CreateGradeScaleRequest) -> Result<(), ValidationError> {
    if req.min_percentage > req.max_percentage {
        return Err(ValidationError::new("min_percentage_above_max_percentage"));
    }
    Ok(())
}

/// Represents the 'assessment_types' table (e.g. "Theory", "Practical").
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AssessmentType {
    pub id: i64,
    pub name: String,
    pub weightage_within_subject: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssessmentTypeRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub weightage_within_subject: Option<f64>,
}
