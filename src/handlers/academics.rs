// src/handlers/academics.rs
//
// Reference data that grading depends on: academic years, exams, grade
// scales and assessment types. Writes are admin only; reads need a login.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::DEFAULT_EXAM_WEIGHTAGE,
    error::AppError,
    models::academic::{
        AcademicYear, AssessmentType, CreateAcademicYearRequest, CreateAssessmentTypeRequest,
        CreateExamRequest, CreateGradeScaleRequest, Exam, GradeScale,
    },
};

#[derive(Debug, Deserialize)]
pub struct YearFilter {
    pub academic_year_id: Option<i64>,
}

pub async fn list_academic_years(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let years = sqlx::query_as::<_, AcademicYear>(
        "SELECT id, name, is_active FROM academic_years ORDER BY name DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(years))
}

/// Creates an academic year. Marking it active deactivates every other year.
pub async fn create_academic_year(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateAcademicYearRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    if payload.is_active {
        sqlx::query("UPDATE academic_years SET is_active = 0")
            .execute(&mut *tx)
            .await?;
    }

    let year = sqlx::query_as::<_, AcademicYear>(
        "INSERT INTO academic_years (name, is_active) VALUES (?, ?) RETURNING id, name, is_active",
    )
    .bind(&payload.name)
    .bind(payload.is_active)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        AppError::from_write(e, format!("Academic year '{}' already exists", payload.name))
    })?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(year)))
}

pub async fn list_exams(
    State(pool): State<SqlitePool>,
    Query(filter): Query<YearFilter>,
) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, Exam>(
        r#"
        SELECT id, academic_year_id, name, start_date, end_date, weightage
        FROM exams
        WHERE (? IS NULL OR academic_year_id = ?)
        ORDER BY academic_year_id, start_date, id
        "#,
    )
    .bind(filter.academic_year_id)
    .bind(filter.academic_year_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(exams))
}

pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exam = sqlx::query_as::<_, Exam>(
        r#"
        INSERT INTO exams (academic_year_id, name, start_date, end_date, weightage)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, academic_year_id, name, start_date, end_date, weightage
        "#,
    )
    .bind(payload.academic_year_id)
    .bind(&payload.name)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.weightage.unwrap_or(DEFAULT_EXAM_WEIGHTAGE))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            format!("Exam '{}' already exists in this academic year", payload.name),
        )
    })?;

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Deletes an exam together with its marks and result summaries.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM exams WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Exam {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists grade bands, highest first.
pub async fn list_grade_scales(
    State(pool): State<SqlitePool>,
    Query(filter): Query<YearFilter>,
) -> Result<impl IntoResponse, AppError> {
    let scales = sqlx::query_as::<_, GradeScale>(
        r#"
        SELECT id, academic_year_id, min_percentage, max_percentage, letter, gpa_points, remark
        FROM grade_scales
        WHERE (? IS NULL OR academic_year_id = ?)
        ORDER BY academic_year_id, min_percentage DESC
        "#,
    )
    .bind(filter.academic_year_id)
    .bind(filter.academic_year_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(scales))
}

/// Adds a grade band. Overlap with existing bands is allowed; resolution
/// prefers the band with the higher floor.
pub async fn create_grade_scale(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateGradeScaleRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let scale = sqlx::query_as::<_, GradeScale>(
        r#"
        INSERT INTO grade_scales
            (academic_year_id, min_percentage, max_percentage, letter, gpa_points, remark)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, academic_year_id, min_percentage, max_percentage, letter, gpa_points, remark
        "#,
    )
    .bind(payload.academic_year_id)
    .bind(payload.min_percentage)
    .bind(payload.max_percentage)
    .bind(&payload.letter)
    .bind(payload.gpa_points)
    .bind(&payload.remark)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        AppError::from_write(
            e,
            format!("Grade '{}' already exists in this academic year", payload.letter),
        )
    })?;

    Ok((StatusCode::CREATED, Json(scale)))
}

pub async fn delete_grade_scale(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM grade_scales WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Grade scale {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_assessment_types(
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let types = sqlx::query_as::<_, AssessmentType>(
        "SELECT id, name, weightage_within_subject FROM assessment_types ORDER BY name",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(types))
}

pub async fn create_assessment_type(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateAssessmentTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let created = sqlx::query_as::<_, AssessmentType>(
        r#"
        INSERT INTO assessment_types (name, weightage_within_subject)
        VALUES (?, ?)
        RETURNING id, name, weightage_within_subject
        "#,
    )
    .bind(&payload.name)
    .bind(payload.weightage_within_subject.unwrap_or(100.0))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        AppError::from_write(e, format!("Assessment type '{}' already exists", payload.name))
    })?;

    Ok((StatusCode::CREATED, Json(created)))
}
