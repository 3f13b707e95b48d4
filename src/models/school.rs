// src/models/school.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'classrooms' table, e.g. "10A".
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Classroom {
    pub id: i64,
    pub name: String,
    pub section: Option<String>,
    /// Homeroom teacher; teachers see marks and results of their classrooms.
    pub teacher_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassroomRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(max = 10))]
    pub section: Option<String>,
    pub teacher_id: Option<i64>,
}

/// Represents the 'subjects' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    /// Subject teacher; may mark this subject in every classroom that studies it.
    pub teacher_id: Option<i64>,
    /// Classrooms that study this subject, from 'subject_classrooms'.
    #[sqlx(skip)]
    #[serde(default)]
    pub classroom_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub teacher_id: Option<i64>,
    #[serde(default)]
    pub classroom_ids: Vec<i64>,
}
