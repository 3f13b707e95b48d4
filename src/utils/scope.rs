// src/utils/scope.rs

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    models::user::{ROLE_ADMIN, ROLE_STUDENT, ROLE_TEACHER},
    utils::jwt::Claims,
};

/// Which enrollments a caller may see.
///
/// Read handlers push this into their queries; the result services never
/// consult it. Queries must alias `enrollments` as `e` and `classrooms` as `c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Enrollments in classrooms this teacher is the homeroom teacher of, or
    /// teaches a subject in.
    Teacher(i64),
    /// Only the student's own enrollments.
    Student(i64),
}

impl Scope {
    pub fn from_claims(claims: &Claims) -> Result<Self, AppError> {
        let user_id = claims.user_id()?;
        match claims.role.as_str() {
            ROLE_ADMIN => Ok(Scope::All),
            ROLE_TEACHER => Ok(Scope::Teacher(user_id)),
            ROLE_STUDENT => Ok(Scope::Student(user_id)),
            other => Err(AppError::Forbidden(format!("Unknown role '{}'", other))),
        }
    }

    /// Appends ` AND <predicate>` to a query that already has a WHERE clause.
    pub fn push_predicate(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match *self {
            Scope::All => {}
            Scope::Teacher(id) => {
                builder.push(" AND (c.teacher_id = ");
                builder.push_bind(id);
                builder.push(
                    " OR EXISTS (SELECT 1 FROM subject_classrooms sc \
                     JOIN subjects st ON st.id = sc.subject_id \
                     WHERE sc.classroom_id = c.id AND st.teacher_id = ",
                );
                builder.push_bind(id);
                builder.push("))");
            }
            Scope::Student(id) => {
                builder.push(" AND e.student_id = ");
                builder.push_bind(id);
            }
        }
    }

    /// Like [`Scope::push_predicate`] but for rows tied to one subject, aliased
    /// `s`. A subject teacher only sees their own subject.
    pub fn push_subject_predicate(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match *self {
            Scope::Teacher(id) => {
                builder.push(" AND (c.teacher_id = ");
                builder.push_bind(id);
                builder.push(" OR (s.teacher_id = ");
                builder.push_bind(id);
                builder.push(
                    " AND EXISTS (SELECT 1 FROM subject_classrooms sc \
                     WHERE sc.subject_id = s.id AND sc.classroom_id = c.id)))",
                );
            }
            _ => self.push_predicate(builder),
        }
    }

    /// Fails with `NotFound` when the enrollment is missing and `Forbidden`
    /// when it exists but lies outside this scope.
    pub async fn ensure_enrollment(
        &self,
        pool: &SqlitePool,
        enrollment_id: i64,
    ) -> Result<(), AppError> {
        self.ensure_access(pool, enrollment_id, None).await
    }

    /// Write access to one subject of an enrollment. Teachers need to be the
    /// homeroom teacher, or teach `subject_id` to the enrollment's classroom.
    pub async fn ensure_subject(
        &self,
        pool: &SqlitePool,
        enrollment_id: i64,
        subject_id: i64,
    ) -> Result<(), AppError> {
        self.ensure_access(pool, enrollment_id, Some(subject_id)).await
    }

    async fn ensure_access(
        &self,
        pool: &SqlitePool,
        enrollment_id: i64,
        subject_id: Option<i64>,
    ) -> Result<(), AppError> {
        let teacher = match *self {
            Scope::Teacher(id) => Some(id),
            _ => None,
        };

        let row: Option<(i64, Option<i64>, i64)> = sqlx::query_as(
            r#"
            SELECT
                e.student_id,
                c.teacher_id,
                EXISTS (
                    SELECT 1 FROM subject_classrooms sc
                    JOIN subjects st ON st.id = sc.subject_id
                    WHERE sc.classroom_id = c.id
                      AND st.teacher_id = ?
                      AND (? IS NULL OR st.id = ?)
                ) AS teaches_subject
            FROM enrollments e
            JOIN classrooms c ON c.id = e.classroom_id
            WHERE e.id = ?
            "#,
        )
        .bind(teacher)
        .bind(subject_id)
        .bind(subject_id)
        .bind(enrollment_id)
        .fetch_optional(pool)
        .await?;

        let (student_id, homeroom_teacher, teaches_subject) = row.ok_or_else(|| {
            AppError::NotFound(format!("Enrollment {} not found", enrollment_id))
        })?;

        let allowed = match *self {
            Scope::All => true,
            Scope::Teacher(id) => homeroom_teacher == Some(id) || teaches_subject != 0,
            Scope::Student(id) => student_id == id,
        };

        if allowed {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Enrollment {} is outside your scope",
                enrollment_id
            )))
        }
    }
}
