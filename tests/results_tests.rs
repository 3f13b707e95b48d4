// tests/results_tests.rs

mod common;

use common::*;
use school_backend::{
    error::AppError,
    models::result::ResultSummary,
    services::{grading, results},
};
use sqlx::SqlitePool;

async fn summary_count(pool: &SqlitePool, enrollment_id: i64, exam_id: i64) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM result_summaries WHERE enrollment_id = ? AND exam_id = ?",
    )
    .bind(enrollment_id)
    .bind(exam_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn ranks_in_order(pool: &SqlitePool, enrollment_ids: &[i64], exam_id: i64) -> Vec<Option<i64>> {
    let mut out = Vec::new();
    for id in enrollment_ids {
        let rank: Option<i64> = sqlx::query_scalar(
            "SELECT class_rank FROM result_summaries WHERE enrollment_id = ? AND exam_id = ?",
        )
        .bind(id)
        .bind(exam_id)
        .fetch_one(pool)
        .await
        .unwrap();
        out.push(rank);
    }
    out
}

fn same_fields(a: &ResultSummary, b: &ResultSummary) -> bool {
    a.total_obtained == b.total_obtained
        && a.total_max == b.total_max
        && a.percentage == b.percentage
        && a.grade_letter == b.grade_letter
        && a.gpa_points == b.gpa_points
}

#[tokio::test]
async fn end_to_end_summary_with_grade() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    grade_scale(&pool, f.year_id, 80.0, 100.0, "A", 4.0).await;
    grade_scale(&pool, f.year_id, 0.0, 79.99, "B", 3.0).await;

    let math = subject(&pool, "MATH").await;
    let sci = subject(&pool, "SCI").await;
    let student = user(&pool, "alice", "student").await;
    let enrollment_id = enrollment(&pool, student, f.year_id, f.classroom_id, "ADM-1").await;
    mark(&pool, enrollment_id, math, f.exam_id, 80.0, 100.0).await;
    mark(&pool, enrollment_id, sci, f.exam_id, 45.0, 50.0).await;

    let summary = results::recompute(&pool, enrollment_id, f.exam_id)
        .await
        .unwrap()
        .expect("summary should exist");

    assert_eq!(summary.total_obtained, 125.0);
    assert_eq!(summary.total_max, 150.0);
    assert_eq!(summary.percentage, 83.33);
    assert_eq!(summary.grade_letter.as_deref(), Some("A"));
    assert_eq!(summary.gpa_points, 4.0);
    assert_eq!(summary.class_rank, None);
}

#[tokio::test]
async fn recompute_is_idempotent_and_order_independent() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    grade_scale(&pool, f.year_id, 0.0, 100.0, "P", 2.0).await;
    let s1 = subject(&pool, "S1").await;
    let s2 = subject(&pool, "S2").await;
    let s3 = subject(&pool, "S3").await;

    let u1 = user(&pool, "first", "student").await;
    let u2 = user(&pool, "second", "student").await;
    let e1 = enrollment(&pool, u1, f.year_id, f.classroom_id, "ADM-1").await;
    let e2 = enrollment(&pool, u2, f.year_id, f.classroom_id, "ADM-2").await;

    mark(&pool, e1, s1, f.exam_id, 33.3, 50.0).await;
    mark(&pool, e1, s2, f.exam_id, 17.1, 25.0).await;
    mark(&pool, e1, s3, f.exam_id, 66.7, 75.0).await;

    mark(&pool, e2, s3, f.exam_id, 66.7, 75.0).await;
    mark(&pool, e2, s1, f.exam_id, 33.3, 50.0).await;
    mark(&pool, e2, s2, f.exam_id, 17.1, 25.0).await;

    let a = results::recompute(&pool, e1, f.exam_id).await.unwrap().unwrap();
    let b = results::recompute(&pool, e2, f.exam_id).await.unwrap().unwrap();
    assert!(same_fields(&a, &b), "{:?} vs {:?}", a, b);

    let again = results::recompute(&pool, e1, f.exam_id).await.unwrap().unwrap();
    assert!(same_fields(&a, &again));
    assert_eq!(a.id, again.id, "recompute must update the same row");
}

#[tokio::test]
async fn deleting_last_mark_removes_summary() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    let math = subject(&pool, "MATH").await;
    let student = user(&pool, "bob", "student").await;
    let enrollment_id = enrollment(&pool, student, f.year_id, f.classroom_id, "ADM-1").await;
    let mark_id = mark(&pool, enrollment_id, math, f.exam_id, 40.0, 100.0).await;

    assert!(results::recompute(&pool, enrollment_id, f.exam_id).await.unwrap().is_some());
    assert_eq!(summary_count(&pool, enrollment_id, f.exam_id).await, 1);

    sqlx::query("DELETE FROM marks WHERE id = ?")
        .bind(mark_id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(results::after_mark_write(&pool, enrollment_id, f.exam_id).await.unwrap().is_none());
    assert_eq!(summary_count(&pool, enrollment_id, f.exam_id).await, 0);

    // Second pass is a no-op.
    assert!(results::recompute(&pool, enrollment_id, f.exam_id).await.unwrap().is_none());
    assert_eq!(summary_count(&pool, enrollment_id, f.exam_id).await, 0);
}

#[tokio::test]
async fn missing_scale_is_ungraded_and_zero_max_is_zero_percent() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    let art = subject(&pool, "ART").await;
    let student = user(&pool, "carol", "student").await;
    let enrollment_id = enrollment(&pool, student, f.year_id, f.classroom_id, "ADM-1").await;
    mark(&pool, enrollment_id, art, f.exam_id, 0.0, 0.0).await;

    let summary = results::recompute(&pool, enrollment_id, f.exam_id).await.unwrap().unwrap();

    assert_eq!(summary.total_max, 0.0);
    assert_eq!(summary.percentage, 0.0);
    assert_eq!(summary.grade_letter, None);
    assert_eq!(summary.gpa_points, 0.0);
}

#[tokio::test]
async fn resolver_prefers_highest_floor_band() {
    let pool = test_pool().await;
    let year = academic_year(&pool, "2024-2025").await;
    grade_scale(&pool, year, 0.0, 59.0, "F", 0.0).await;
    grade_scale(&pool, year, 60.0, 79.0, "C", 2.0).await;
    grade_scale(&pool, year, 80.0, 100.0, "A", 4.0).await;
    grade_scale(&pool, year, 50.0, 69.0, "D", 1.0).await;

    let grade = grading::resolve(&pool, year, 65.0).await.unwrap();
    assert_eq!(grade.letter.as_deref(), Some("C"));
    assert_eq!(grade.gpa_points, 2.0);

    let other_year = academic_year(&pool, "2023-2024").await;
    let grade = grading::resolve(&pool, other_year, 65.0).await.unwrap();
    assert_eq!(grade, grading::ResolvedGrade::ungraded());
}

#[tokio::test]
async fn ranks_use_competition_ranking_per_classroom() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    let other_room = classroom(&pool, "10B", None).await;
    let math = subject(&pool, "MATH").await;

    let mut room_a = Vec::new();
    let mut room_b = Vec::new();
    for (i, pct) in [95.0, 90.0, 90.0, 80.0].iter().enumerate() {
        room_a.push(
            student_scoring(&pool, &format!("a{}", i), f.year_id, f.classroom_id, f.exam_id, math, *pct).await,
        );
        room_b.push(
            student_scoring(&pool, &format!("b{}", i), f.year_id, other_room, f.exam_id, math, *pct).await,
        );
    }

    let report = results::recompute_all(&pool, f.exam_id).await.unwrap();
    assert_eq!(report.succeeded, 8);

    let ranked = results::recompute_ranks(&pool, f.exam_id).await.unwrap();
    assert_eq!(ranked, 8);

    let expected = vec![Some(1), Some(2), Some(2), Some(4)];
    assert_eq!(ranks_in_order(&pool, &room_a, f.exam_id).await, expected);
    assert_eq!(ranks_in_order(&pool, &room_b, f.exam_id).await, expected);
}

#[tokio::test]
async fn recompute_keeps_rank_until_ranks_rerun() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    let math = subject(&pool, "MATH").await;
    let top = student_scoring(&pool, "top", f.year_id, f.classroom_id, f.exam_id, math, 90.0).await;
    let low = student_scoring(&pool, "low", f.year_id, f.classroom_id, f.exam_id, math, 60.0).await;
    results::recompute_all(&pool, f.exam_id).await.unwrap();
    results::recompute_ranks(&pool, f.exam_id).await.unwrap();

    sqlx::query("UPDATE marks SET marks_obtained = 99 WHERE enrollment_id = ?")
        .bind(low)
        .execute(&pool)
        .await
        .unwrap();
    let summary = results::recompute(&pool, low, f.exam_id).await.unwrap().unwrap();
    assert_eq!(summary.percentage, 99.0);
    assert_eq!(summary.class_rank, Some(2), "rank is stale until the rank pass");

    results::recompute_ranks(&pool, f.exam_id).await.unwrap();
    assert_eq!(ranks_in_order(&pool, &[low, top], f.exam_id).await, vec![Some(1), Some(2)]);
}

#[tokio::test]
async fn cgpa_is_weighted_by_exam() {
    let pool = test_pool().await;
    let year = academic_year(&pool, "2025-2026").await;
    let room = classroom(&pool, "9C", None).await;
    let exam_a = exam(&pool, year, "Term 1", 50.0).await;
    let exam_b = exam(&pool, year, "Term 2", 50.0).await;
    grade_scale(&pool, year, 90.0, 100.0, "A", 4.0).await;
    grade_scale(&pool, year, 70.0, 89.99, "B", 3.0).await;
    let math = subject(&pool, "MATH").await;

    let student = user(&pool, "dave", "student").await;
    let enrollment_id = enrollment(&pool, student, year, room, "ADM-9").await;

    assert_eq!(results::compute_cgpa(&pool, enrollment_id).await.unwrap(), 0.0);

    mark(&pool, enrollment_id, math, exam_a, 95.0, 100.0).await;
    mark(&pool, enrollment_id, math, exam_b, 75.0, 100.0).await;
    results::recompute(&pool, enrollment_id, exam_a).await.unwrap();
    results::recompute(&pool, enrollment_id, exam_b).await.unwrap();

    assert_eq!(results::compute_cgpa(&pool, enrollment_id).await.unwrap(), 3.5);

    sqlx::query("UPDATE exams SET weightage = 0")
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(results::compute_cgpa(&pool, enrollment_id).await.unwrap(), 0.0);
}

#[tokio::test]
async fn batch_recompute_covers_active_enrollments_only() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    let math = subject(&pool, "MATH").await;
    let graded = student_scoring(&pool, "eve", f.year_id, f.classroom_id, f.exam_id, math, 70.0).await;

    let no_marks_student = user(&pool, "frank", "student").await;
    let no_marks = enrollment(&pool, no_marks_student, f.year_id, f.classroom_id, "ADM-F").await;

    let inactive = student_scoring(&pool, "gina", f.year_id, f.classroom_id, f.exam_id, math, 50.0).await;
    sqlx::query("UPDATE enrollments SET is_active = 0 WHERE id = ?")
        .bind(inactive)
        .execute(&pool)
        .await
        .unwrap();

    let next_year = academic_year(&pool, "2026-2027").await;
    let other_room = classroom(&pool, "11A", None).await;
    let other_student = user(&pool, "hank", "student").await;
    enrollment(&pool, other_student, next_year, other_room, "ADM-H").await;

    let report = results::recompute_all(&pool, f.exam_id).await.unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 2);
    assert!(report.failures.is_empty());

    assert_eq!(summary_count(&pool, graded, f.exam_id).await, 1);
    assert_eq!(summary_count(&pool, no_marks, f.exam_id).await, 0);
    assert_eq!(summary_count(&pool, inactive, f.exam_id).await, 0);
}

#[tokio::test]
async fn batch_recompute_reports_failures_and_keeps_going() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    let math = subject(&pool, "MATH").await;
    let first = student_scoring(&pool, "nora", f.year_id, f.classroom_id, f.exam_id, math, 70.0).await;
    let broken = student_scoring(&pool, "otto", f.year_id, f.classroom_id, f.exam_id, math, 60.0).await;
    let last = student_scoring(&pool, "pia", f.year_id, f.classroom_id, f.exam_id, math, 50.0).await;

    sqlx::query(&format!(
        r#"
        CREATE TRIGGER reject_summary BEFORE INSERT ON result_summaries
        WHEN NEW.enrollment_id = {}
        BEGIN
            SELECT RAISE(ABORT, 'summary rejected');
        END
        "#,
        broken
    ))
    .execute(&pool)
    .await
    .unwrap();

    let report = results::recompute_all(&pool, f.exam_id).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded, 2);
    let failed: Vec<i64> = report.failures.iter().map(|f| f.enrollment_id).collect();
    assert_eq!(failed, vec![broken]);
    assert!(!report.failures[0].error.is_empty());

    assert_eq!(summary_count(&pool, first, f.exam_id).await, 1);
    assert_eq!(summary_count(&pool, broken, f.exam_id).await, 0);
    assert_eq!(summary_count(&pool, last, f.exam_id).await, 1);
}

#[tokio::test]
async fn grade_uses_unrounded_percentage_at_band_edge() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    grade_scale(&pool, f.year_id, 0.0, 80.0, "B", 3.0).await;
    grade_scale(&pool, f.year_id, 80.0, 100.0, "A", 4.0).await;

    let math = subject(&pool, "MATH").await;
    let student = user(&pool, "quinn", "student").await;
    let enrollment_id = enrollment(&pool, student, f.year_id, f.classroom_id, "ADM-Q").await;
    mark(&pool, enrollment_id, math, f.exam_id, 7999.6, 10000.0).await;

    let summary = results::recompute(&pool, enrollment_id, f.exam_id)
        .await
        .unwrap()
        .expect("summary should exist");

    // 79.996% is stored as 80 but only the B band covers it.
    assert_eq!(summary.percentage, 80.0);
    assert_eq!(summary.grade_letter.as_deref(), Some("B"));
    assert_eq!(summary.gpa_points, 3.0);
}

#[tokio::test]
async fn top_n_orders_by_percentage_across_classrooms() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    let other_room = classroom(&pool, "10B", None).await;
    let math = subject(&pool, "MATH").await;
    student_scoring(&pool, "ivy", f.year_id, f.classroom_id, f.exam_id, math, 72.0).await;
    student_scoring(&pool, "jack", f.year_id, other_room, f.exam_id, math, 91.0).await;
    student_scoring(&pool, "kim", f.year_id, f.classroom_id, f.exam_id, math, 85.5).await;
    student_scoring(&pool, "leo", f.year_id, other_room, f.exam_id, math, 60.0).await;
    results::recompute_all(&pool, f.exam_id).await.unwrap();
    results::recompute_ranks(&pool, f.exam_id).await.unwrap();

    let top = results::top_n(&pool, f.exam_id, 3).await.unwrap();
    let names: Vec<&str> = top.iter().map(|t| t.student.as_str()).collect();
    assert_eq!(names, vec!["jack", "kim", "ivy"]);
    assert_eq!(top[0].classroom, "10B");
    assert_eq!(top[0].rank, Some(1));
    assert_eq!(top[1].percentage, 85.5);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let pool = test_pool().await;
    let f = basic_fixture(&pool).await;
    let student = user(&pool, "mia", "student").await;
    let enrollment_id = enrollment(&pool, student, f.year_id, f.classroom_id, "ADM-M").await;

    assert!(matches!(
        results::recompute(&pool, enrollment_id, 9_999).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        results::recompute(&pool, 9_999, f.exam_id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        results::recompute_all(&pool, 9_999).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        results::recompute_ranks(&pool, 9_999).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        results::compute_cgpa(&pool, 9_999).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        results::top_n(&pool, 9_999, 3).await,
        Err(AppError::NotFound(_))
    ));
}
