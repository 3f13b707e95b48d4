// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{academics, admin, auth, enrollments, marks, results, school},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * `/api/auth` is public.
/// * Read routes need a login; what they return is narrowed by the caller's scope.
/// * Mark writes need a teacher or admin; everything under `/api/admin` needs an admin.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let read_routes = Router::new()
        .route("/academic-years", get(academics::list_academic_years))
        .route("/exams", get(academics::list_exams))
        .route("/grade-scales", get(academics::list_grade_scales))
        .route("/assessment-types", get(academics::list_assessment_types))
        .route("/classrooms", get(school::list_classrooms))
        .route("/subjects", get(school::list_subjects))
        .route("/enrollments", get(enrollments::list_enrollments))
        .route("/enrollments/{id}/cgpa", get(results::enrollment_cgpa))
        .route("/marks", get(marks::list_marks))
        .route("/results", get(results::list_results))
        .route("/results/me", get(results::my_results))
        .layer(auth_layer.clone());

    // Staff writes; each one triggers the result recompute for its pair.
    let mark_routes = Router::new()
        .route("/marks", post(marks::create_mark))
        .route("/marks/{id}", put(marks::update_mark).delete(marks::delete_mark))
        .layer(middleware::from_fn(staff_middleware))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/academic-years", post(academics::create_academic_year))
        .route("/exams", post(academics::create_exam))
        .route("/exams/{id}", delete(academics::delete_exam))
        .route("/exams/{id}/recompute", post(results::recompute_exam))
        .route("/exams/{id}/ranks", post(results::recompute_exam_ranks))
        .route("/exams/{id}/top", get(results::top_results))
        .route("/grade-scales", post(academics::create_grade_scale))
        .route("/grade-scales/{id}", delete(academics::delete_grade_scale))
        .route("/assessment-types", post(academics::create_assessment_type))
        .route("/classrooms", post(school::create_classroom))
        .route("/subjects", post(school::create_subject))
        .route("/enrollments", post(enrollments::create_enrollment))
        .route("/enrollments/{id}", delete(enrollments::delete_enrollment))
        .route("/results/recompute", post(results::recompute_one))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", read_routes.merge(mark_routes))
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
