// src/handlers/mod.rs

pub mod academics;
pub mod admin;
pub mod auth;
pub mod enrollments;
pub mod marks;
pub mod results;
pub mod school;
