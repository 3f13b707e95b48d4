// src/services/mod.rs
//
// Grading engine. Everything here works on ids and the pool only; access
// control stays in the handlers.

pub mod aggregate;
pub mod cgpa;
pub mod grading;
pub mod ranking;
pub mod results;

/// Rounds to 2 decimal places, the precision percentages and CGPA are stored with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
