// src/models/mod.rs

pub mod academic;
pub mod enrollment;
pub mod mark;
pub mod result;
pub mod school;
pub mod user;
