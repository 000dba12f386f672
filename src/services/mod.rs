// src/services/mod.rs

pub mod identity;
pub mod lifecycle;
pub mod quizzes;
pub mod scoring;
pub mod stats;
