// src/lib.rs

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod timer;
pub mod utils;

#[cfg(test)]
mod testing;

// Entry point used by main.rs and the API tests
pub use routes::create_router;
