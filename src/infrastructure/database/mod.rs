//! Postgres-backed persistence: row models and repository implementations.

pub mod models;
pub mod repositories;
