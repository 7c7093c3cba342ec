//! Database access
//!
//! Row structs mirror table columns and convert into the shared API models.
//! Queries are plain `sqlx::query` / `query_as` with runtime binding.

pub mod events;
pub mod orders;
pub mod users;
