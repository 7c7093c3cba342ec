//! Shared types for the Stagepass platform
//!
//! Domain models, the unified error system, and small utilities used by
//! the cloud service crate.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};
