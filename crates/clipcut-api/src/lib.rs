//! Thin HTTP/JSON surface over the clip extraction pipeline.
//!
//! The API ingests video + subtitle uploads, starts and retries pipeline
//! runs, exposes the progress projection, and serves the produced clip and
//! collection files.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
