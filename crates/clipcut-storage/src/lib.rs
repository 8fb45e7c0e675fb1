//! Per-project artifact storage.
//!
//! Owns the on-disk project tree: input files, cut clips, compiled
//! collections, and the stage artifacts that make every pipeline stage
//! independently re-runnable. All JSON writes are atomic (temp-then-rename)
//! and pretty-printed with two-space indentation, non-ASCII preserved.

pub mod error;
pub mod paths;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use paths::ProjectPaths;
pub use store::ArtifactStore;
