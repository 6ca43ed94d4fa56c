//! Teammate: colleague recommendations for meetings and project roles
//!
//! Combines three signals to suggest employees for each requested role or name:
//! geographic distance and meeting co-attendance, both precomputed as pairwise
//! matrices, and semantic similarity between the request and employee profiles.
//!
//! This library provides the batch matrix builders, the runtime recommendation
//! pipeline, and a file-backed store for their inputs and artifacts.

pub mod availability;
pub mod constants;
pub mod matrix;
pub mod models;
pub mod pipeline;
pub mod ranking;
pub mod resolve;
pub mod scoring;
pub mod search;
pub mod storage;

// Re-export main types for convenience
pub use matrix::{CollaborationMatrix, DistanceMatrix};
pub use models::{
    Employee, EmployeeId, Meeting, Outcome, Preference, RecommendationRequest,
    RecommendationResponse, StaffingStorage, TimeWindow,
};
pub use pipeline::{RecommendError, RecommendationEngine, RecommenderConfig};
pub use ranking::DistanceOrder;
pub use search::{EmployeeIndex, SearchEngine, SemanticMatch, SemanticMatcher};
pub use storage::{FileStorage, StorageError};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
