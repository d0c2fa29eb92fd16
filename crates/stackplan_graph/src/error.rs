//! Error types for graph construction and ordering.

use thiserror::Error;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while building or ordering a dependency graph.
///
/// All of these are construction-time failures: synthesis never starts
/// against a graph that produced one of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate resource id: {0}")]
    DuplicateId(String),

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),
}
