//! Error types for synthesis.

use std::fmt;

use crate::provider::ProviderError;

/// Result type alias for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Errors that can occur during a synthesis or destroy run.
///
/// Fatal errors carry the offending resource id and the ids already
/// materialized before the failure, so the caller can run a manual or
/// scripted cleanup of the partial stack.
//
// `Display`/`Error` are implemented by hand: thiserror's derive treats any
// field named `source` as the error source, but `UnresolvedDependency.source`
// is the id of the source resource (a `String`), not an error.
#[derive(Debug)]
pub enum SynthError {
    Graph(stackplan_graph::GraphError),

    UnresolvedDependency {
        resource: String,
        source: String,
        field: String,
        completed: Vec<String>,
    },

    Provider {
        resource: String,
        completed: Vec<String>,
        source: ProviderError,
    },

    UnknownPlanResource(String),

    Io(std::io::Error),

    Serialization(String),
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::Graph(err) => write!(f, "graph error: {err}"),
            SynthError::UnresolvedDependency {
                resource,
                source,
                field,
                completed,
            } => write!(
                f,
                "unresolved dependency for resource '{resource}': output '{field}' of '{source}' is not available (synthesized so far: {})",
                completed.join(", ")
            ),
            SynthError::Provider {
                resource,
                completed,
                source,
            } => write!(
                f,
                "provider failed for resource '{resource}' (synthesized so far: {}): {source}",
                completed.join(", ")
            ),
            SynthError::UnknownPlanResource(id) => {
                write!(f, "plan does not contain resource: {id}")
            }
            SynthError::Io(err) => write!(f, "IO error: {err}"),
            SynthError::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for SynthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynthError::Graph(err) => Some(err),
            SynthError::Provider { source, .. } => Some(source),
            SynthError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<stackplan_graph::GraphError> for SynthError {
    fn from(err: stackplan_graph::GraphError) -> Self {
        SynthError::Graph(err)
    }
}

impl From<std::io::Error> for SynthError {
    fn from(err: std::io::Error) -> Self {
        SynthError::Io(err)
    }
}

impl SynthError {
    /// Resource ids already materialized before this error, if the error
    /// occurred mid-run.
    pub fn completed(&self) -> &[String] {
        match self {
            SynthError::UnresolvedDependency { completed, .. }
            | SynthError::Provider { completed, .. } => completed,
            _ => &[],
        }
    }
}
