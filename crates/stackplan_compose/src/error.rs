//! Error types for composition.

use thiserror::Error;

/// Result type alias for composition operations.
pub type ComposeResult<T> = Result<T, ComposeError>;

/// Errors that can occur while composing topology, secrets or services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("invalid CIDR block: {0}")]
    InvalidCidr(String),

    #[error("security rule references undeclared group: {0}")]
    UnknownGroup(String),

    #[error("password policy violation: {0}")]
    PolicyViolation(String),

    #[error(
        "container port {container_port} does not match target group port {target_group_port}"
    )]
    IncompatiblePort {
        container_port: u16,
        target_group_port: u16,
    },

    #[error("resource '{resource}' is missing required config key '{key}'")]
    MissingConfig { resource: String, key: String },

    #[error("graph error: {0}")]
    Graph(#[from] stackplan_graph::GraphError),
}
