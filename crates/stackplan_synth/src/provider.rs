//! Provider contract for resource materialization.
//!
//! The synthesis engine depends only on this narrow create/destroy
//! contract, never on any specific cloud's full API surface. A provider
//! receives a fully resolved configuration (no deferred attributes left)
//! and returns the outputs the created resource exposes to its dependents.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use stackplan_graph::ResourceKind;

/// A resource configuration with every deferred attribute resolved.
pub type ResolvedConfig = HashMap<String, serde_json::Value>;

/// Outputs a created resource exposes, keyed by field name.
pub type Outputs = HashMap<String, serde_json::Value>;

/// Errors a provider can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transient failure (network timeout, rate limit); eligible for a
    /// bounded retry.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Permanent failure (config rejected by the provider); never retried.
    #[error("permanent provider error: {0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Narrow contract every provider implements.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Materialize one resource and return its outputs.
    ///
    /// Creates are assumed non-idempotent: a failed create may have
    /// partially succeeded on the provider side.
    async fn create(
        &self,
        kind: ResourceKind,
        id: &str,
        config: &ResolvedConfig,
    ) -> Result<Outputs, ProviderError>;

    /// Tear down one previously created resource.
    async fn destroy(&self, kind: ResourceKind, resource_ref: &str) -> Result<(), ProviderError>;
}

/// Bounded retry policy for transient provider failures.
///
/// Applies to the single failing resource only; permanent failures are
/// surfaced immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per resource, including the first.
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each subsequent one.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts,
            base_backoff,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
        }
    }

    /// Backoff to apply after the given 1-based failed attempt.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}
