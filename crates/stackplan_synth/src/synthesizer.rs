//! Synthesis walk: materialize a graph against a provider.
//!
//! Resources are processed strictly in the order produced by
//! [`DependencyGraph::topological_order`], one at a time. Each step
//! resolves the resource's deferred attributes from already-recorded
//! outputs, invokes the provider's create under the retry policy, and
//! records the outputs in the plan. A resource is never revisited: this is
//! a create-only run, and nothing is rolled back on failure. Cleanup is
//! the explicit reverse-order [`Synthesizer::destroy`] pass.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use stackplan_graph::{Attribute, DependencyGraph, Resource, ResourceKind};

use crate::error::{SynthError, SynthResult};
use crate::provider::{Outputs, Provider, ResolvedConfig, RetryPolicy};
use crate::state::PlanState;

/// Walks an ordered graph and materializes each resource.
pub struct Synthesizer {
    provider: Arc<dyn Provider>,
    retry: RetryPolicy,
}

impl Synthesizer {
    /// Create a synthesizer with the default retry policy.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Synthesize every resource in the graph, in dependency order.
    ///
    /// Graph-construction errors (duplicate ids were rejected earlier;
    /// unknown references and cycles surface here) are fatal before any
    /// provider call is made. A provider failure mid-run halts the walk
    /// and leaves already-created resources in place; the returned error
    /// names the offending resource and everything created before it.
    pub async fn synthesize(&self, graph: &DependencyGraph) -> SynthResult<PlanState> {
        let order = graph.topological_order()?;
        let mut plan = PlanState::new();

        info!("Starting synthesis of {} resources", order.len());

        for (index, id) in order.iter().enumerate() {
            let resource = graph.get_required(id)?;
            let config = self.resolve_config(resource, &plan)?;

            info!(
                "Synthesizing resource [{}/{}]: {} ({})",
                index + 1,
                order.len(),
                id,
                resource.kind
            );

            let outputs = self
                .create_with_retry(resource.kind, id, &config, &plan)
                .await?;
            plan.record(id, resource.kind, config, outputs);
        }

        plan.completed_at = Some(Utc::now());
        info!("Synthesis completed: {} resources created", plan.len());
        Ok(plan)
    }

    /// Destroy every resource in a persisted plan, in reverse creation
    /// order. Returns the refs destroyed.
    pub async fn destroy(&self, plan: &PlanState) -> SynthResult<Vec<String>> {
        let order = plan.destroy_order();
        let mut destroyed = Vec::with_capacity(order.len());

        info!("Starting teardown of {} resources", order.len());

        for id in &order {
            let record = plan
                .resources
                .get(id)
                .ok_or_else(|| SynthError::UnknownPlanResource(id.clone()))?;
            self.destroy_with_retry(record.kind, id, &destroyed).await?;
            destroyed.push(id.clone());
        }

        info!("Teardown completed: {} resources destroyed", destroyed.len());
        Ok(destroyed)
    }

    /// Resolve every deferred attribute in a resource's config against the
    /// outputs recorded so far.
    ///
    /// Ordering guarantees every source ran first, so a miss here is a
    /// graph-construction bug (or a source that does not expose the
    /// requested field), not a runtime race.
    fn resolve_config(&self, resource: &Resource, plan: &PlanState) -> SynthResult<ResolvedConfig> {
        let mut resolved = ResolvedConfig::new();
        for (key, attribute) in &resource.config {
            let value = match attribute {
                Attribute::Literal { value } => value.clone(),
                Attribute::Deferred { source, field } => plan
                    .outputs_of(source)
                    .and_then(|outputs| outputs.get(field))
                    .cloned()
                    .ok_or_else(|| SynthError::UnresolvedDependency {
                        resource: resource.id.clone(),
                        source: source.clone(),
                        field: field.clone(),
                        completed: plan.order.clone(),
                    })?,
            };
            resolved.insert(key.clone(), value);
        }
        Ok(resolved)
    }

    async fn create_with_retry(
        &self,
        kind: ResourceKind,
        id: &str,
        config: &ResolvedConfig,
        plan: &PlanState,
    ) -> SynthResult<Outputs> {
        let mut attempt = 1;
        loop {
            match self.provider.create(kind, id, config).await {
                Ok(outputs) => return Ok(outputs),
                Err(error) if error.is_transient() && attempt < self.retry.max_attempts => {
                    warn!(
                        "Transient provider error for '{}' (attempt {}/{}): {}",
                        id, attempt, self.retry.max_attempts, error
                    );
                    tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(SynthError::Provider {
                        resource: id.to_string(),
                        completed: plan.order.clone(),
                        source: error,
                    });
                }
            }
        }
    }

    async fn destroy_with_retry(
        &self,
        kind: ResourceKind,
        id: &str,
        destroyed: &[String],
    ) -> SynthResult<()> {
        let mut attempt = 1;
        loop {
            match self.provider.destroy(kind, id).await {
                Ok(()) => return Ok(()),
                Err(error) if error.is_transient() && attempt < self.retry.max_attempts => {
                    warn!(
                        "Transient provider error destroying '{}' (attempt {}/{}): {}",
                        id, attempt, self.retry.max_attempts, error
                    );
                    tokio::time::sleep(self.retry.backoff_for(attempt)).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(SynthError::Provider {
                        resource: id.to_string(),
                        completed: destroyed.to_vec(),
                        source: error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::stub::StubProvider;
    use serde_json::json;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_deferred_attributes_resolve_from_outputs() {
        let mut graph = DependencyGraph::new();
        graph
            .add_resource(Resource::new("db", ResourceKind::Database))
            .unwrap();
        graph
            .add_resource(
                Resource::new("service", ResourceKind::Service)
                    .with_config("db_host", Attribute::deferred("db", "endpoint"))
                    .with_config("db_port", Attribute::deferred("db", "port")),
            )
            .unwrap();

        let synthesizer = Synthesizer::new(Arc::new(StubProvider::new()));
        let plan = synthesizer.synthesize(&graph).await.unwrap();

        let record = &plan.resources["service"];
        assert_eq!(record.resolved_config["db_host"], json!("db.db.internal"));
        assert_eq!(record.resolved_config["db_port"], json!(5432));
    }

    #[tokio::test]
    async fn test_missing_output_field_is_unresolved_dependency() {
        let mut graph = DependencyGraph::new();
        graph
            .add_resource(Resource::new("db", ResourceKind::Database))
            .unwrap();
        graph
            .add_resource(
                Resource::new("service", ResourceKind::Service)
                    .with_config("nope", Attribute::deferred("db", "no_such_output")),
            )
            .unwrap();

        let synthesizer = Synthesizer::new(Arc::new(StubProvider::new()));
        match synthesizer.synthesize(&graph).await.unwrap_err() {
            SynthError::UnresolvedDependency {
                resource,
                source,
                field,
                completed,
            } => {
                assert_eq!(resource, "service");
                assert_eq!(source, "db");
                assert_eq!(field, "no_such_output");
                assert_eq!(completed, vec!["db"]);
            }
            other => panic!("expected unresolved dependency, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_permanent_error_halts_immediately() {
        let mut graph = DependencyGraph::new();
        graph
            .add_resource(Resource::new("vpc", ResourceKind::Network))
            .unwrap();
        graph
            .add_resource(Resource::new("db", ResourceKind::Database).with_dependency("vpc"))
            .unwrap();
        graph
            .add_resource(Resource::new("alb", ResourceKind::LoadBalancer).with_dependency("db"))
            .unwrap();

        let stub = StubProvider::new().fail_once(
            "db",
            ProviderError::Permanent("invalid engine version".into()),
        );
        let synthesizer = Synthesizer::new(Arc::new(stub.clone())).with_retry(fast_retry());

        match synthesizer.synthesize(&graph).await.unwrap_err() {
            SynthError::Provider {
                resource,
                completed,
                source,
            } => {
                assert_eq!(resource, "db");
                assert_eq!(completed, vec!["vpc"]);
                assert!(!source.is_transient());
            }
            other => panic!("expected provider error, got {other:?}"),
        }
        // Prior resources stay in place; the failing one was tried once.
        assert_eq!(stub.created_ids(), vec!["vpc"]);
        assert_eq!(stub.attempt_count("db"), 1);
    }

    #[tokio::test]
    async fn test_exhausted_transient_retries_are_fatal() {
        let mut graph = DependencyGraph::new();
        graph
            .add_resource(Resource::new("vpc", ResourceKind::Network))
            .unwrap();

        let stub = StubProvider::new().fail_times(
            "vpc",
            ProviderError::Transient("timeout".into()),
            3,
        );
        let synthesizer = Synthesizer::new(Arc::new(stub.clone())).with_retry(fast_retry());

        let err = synthesizer.synthesize(&graph).await.unwrap_err();
        assert!(matches!(err, SynthError::Provider { .. }));
        assert_eq!(stub.attempt_count("vpc"), 3);
    }

    #[tokio::test]
    async fn test_destroy_walks_reverse_order() {
        let mut graph = DependencyGraph::new();
        graph
            .add_resource(Resource::new("vpc", ResourceKind::Network))
            .unwrap();
        graph
            .add_resource(Resource::new("db", ResourceKind::Database).with_dependency("vpc"))
            .unwrap();

        let stub = StubProvider::new();
        let synthesizer = Synthesizer::new(Arc::new(stub.clone()));
        let plan = synthesizer.synthesize(&graph).await.unwrap();

        let destroyed = synthesizer.destroy(&plan).await.unwrap();
        assert_eq!(destroyed, vec!["db", "vpc"]);
        assert_eq!(stub.destroyed_refs(), vec!["db", "vpc"]);
    }
}
