//! Integration tests for the synthesis engine.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;

use stackplan_graph::{Attribute, DependencyGraph, Resource, ResourceKind};
use stackplan_synth::{PlanState, ProviderError, RetryPolicy, StubProvider, Synthesizer};

/// A small service stack wired together with deferred attributes.
fn service_stack() -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    graph
        .add_resource(
            Resource::new("vpc", ResourceKind::Network)
                .with_config("cidr", Attribute::literal("10.0.0.0/16")),
        )
        .unwrap();
    graph
        .add_resource(Resource::new("registry", ResourceKind::ContainerRegistry))
        .unwrap();
    graph
        .add_resource(
            Resource::new("db", ResourceKind::Database)
                .with_dependency("vpc")
                .with_config("engine", Attribute::literal("postgres")),
        )
        .unwrap();
    graph
        .add_resource(
            Resource::new("taskdef", ResourceKind::TaskDefinition)
                .with_config("image", Attribute::deferred("registry", "repository_url"))
                .with_config("db_host", Attribute::deferred("db", "endpoint")),
        )
        .unwrap();
    graph
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

#[tokio::test]
async fn test_full_stack_resolves_in_order() {
    let stub = StubProvider::new();
    let synthesizer = Synthesizer::new(Arc::new(stub.clone()));

    let plan = synthesizer.synthesize(&service_stack()).await.unwrap();

    assert_eq!(plan.len(), 4);
    assert_eq!(plan.order.first().map(String::as_str), Some("vpc"));
    assert_eq!(plan.order.last().map(String::as_str), Some("taskdef"));

    let taskdef = &plan.resources["taskdef"];
    assert_eq!(
        taskdef.resolved_config["image"],
        json!("registry.internal/registry")
    );
    assert_eq!(taskdef.resolved_config["db_host"], json!("db.db.internal"));
}

#[tokio::test]
async fn test_synthesis_is_deterministic() {
    let stub = Arc::new(StubProvider::new());

    let first = Synthesizer::new(stub.clone())
        .synthesize(&service_stack())
        .await
        .unwrap();
    let second = Synthesizer::new(stub)
        .synthesize(&service_stack())
        .await
        .unwrap();

    assert_eq!(first.order, second.order);
    for id in &first.order {
        assert_eq!(first.resources[id], second.resources[id]);
    }
}

#[tokio::test]
async fn test_transient_failures_retry_then_succeed() {
    let stub = StubProvider::new().fail_times(
        "db",
        ProviderError::Transient("rate limited".into()),
        2,
    );
    let synthesizer = Synthesizer::new(Arc::new(stub.clone())).with_retry(fast_retry());

    let plan = synthesizer.synthesize(&service_stack()).await.unwrap();

    // Two transient failures, success on the third call.
    assert_eq!(stub.attempt_count("db"), 3);
    assert_eq!(stub.attempt_count("vpc"), 1);
    assert_eq!(plan.len(), 4);
}

#[tokio::test]
async fn test_plan_persists_and_drives_teardown() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plan.json");

    let stub = StubProvider::new();
    let synthesizer = Synthesizer::new(Arc::new(stub.clone()));

    let plan = synthesizer.synthesize(&service_stack()).await.unwrap();
    plan.save(&path).unwrap();

    let loaded = PlanState::load(&path).unwrap();
    let destroyed = synthesizer.destroy(&loaded).await.unwrap();

    let mut expected = plan.order.clone();
    expected.reverse();
    assert_eq!(destroyed, expected);
    assert_eq!(stub.destroyed_refs(), expected);
}
