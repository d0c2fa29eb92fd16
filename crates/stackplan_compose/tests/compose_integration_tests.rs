//! End-to-end composition and synthesis of a full service stack.

use std::sync::Arc;

use stackplan_compose::{
    NetworkTopology, PasswordPolicy, SecretStore, ServiceBinder, ServiceSpec,
};
use stackplan_graph::{Attribute, DependencyGraph, Resource, ResourceKind};
use stackplan_synth::{StubProvider, Synthesizer};

const APP_PORT: u16 = 8080;

/// Compose the whole stack: network, groups, secret-backed database, load
/// balancer, registry-backed task definition and the bound service.
fn compose_stack() -> DependencyGraph {
    let mut graph = DependencyGraph::new();

    let topology = NetworkTopology::new("vpc", "10.0.0.0/16".parse().unwrap())
        .with_three_tier_rules("sg-elb", "sg-app", "sg-db", APP_PORT);
    let handles = topology.emit(&mut graph).unwrap();

    let mut secrets = SecretStore::new(PasswordPolicy {
        exclude_punctuation: true,
        ..Default::default()
    });
    let credential = secrets.generate(&mut graph, "db", "app_user").unwrap();

    graph
        .add_resource(
            Resource::new("db", ResourceKind::Database)
                .with_dependency(&handles.network)
                .with_dependency("sg-db")
                .with_config("engine", Attribute::literal("postgres"))
                .with_config("username", credential.username.clone())
                .with_config("password", credential.password.clone()),
        )
        .unwrap();
    graph
        .add_resource(
            Resource::new("alb", ResourceKind::LoadBalancer)
                .with_dependency(&handles.network)
                .with_dependency("sg-elb"),
        )
        .unwrap();
    graph
        .add_resource(
            Resource::new("tg", ResourceKind::TargetGroup)
                .with_dependency(&handles.network)
                .with_config("port", Attribute::literal(APP_PORT)),
        )
        .unwrap();
    graph
        .add_resource(
            Resource::new("listener", ResourceKind::Listener)
                .with_dependency("alb")
                .with_config("port", Attribute::literal(80))
                .with_config("target_group", Attribute::deferred("tg", "arn")),
        )
        .unwrap();
    graph
        .add_resource(Resource::new("registry", ResourceKind::ContainerRegistry))
        .unwrap();
    graph
        .add_resource(Resource::new("cluster", ResourceKind::Cluster))
        .unwrap();
    graph
        .add_resource(
            Resource::new("taskdef", ResourceKind::TaskDefinition)
                .with_config("container_port", Attribute::literal(APP_PORT))
                .with_config("image", Attribute::deferred("registry", "repository_url"))
                .with_config("db_host", Attribute::deferred("db", "endpoint"))
                .with_config("db_password", credential.password.clone()),
        )
        .unwrap();

    let spec = ServiceSpec::new("service", "cluster", "taskdef", "tg")
        .with_security_group("sg-app")
        .with_desired_count(2);
    ServiceBinder::new().bind(&mut graph, &spec).unwrap();

    graph
}

#[test]
fn test_stack_orders_network_first_and_attachment_last() {
    let graph = compose_stack();
    let order = graph.topological_order().unwrap();

    assert_eq!(order.first().map(String::as_str), Some("vpc"));
    assert_eq!(order.last().map(String::as_str), Some("service-attachment"));

    let pos = |id: &str| order.iter().position(|r| r == id).unwrap();
    assert!(pos("secret-db") < pos("db"));
    assert!(pos("db") < pos("taskdef"));
    assert!(pos("registry") < pos("taskdef"));
    for dep in ["cluster", "taskdef", "tg", "sg-app"] {
        assert!(pos(dep) < pos("service"));
    }
}

#[tokio::test]
async fn test_stack_synthesizes_with_consistent_password() {
    let graph = compose_stack();
    let synthesizer = Synthesizer::new(Arc::new(StubProvider::new()));

    let plan = synthesizer.synthesize(&graph).await.unwrap();

    let password = plan.outputs_of("secret-db").unwrap()["password"].clone();
    assert!(password.as_str().is_some());

    // The same generated password flows to every consumer, and repeated
    // lookups within the run see the same value.
    assert_eq!(plan.resources["db"].resolved_config["password"], password);
    assert_eq!(
        plan.resources["taskdef"].resolved_config["db_password"],
        password
    );
    assert_eq!(
        plan.outputs_of("secret-db").unwrap()["password"],
        password
    );
}

#[tokio::test]
async fn test_stack_wires_image_and_database_endpoint() {
    let graph = compose_stack();
    let synthesizer = Synthesizer::new(Arc::new(StubProvider::new()));

    let plan = synthesizer.synthesize(&graph).await.unwrap();

    let taskdef = &plan.resources["taskdef"];
    assert_eq!(
        taskdef.resolved_config["image"],
        serde_json::json!("registry.internal/registry")
    );
    assert_eq!(
        taskdef.resolved_config["db_host"],
        serde_json::json!("db.db.internal")
    );

    let listener = &plan.resources["listener"];
    assert_eq!(
        listener.resolved_config["target_group"],
        serde_json::json!("arn:stub:target_group/tg")
    );
}
