//! Service wiring.
//!
//! The [`ServiceBinder`] is the highest-level composition step: it
//! declares a Service resource depending on its cluster, task definition,
//! target group and security groups, and a separate attachment resource
//! joining the service to the target group. Keeping the attachment as its
//! own resource keeps the dependency graph explicit instead of burying
//! the step inside service creation.

use tracing::debug;

use stackplan_graph::{Attribute, DependencyGraph, Resource, ResourceKind};

use crate::error::{ComposeError, ComposeResult};

/// Inputs for binding a service.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub id: String,
    pub cluster: String,
    pub task_definition: String,
    pub target_group: String,
    pub security_groups: Vec<String>,
    pub desired_count: u32,
}

impl ServiceSpec {
    pub fn new(
        id: impl Into<String>,
        cluster: impl Into<String>,
        task_definition: impl Into<String>,
        target_group: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            cluster: cluster.into(),
            task_definition: task_definition.into(),
            target_group: target_group.into(),
            security_groups: Vec::new(),
            desired_count: 1,
        }
    }

    pub fn with_security_group(mut self, group: impl Into<String>) -> Self {
        self.security_groups.push(group.into());
        self
    }

    pub fn with_desired_count(mut self, count: u32) -> Self {
        self.desired_count = count;
        self
    }
}

/// Ids of the resources a bind declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBinding {
    pub service: String,
    pub attachment: String,
}

/// Wires a compute service to its target group and task definition.
#[derive(Debug, Default)]
pub struct ServiceBinder;

impl ServiceBinder {
    pub fn new() -> Self {
        Self
    }

    /// Declare the service and its target-group attachment.
    ///
    /// All four inputs must already be declared in the graph. Fails with
    /// [`ComposeError::IncompatiblePort`] if the task definition's
    /// container port does not match the target group's port.
    pub fn bind(
        &self,
        graph: &mut DependencyGraph,
        spec: &ServiceSpec,
    ) -> ComposeResult<ServiceBinding> {
        for id in [&spec.cluster, &spec.task_definition, &spec.target_group] {
            graph.get_required(id)?;
        }
        for group in &spec.security_groups {
            graph.get_required(group)?;
        }

        let container_port = literal_port(graph, &spec.task_definition, "container_port")?;
        let target_group_port = literal_port(graph, &spec.target_group, "port")?;
        if container_port != target_group_port {
            return Err(ComposeError::IncompatiblePort {
                container_port,
                target_group_port,
            });
        }

        let service = Resource::new(&spec.id, ResourceKind::Service)
            .with_dependency(&spec.cluster)
            .with_dependency(&spec.task_definition)
            .with_dependency(&spec.target_group)
            .with_dependencies(spec.security_groups.iter().cloned())
            .with_config("cluster", Attribute::deferred(&spec.cluster, "arn"))
            .with_config(
                "task_definition",
                Attribute::deferred(&spec.task_definition, "arn"),
            )
            .with_config("desired_count", Attribute::literal(spec.desired_count))
            .with_config(
                "security_groups",
                Attribute::literal(spec.security_groups.clone()),
            );
        graph.add_resource(service)?;

        let attachment_id = format!("{}-attachment", spec.id);
        let attachment = Resource::new(&attachment_id, ResourceKind::TargetGroupAttachment)
            .with_dependency(&spec.id)
            .with_dependency(&spec.target_group)
            .with_config("service", Attribute::deferred(&spec.id, "arn"))
            .with_config(
                "target_group",
                Attribute::deferred(&spec.target_group, "arn"),
            );
        graph.add_resource(attachment)?;

        debug!(
            "Bound service '{}' to target group '{}' on port {}",
            spec.id, spec.target_group, container_port
        );

        Ok(ServiceBinding {
            service: spec.id.clone(),
            attachment: attachment_id,
        })
    }
}

/// Read a literal port from a declared resource's config.
fn literal_port(graph: &DependencyGraph, id: &str, key: &str) -> ComposeResult<u16> {
    graph
        .get_required(id)?
        .attribute(key)
        .and_then(Attribute::as_u16)
        .ok_or_else(|| ComposeError::MissingConfig {
            resource: id.to_string(),
            key: key.to_string(),
        })
}
