//! Declared infrastructure resources.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;

/// The kind of infrastructure a resource declares.
///
/// Kinds are a closed set: the model covers exactly the resources needed
/// for a networked container service behind a load balancer with a managed
/// relational database. New kinds are supported by teaching the provider a
/// new create function, not by subclassing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    Subnet,
    SecurityGroup,
    Database,
    LoadBalancer,
    Listener,
    TargetGroup,
    TargetGroupAttachment,
    ContainerRegistry,
    Cluster,
    TaskDefinition,
    Service,
    Secret,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::SecurityGroup => "security_group",
            ResourceKind::Database => "database",
            ResourceKind::LoadBalancer => "load_balancer",
            ResourceKind::Listener => "listener",
            ResourceKind::TargetGroup => "target_group",
            ResourceKind::TargetGroupAttachment => "target_group_attachment",
            ResourceKind::ContainerRegistry => "container_registry",
            ResourceKind::Cluster => "cluster",
            ResourceKind::TaskDefinition => "task_definition",
            ResourceKind::Service => "service",
            ResourceKind::Secret => "secret",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "network" => Some(ResourceKind::Network),
            "subnet" => Some(ResourceKind::Subnet),
            "security_group" => Some(ResourceKind::SecurityGroup),
            "database" => Some(ResourceKind::Database),
            "load_balancer" => Some(ResourceKind::LoadBalancer),
            "listener" => Some(ResourceKind::Listener),
            "target_group" => Some(ResourceKind::TargetGroup),
            "target_group_attachment" => Some(ResourceKind::TargetGroupAttachment),
            "container_registry" => Some(ResourceKind::ContainerRegistry),
            "cluster" => Some(ResourceKind::Cluster),
            "task_definition" => Some(ResourceKind::TaskDefinition),
            "service" => Some(ResourceKind::Service),
            "secret" => Some(ResourceKind::Secret),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, typed unit of infrastructure with configuration and
/// declared dependencies.
///
/// The config may contain unresolved [`Attribute::Deferred`] values until
/// synthesis of the corresponding source resources completes. Every
/// deferred attribute also induces an implicit dependency edge when the
/// graph is ordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Unique id within one graph.
    pub id: String,
    /// Resource kind, immutable after creation.
    pub kind: ResourceKind,
    /// Configuration values, literal or deferred.
    pub config: BTreeMap<String, Attribute>,
    /// Explicitly declared dependencies (resource ids).
    pub depends_on: BTreeSet<String>,
}

impl Resource {
    /// Create a new resource with an empty config and no dependencies.
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            config: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Add a configuration attribute.
    pub fn with_config(mut self, key: impl Into<String>, attribute: Attribute) -> Self {
        self.config.insert(key.into(), attribute);
        self
    }

    /// Add an explicit dependency.
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    /// Add multiple explicit dependencies.
    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Source resource ids of every deferred attribute in the config.
    pub fn deferred_sources(&self) -> BTreeSet<&str> {
        self.config
            .values()
            .filter_map(|attr| attr.source())
            .collect()
    }

    /// Get a configuration attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.config.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_builder() {
        let resource = Resource::new("db", ResourceKind::Database)
            .with_config("engine", Attribute::literal("postgres"))
            .with_config("password", Attribute::deferred("secret-db", "password"))
            .with_dependency("vpc");

        assert_eq!(resource.id, "db");
        assert_eq!(resource.kind, ResourceKind::Database);
        assert_eq!(resource.config.len(), 2);
        assert!(resource.depends_on.contains("vpc"));
    }

    #[test]
    fn test_deferred_sources() {
        let resource = Resource::new("service", ResourceKind::Service)
            .with_config("image", Attribute::deferred("registry", "repository_url"))
            .with_config("db_host", Attribute::deferred("db", "endpoint"))
            .with_config("desired_count", Attribute::literal(2));

        let sources = resource.deferred_sources();
        assert_eq!(sources.len(), 2);
        assert!(sources.contains("registry"));
        assert!(sources.contains("db"));
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ResourceKind::Network,
            ResourceKind::TargetGroupAttachment,
            ResourceKind::Secret,
        ] {
            assert_eq!(ResourceKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::from_str("warehouse"), None);
    }
}
