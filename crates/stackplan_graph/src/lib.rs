//! # stackplan_graph
//!
//! Resource model and dependency graph for stackplan.
//!
//! This crate provides the pure data side of provisioning: declared
//! resources with literal-or-deferred configuration attributes, and the
//! dependency graph that orders them for synthesis.
//!
//! # Architecture
//!
//! - **Attribute**: a config value, literal or deferred until its source
//!   resource is synthesized
//! - **Resource**: a named, typed node with configuration and dependencies
//! - **DependencyGraph**: owns all resources for one run, derives edges
//!   (explicit and attribute-induced), and produces a deterministic
//!   topological order
//!
//! # Example
//!
//! ```rust
//! use stackplan_graph::{Attribute, DependencyGraph, Resource, ResourceKind};
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_resource(Resource::new("vpc", ResourceKind::Network)).unwrap();
//! graph.add_resource(
//!     Resource::new("db", ResourceKind::Database)
//!         .with_dependency("vpc")
//!         .with_config("password", Attribute::deferred("secret-db", "password")),
//! ).unwrap();
//! graph.add_resource(Resource::new("secret-db", ResourceKind::Secret)).unwrap();
//!
//! let order = graph.topological_order().unwrap();
//! assert_eq!(order.last().map(String::as_str), Some("db"));
//! ```

pub mod attribute;
pub mod error;
pub mod graph;
pub mod resource;

pub use attribute::Attribute;
pub use error::{GraphError, GraphResult};
pub use graph::DependencyGraph;
pub use resource::{Resource, ResourceKind};
