//! # stackplan_compose
//!
//! Network topology, secrets and service wiring for stackplan.
//!
//! This crate composes higher-level infrastructure shapes out of the flat
//! resource model: a three-tier network with security-group reachability
//! rules, credentials whose passwords are materialized by reference at
//! synthesis time, and the service-to-target-group binding that completes
//! a deployable graph.
//!
//! # Architecture
//!
//! - **NetworkTopology**: pure builder emitting network, subnet and
//!   security-group declarations
//! - **SecretStore**: declares secret resources and hands out credentials
//!   with deferred passwords
//! - **ServiceBinder**: wires a service to its cluster, task definition
//!   and target group, attachment included
//!
//! # Example
//!
//! ```rust
//! use stackplan_compose::NetworkTopology;
//! use stackplan_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! let handles = NetworkTopology::new("vpc", "10.0.0.0/16".parse().unwrap())
//!     .with_three_tier_rules("sg-elb", "sg-app", "sg-db", 8080)
//!     .emit(&mut graph)
//!     .unwrap();
//! assert_eq!(handles.groups.len(), 3);
//! ```

pub mod binder;
pub mod error;
pub mod secrets;
pub mod topology;

pub use binder::{ServiceBinder, ServiceBinding, ServiceSpec};
pub use error::{ComposeError, ComposeResult};
pub use secrets::{Credential, PasswordPolicy, SecretStore, MIN_ENTROPY_BITS};
pub use topology::{
    AddressBlock, NetworkTopology, Protocol, RulePeer, SecurityRule, SubnetTier, TopologyHandles,
};
