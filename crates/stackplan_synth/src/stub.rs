//! Deterministic in-memory provider.
//!
//! Provides a configurable [`Provider`] implementation for planning and
//! tests without touching a real cloud. Outputs are pure functions of the
//! resource id and config, so synthesizing the same graph twice yields the
//! same resolved-output map. Secret passwords are the one generated value:
//! they are sampled once per resource id and cached, never regenerated.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use serde_json::json;

use stackplan_graph::ResourceKind;

use crate::provider::{Outputs, Provider, ProviderError, ResolvedConfig};

const DEFAULT_CHARSET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// In-memory provider that records calls and returns canned outputs.
#[derive(Clone, Default)]
pub struct StubProvider {
    /// Scripted failures per resource id, consumed one per attempt.
    failures: Arc<RwLock<HashMap<String, VecDeque<ProviderError>>>>,
    /// Create attempts per resource id.
    attempts: Arc<RwLock<HashMap<String, usize>>>,
    /// Successfully created ids, in call order.
    created: Arc<RwLock<Vec<String>>>,
    /// Destroyed refs, in call order.
    destroyed: Arc<RwLock<Vec<String>>>,
    /// Materialized secret passwords, generated once per resource id.
    secrets: Arc<RwLock<HashMap<String, String>>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure for the next create attempt on `id`.
    pub fn fail_once(self, id: impl Into<String>, error: ProviderError) -> Self {
        self.failures
            .write()
            .entry(id.into())
            .or_default()
            .push_back(error);
        self
    }

    /// Script the same failure for the next `count` create attempts on `id`.
    pub fn fail_times(self, id: impl Into<String>, error: ProviderError, count: usize) -> Self {
        let id = id.into();
        let mut failures = self.failures.write();
        let queue = failures.entry(id).or_default();
        for _ in 0..count {
            queue.push_back(error.clone());
        }
        drop(failures);
        self
    }

    /// Number of create attempts made for a resource.
    pub fn attempt_count(&self, id: &str) -> usize {
        self.attempts.read().get(id).copied().unwrap_or(0)
    }

    /// Ids created so far, in creation order.
    pub fn created_ids(&self) -> Vec<String> {
        self.created.read().clone()
    }

    /// Refs destroyed so far, in destruction order.
    pub fn destroyed_refs(&self) -> Vec<String> {
        self.destroyed.read().clone()
    }

    fn next_failure(&self, id: &str) -> Option<ProviderError> {
        self.failures.write().get_mut(id).and_then(VecDeque::pop_front)
    }

    /// Generate a password once per resource id; later calls return the
    /// cached value.
    fn password_for(&self, id: &str, config: &ResolvedConfig) -> String {
        if let Some(existing) = self.secrets.read().get(id) {
            return existing.clone();
        }
        let length = config
            .get("length")
            .and_then(|v| v.as_u64())
            .unwrap_or(32) as usize;
        let charset: Vec<char> = config
            .get("charset")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_CHARSET)
            .chars()
            .collect();
        let mut rng = rand::thread_rng();
        let password: String = (0..length)
            .map(|_| charset[rng.gen_range(0..charset.len())])
            .collect();
        self.secrets
            .write()
            .insert(id.to_string(), password.clone());
        password
    }

    fn outputs_for(&self, kind: ResourceKind, id: &str, config: &ResolvedConfig) -> Outputs {
        let mut outputs = Outputs::new();
        match kind {
            ResourceKind::Network => {
                outputs.insert("network_id".into(), json!(format!("net-{id}")));
                if let Some(cidr) = config.get("cidr") {
                    outputs.insert("cidr".into(), cidr.clone());
                }
            }
            ResourceKind::Subnet => {
                outputs.insert("subnet_id".into(), json!(format!("subnet-{id}")));
            }
            ResourceKind::SecurityGroup => {
                outputs.insert("group_id".into(), json!(format!("sg-{id}")));
            }
            ResourceKind::Database => {
                outputs.insert("endpoint".into(), json!(format!("{id}.db.internal")));
                outputs.insert(
                    "port".into(),
                    config.get("port").cloned().unwrap_or(json!(5432)),
                );
            }
            ResourceKind::LoadBalancer => {
                outputs.insert("dns_name".into(), json!(format!("{id}.elb.internal")));
                outputs.insert("arn".into(), json!(format!("arn:stub:load-balancer/{id}")));
            }
            ResourceKind::ContainerRegistry => {
                outputs.insert(
                    "repository_url".into(),
                    json!(format!("registry.internal/{id}")),
                );
            }
            ResourceKind::Secret => {
                outputs.insert("arn".into(), json!(format!("arn:stub:secret/{id}")));
                outputs.insert("password".into(), json!(self.password_for(id, config)));
            }
            ResourceKind::Listener
            | ResourceKind::TargetGroup
            | ResourceKind::TargetGroupAttachment
            | ResourceKind::Cluster
            | ResourceKind::TaskDefinition
            | ResourceKind::Service => {
                outputs.insert("arn".into(), json!(format!("arn:stub:{kind}/{id}")));
            }
        }
        outputs
    }
}

#[async_trait]
impl Provider for StubProvider {
    async fn create(
        &self,
        kind: ResourceKind,
        id: &str,
        config: &ResolvedConfig,
    ) -> Result<Outputs, ProviderError> {
        *self.attempts.write().entry(id.to_string()).or_insert(0) += 1;
        if let Some(error) = self.next_failure(id) {
            return Err(error);
        }
        self.created.write().push(id.to_string());
        Ok(self.outputs_for(kind, id, config))
    }

    async fn destroy(&self, _kind: ResourceKind, resource_ref: &str) -> Result<(), ProviderError> {
        if let Some(error) = self.next_failure(resource_ref) {
            return Err(error);
        }
        self.destroyed.write().push(resource_ref.to_string());
        Ok(())
    }
}
