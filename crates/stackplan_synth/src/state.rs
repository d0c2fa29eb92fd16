//! Persisted plan state.
//!
//! A [`PlanState`] is the serializable record of one synthesis run: every
//! resource's kind, fully resolved config, and recorded outputs, in the
//! order they were created. Persisting it enables a later destroy pass
//! without re-deriving the graph.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use stackplan_graph::ResourceKind;

use crate::error::{SynthError, SynthResult};
use crate::provider::{Outputs, ResolvedConfig};

/// One synthesized resource in the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub kind: ResourceKind,
    pub resolved_config: ResolvedConfig,
    pub outputs: Outputs,
}

/// The persisted result of one synthesis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanState {
    /// Unique run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Resource ids in creation order.
    pub order: Vec<String>,
    /// Per-resource records keyed by id.
    pub resources: HashMap<String, PlanRecord>,
}

impl PlanState {
    /// Create an empty plan for a new run.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            completed_at: None,
            order: Vec::new(),
            resources: HashMap::new(),
        }
    }

    /// Record a synthesized resource.
    pub fn record(
        &mut self,
        id: impl Into<String>,
        kind: ResourceKind,
        resolved_config: ResolvedConfig,
        outputs: Outputs,
    ) {
        let id = id.into();
        self.order.push(id.clone());
        self.resources.insert(
            id,
            PlanRecord {
                kind,
                resolved_config,
                outputs,
            },
        );
    }

    /// Outputs of a synthesized resource, if present.
    pub fn outputs_of(&self, id: &str) -> Option<&Outputs> {
        self.resources.get(id).map(|r| &r.outputs)
    }

    /// Resource ids in reverse creation order, for teardown.
    pub fn destroy_order(&self) -> Vec<String> {
        self.order.iter().rev().cloned().collect()
    }

    /// Number of synthesized resources.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Save the plan to disk as pretty JSON.
    pub fn save(&self, path: &Path) -> SynthResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SynthError::Serialization(e.to_string()))?;
        fs::write(path, json)?;
        debug!("Saved plan state to {:?}", path);
        Ok(())
    }

    /// Load a plan from disk.
    pub fn load(path: &Path) -> SynthResult<Self> {
        let content = fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&content)
            .map_err(|e| SynthError::Serialization(e.to_string()))?;
        Ok(state)
    }
}

impl Default for PlanState {
    fn default() -> Self {
        Self::new()
    }
}
