//! Dependency graph construction and ordering.
//!
//! The graph exclusively owns every declared [`Resource`] for the lifetime
//! of one synthesis run. Edges come from two places: explicit `depends_on`
//! declarations (plus [`DependencyGraph::add_edge`]), and implicit edges
//! inferred from every deferred attribute found in a resource's config.
//! [`DependencyGraph::topological_order`] produces the only ordering
//! guarantee the rest of the system relies on.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::resource::Resource;

/// A graph of declared resources ordered by dependency edges.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    resources: HashMap<String, Resource>,
    /// Ids in declaration order; the tie-break for unconstrained resources.
    declaration_order: Vec<String>,
    /// Extra (dependent, dependency) edges added after declaration.
    edges: Vec<(String, String)>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource.
    ///
    /// Fails with [`GraphError::DuplicateId`] if a resource with the same
    /// id was already declared.
    pub fn add_resource(&mut self, resource: Resource) -> GraphResult<()> {
        if self.resources.contains_key(&resource.id) {
            return Err(GraphError::DuplicateId(resource.id.clone()));
        }
        debug!("Declaring resource: {} ({})", resource.id, resource.kind);
        self.declaration_order.push(resource.id.clone());
        self.resources.insert(resource.id.clone(), resource);
        Ok(())
    }

    /// Add an explicit edge: `dependent` must be synthesized after
    /// `dependency`.
    ///
    /// Fails with [`GraphError::UnknownResource`] if either endpoint was
    /// never declared.
    pub fn add_edge(&mut self, dependent: &str, dependency: &str) -> GraphResult<()> {
        for id in [dependent, dependency] {
            if !self.resources.contains_key(id) {
                return Err(GraphError::UnknownResource(id.to_string()));
            }
        }
        self.edges
            .push((dependent.to_string(), dependency.to_string()));
        Ok(())
    }

    /// Get a declared resource by id.
    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Get a declared resource by id, failing if it was never declared.
    pub fn get_required(&self, id: &str) -> GraphResult<&Resource> {
        self.get(id)
            .ok_or_else(|| GraphError::UnknownResource(id.to_string()))
    }

    /// Check whether a resource id is declared.
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// All declared ids, in declaration order.
    pub fn ids(&self) -> &[String] {
        &self.declaration_order
    }

    /// Number of declared resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the graph has no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// The full dependency set of a resource: explicit `depends_on`,
    /// explicit edges, and the source of every deferred attribute in its
    /// config.
    ///
    /// Fails with [`GraphError::UnknownResource`] if the resource itself,
    /// any explicit dependency, or any deferred source was never declared.
    pub fn dependencies_of(&self, id: &str) -> GraphResult<BTreeSet<String>> {
        let resource = self.get_required(id)?;
        let mut deps: BTreeSet<String> = resource.depends_on.clone();
        for source in resource.deferred_sources() {
            deps.insert(source.to_string());
        }
        for (dependent, dependency) in &self.edges {
            if dependent == id {
                deps.insert(dependency.clone());
            }
        }
        for dep in &deps {
            if !self.resources.contains_key(dep) {
                return Err(GraphError::UnknownResource(dep.clone()));
            }
        }
        Ok(deps)
    }

    /// Compute a synthesis order in which every dependency precedes its
    /// dependents.
    ///
    /// Resources with no relative ordering constraint keep their
    /// declaration order, which makes the result deterministic. Fails with
    /// [`GraphError::CycleDetected`] naming the members of a cycle if no
    /// valid order exists.
    pub fn topological_order(&self) -> GraphResult<Vec<String>> {
        let mut deps: HashMap<&str, BTreeSet<String>> = HashMap::new();
        for id in &self.declaration_order {
            deps.insert(id, self.dependencies_of(id)?);
        }

        let mut order = Vec::with_capacity(self.declaration_order.len());
        let mut placed: HashSet<&str> = HashSet::new();

        while order.len() < self.declaration_order.len() {
            // Stable pass: pick every declared-but-unplaced resource whose
            // dependencies are all placed, in declaration order.
            let mut progressed = false;
            for id in &self.declaration_order {
                if placed.contains(id.as_str()) {
                    continue;
                }
                let ready = deps[id.as_str()]
                    .iter()
                    .all(|dep| placed.contains(dep.as_str()));
                if ready {
                    placed.insert(id);
                    order.push(id.clone());
                    progressed = true;
                }
            }
            if !progressed {
                return Err(GraphError::CycleDetected(self.find_cycle(&placed, &deps)));
            }
        }
        Ok(order)
    }

    /// Reverse synthesis order, used for teardown.
    pub fn reverse_topological_order(&self) -> GraphResult<Vec<String>> {
        let mut order = self.topological_order()?;
        order.reverse();
        Ok(order)
    }

    /// Walk unsatisfied dependencies from an unplaced resource until a
    /// repeat, yielding the members of one cycle.
    ///
    /// Every unplaced resource has at least one unplaced dependency, so
    /// the walk always advances until it closes on itself.
    fn find_cycle(
        &self,
        placed: &HashSet<&str>,
        deps: &HashMap<&str, BTreeSet<String>>,
    ) -> Vec<String> {
        let start = self
            .declaration_order
            .iter()
            .find(|id| !placed.contains(id.as_str()))
            .expect("cycle reported on a fully placed graph");

        let mut path: Vec<&str> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut current: &str = start;
        loop {
            if let Some(&pos) = seen.get(current) {
                return path[pos..].iter().map(|s| s.to_string()).collect();
            }
            seen.insert(current, path.len());
            path.push(current);
            current = deps[current]
                .iter()
                .find(|dep| !placed.contains(dep.as_str()))
                .expect("unplaced resource with all dependencies placed")
                .as_str();
        }
    }
}
