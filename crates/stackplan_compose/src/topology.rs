//! Network topology builder.
//!
//! A [`NetworkTopology`] is a pure builder with no internal state machine:
//! it carves subnet tiers out of one address block and collects ingress
//! security rules, then [`NetworkTopology::emit`]s the corresponding
//! resource declarations into a caller-supplied graph. The three-tier rule
//! chain (world reaches the load balancer, the load balancer reaches the
//! app, the app reaches the database) is a preset, not a fixed contract;
//! callers can declare any rule set they want.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use stackplan_graph::{Attribute, DependencyGraph, Resource, ResourceKind};

use crate::error::{ComposeError, ComposeResult};

/// An IPv4 CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBlock {
    base: Ipv4Addr,
    prefix: u8,
}

impl AddressBlock {
    /// Create a block, normalizing the base to its network address.
    pub fn new(base: Ipv4Addr, prefix: u8) -> ComposeResult<Self> {
        if prefix > 32 {
            return Err(ComposeError::InvalidCidr(format!("{base}/{prefix}")));
        }
        let normalized = Ipv4Addr::from(u32::from(base) & Self::mask(prefix));
        Ok(Self {
            base: normalized,
            prefix,
        })
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(prefix: u8) -> u32 {
        if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        }
    }

    /// Carve out the `index`-th child block at `new_prefix`.
    pub fn subnet(&self, new_prefix: u8, index: u32) -> ComposeResult<AddressBlock> {
        if new_prefix <= self.prefix || new_prefix > 32 {
            return Err(ComposeError::InvalidCidr(format!(
                "cannot partition {self} at /{new_prefix}"
            )));
        }
        let count = 1u64 << (new_prefix - self.prefix);
        if u64::from(index) >= count {
            return Err(ComposeError::InvalidCidr(format!(
                "subnet index {index} out of range for {self} at /{new_prefix}"
            )));
        }
        let base = u32::from(self.base) + (index << (32 - new_prefix));
        AddressBlock::new(Ipv4Addr::from(base), new_prefix)
    }
}

impl FromStr for AddressBlock {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| ComposeError::InvalidCidr(s.to_string()))?;
        let base: Ipv4Addr = addr
            .parse()
            .map_err(|_| ComposeError::InvalidCidr(s.to_string()))?;
        let prefix: u8 = prefix
            .parse()
            .map_err(|_| ComposeError::InvalidCidr(s.to_string()))?;
        AddressBlock::new(base, prefix)
    }
}

impl std::fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix)
    }
}

/// Subnet tiers, from internet-facing to fully isolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetTier {
    Public,
    PrivateRouted,
    PrivateIsolated,
}

impl SubnetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetTier::Public => "public",
            SubnetTier::PrivateRouted => "private-routed",
            SubnetTier::PrivateIsolated => "private-isolated",
        }
    }

    pub fn all() -> [SubnetTier; 3] {
        [
            SubnetTier::Public,
            SubnetTier::PrivateRouted,
            SubnetTier::PrivateIsolated,
        ]
    }
}

impl std::fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source of an ingress rule: a named group or the whole IPv4 internet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePeer {
    Group(String),
    AnyIpv4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// A directional ingress permission between named groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub from: RulePeer,
    pub to_group: String,
    pub port: u16,
    pub protocol: Protocol,
}

impl SecurityRule {
    /// Allow the whole IPv4 internet to reach `to_group` on `port`.
    pub fn from_world(to_group: impl Into<String>, port: u16) -> Self {
        Self {
            from: RulePeer::AnyIpv4,
            to_group: to_group.into(),
            port,
            protocol: Protocol::Tcp,
        }
    }

    /// Allow `from_group` to reach `to_group` on `port`.
    pub fn between(from_group: impl Into<String>, to_group: impl Into<String>, port: u16) -> Self {
        Self {
            from: RulePeer::Group(from_group.into()),
            to_group: to_group.into(),
            port,
            protocol: Protocol::Tcp,
        }
    }

    fn to_value(&self) -> serde_json::Value {
        let from = match &self.from {
            RulePeer::Group(group) => json!({ "group": group }),
            RulePeer::AnyIpv4 => json!("any_ipv4"),
        };
        json!({
            "from": from,
            "port": self.port,
            "protocol": self.protocol.as_str(),
        })
    }
}

/// Ids of the resources a topology emitted into a graph.
#[derive(Debug, Clone)]
pub struct TopologyHandles {
    pub network: String,
    pub subnets: BTreeMap<SubnetTier, Vec<String>>,
    pub groups: Vec<String>,
}

/// Builder for the network layer: one address block partitioned into three
/// subnet tiers, plus named security groups and their ingress rules.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    name: String,
    block: AddressBlock,
    subnet_prefix: u8,
    az_count: u8,
    groups: Vec<String>,
    rules: Vec<SecurityRule>,
}

impl NetworkTopology {
    pub const DATABASE_PORT: u16 = 5432;
    pub const HTTP_PORT: u16 = 80;

    /// Create a topology over the given block. The network resource is
    /// emitted under `name`.
    pub fn new(name: impl Into<String>, block: AddressBlock) -> Self {
        Self {
            name: name.into(),
            block,
            subnet_prefix: 24,
            az_count: 2,
            groups: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Override the fixed prefix length subnets are carved at.
    pub fn with_subnet_prefix(mut self, prefix: u8) -> Self {
        self.subnet_prefix = prefix;
        self
    }

    /// Override the number of subnets per tier.
    pub fn with_az_count(mut self, az_count: u8) -> Self {
        self.az_count = az_count;
        self
    }

    /// Declare a security group.
    pub fn with_group(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.groups.contains(&name) {
            self.groups.push(name);
        }
        self
    }

    /// Add an ingress rule. Endpoints are validated at emit time.
    pub fn with_rule(mut self, rule: SecurityRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Install the three-tier reachability preset: world reaches the load
    /// balancer on 80, the load balancer group reaches the app group on
    /// `app_port`, and the app group reaches the database group on 5432.
    /// Declares the three groups as well.
    pub fn with_three_tier_rules(
        self,
        lb_group: impl Into<String>,
        app_group: impl Into<String>,
        db_group: impl Into<String>,
        app_port: u16,
    ) -> Self {
        let (lb, app, db) = (lb_group.into(), app_group.into(), db_group.into());
        self.with_group(lb.clone())
            .with_group(app.clone())
            .with_group(db.clone())
            .with_rule(SecurityRule::from_world(lb.clone(), Self::HTTP_PORT))
            .with_rule(SecurityRule::between(lb, app.clone(), app_port))
            .with_rule(SecurityRule::between(app, db, Self::DATABASE_PORT))
    }

    /// Validate the rule set and declare the network, subnet and security
    /// group resources into the graph.
    pub fn emit(&self, graph: &mut DependencyGraph) -> ComposeResult<TopologyHandles> {
        for rule in &self.rules {
            if let RulePeer::Group(group) = &rule.from {
                if !self.groups.contains(group) {
                    return Err(ComposeError::UnknownGroup(group.clone()));
                }
            }
            if !self.groups.contains(&rule.to_group) {
                return Err(ComposeError::UnknownGroup(rule.to_group.clone()));
            }
        }

        let network = self.name.clone();
        graph.add_resource(
            Resource::new(&network, ResourceKind::Network)
                .with_config("cidr", Attribute::literal(self.block.to_string())),
        )?;

        let mut subnets: BTreeMap<SubnetTier, Vec<String>> = BTreeMap::new();
        for (tier_index, tier) in SubnetTier::all().into_iter().enumerate() {
            let mut tier_ids = Vec::with_capacity(self.az_count as usize);
            for az in 0..self.az_count {
                let index = tier_index as u32 * u32::from(self.az_count) + u32::from(az);
                let cidr = self.block.subnet(self.subnet_prefix, index)?;
                let id = format!("{}-{}-{}", self.name, tier, az + 1);
                graph.add_resource(
                    Resource::new(&id, ResourceKind::Subnet)
                        .with_dependency(&network)
                        .with_config("cidr", Attribute::literal(cidr.to_string()))
                        .with_config("tier", Attribute::literal(tier.as_str())),
                )?;
                tier_ids.push(id);
            }
            subnets.insert(tier, tier_ids);
        }

        for group in &self.groups {
            let rules: Vec<serde_json::Value> = self
                .rules
                .iter()
                .filter(|rule| &rule.to_group == group)
                .map(SecurityRule::to_value)
                .collect();
            graph.add_resource(
                Resource::new(group, ResourceKind::SecurityGroup)
                    .with_dependency(&network)
                    .with_config("ingress", Attribute::literal(rules)),
            )?;
        }

        debug!(
            "Emitted topology '{}': {} subnets, {} groups, {} rules",
            self.name,
            subnets.values().map(Vec::len).sum::<usize>(),
            self.groups.len(),
            self.rules.len()
        );

        Ok(TopologyHandles {
            network,
            subnets,
            groups: self.groups.clone(),
        })
    }
}
