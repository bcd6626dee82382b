//! Configuration scopes
//!
//! Resolves hierarchical identifiers (cluster, participant, resource,
//! partition) into the canonical path of their configuration record.
//!
//! # Valid Scopes
//!
//! ```text
//! CLUSTER ──► PARTICIPANT
//!    │
//!    └──────► RESOURCE ──► PARTITION
//! ```
//!
//! | Scope | Path |
//! |---|---|
//! | cluster | `/{cluster}/CONFIGS/CLUSTER/{cluster}` |
//! | participant | `/{cluster}/CONFIGS/PARTICIPANT/{participant}` |
//! | resource | `/{cluster}/CONFIGS/RESOURCE/{resource}` |
//! | partition | `/{cluster}/CONFIGS/RESOURCE/{resource}\|{partition}` |
//!
//! # Example
//!
//! ```rust
//! use kuba_stats::scope::{ConfigScopeBuilder, ScopeProperty};
//!
//! let scope = ConfigScopeBuilder::new()
//!     .for_cluster("c1")
//!     .for_resource("r1")
//!     .for_partition("p1")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(scope.scope(), ScopeProperty::Partition);
//! assert_eq!(scope.scope_str(), "/c1/CONFIGS/RESOURCE/r1|p1");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Scope token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeProperty {
    /// Whole cluster
    Cluster,
    /// One participant (instance) of a cluster
    Participant,
    /// One resource of a cluster
    Resource,
    /// One partition of a resource
    Partition,
    /// Cluster constraint; has no configuration path of its own
    Constraint,
}

impl fmt::Display for ScopeProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScopeProperty::Cluster => "CLUSTER",
            ScopeProperty::Participant => "PARTICIPANT",
            ScopeProperty::Resource => "RESOURCE",
            ScopeProperty::Partition => "PARTITION",
            ScopeProperty::Constraint => "CONSTRAINT",
        };
        f.write_str(name)
    }
}

/// Resolution order: CLUSTER > PARTICIPANT > RESOURCE > PARTITION
const SCOPE_PRIORITY: [ScopeProperty; 5] = [
    ScopeProperty::Cluster,
    ScopeProperty::Participant,
    ScopeProperty::Resource,
    ScopeProperty::Partition,
    ScopeProperty::Constraint,
];

/// Scope reached by adding `next` to a scope resolved as `current`
fn transition(current: ScopeProperty, next: ScopeProperty) -> Option<ScopeProperty> {
    match (current, next) {
        (ScopeProperty::Cluster, ScopeProperty::Participant) => Some(ScopeProperty::Participant),
        (ScopeProperty::Cluster, ScopeProperty::Resource) => Some(ScopeProperty::Resource),
        (ScopeProperty::Resource, ScopeProperty::Partition) => Some(ScopeProperty::Partition),
        _ => None,
    }
}

/// Path for a resolved scope; `keys` are the token values in priority order
fn instantiate(scope: ScopeProperty, keys: &[&str]) -> Option<String> {
    match (scope, keys) {
        (ScopeProperty::Cluster, [cluster]) => {
            Some(format!("/{}/CONFIGS/CLUSTER/{}", cluster, cluster))
        },
        (ScopeProperty::Participant, [cluster, participant]) => {
            Some(format!("/{}/CONFIGS/PARTICIPANT/{}", cluster, participant))
        },
        (ScopeProperty::Resource, [cluster, resource]) => {
            Some(format!("/{}/CONFIGS/RESOURCE/{}", cluster, resource))
        },
        (ScopeProperty::Partition, [cluster, resource, partition]) => Some(format!(
            "/{}/CONFIGS/RESOURCE/{}|{}",
            cluster, resource, partition
        )),
        _ => None,
    }
}

/// Collects scope tokens before resolution
#[derive(Debug, Clone, Default)]
pub struct ConfigScopeBuilder {
    tokens: BTreeMap<ScopeProperty, String>,
}

impl ConfigScopeBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary token
    pub fn with(mut self, property: ScopeProperty, value: impl Into<String>) -> Self {
        self.tokens.insert(property, value.into());
        self
    }

    /// Set the cluster name
    pub fn for_cluster(self, cluster: impl Into<String>) -> Self {
        self.with(ScopeProperty::Cluster, cluster)
    }

    /// Set the participant name
    pub fn for_participant(self, participant: impl Into<String>) -> Self {
        self.with(ScopeProperty::Participant, participant)
    }

    /// Set the resource name
    pub fn for_resource(self, resource: impl Into<String>) -> Self {
        self.with(ScopeProperty::Resource, resource)
    }

    /// Set the partition name
    pub fn for_partition(self, partition: impl Into<String>) -> Self {
        self.with(ScopeProperty::Partition, partition)
    }

    /// Set the constraint name
    pub fn for_constraint(self, constraint: impl Into<String>) -> Self {
        self.with(ScopeProperty::Constraint, constraint)
    }

    /// Resolve the tokens into a scope
    pub fn build(&self) -> Result<ConfigScope> {
        let mut current: Option<ScopeProperty> = None;
        let mut keys: Vec<&str> = Vec::with_capacity(3);

        for property in SCOPE_PRIORITY {
            let Some(value) = self.tokens.get(&property) else {
                continue;
            };
            if value.is_empty() {
                return Err(Error::ScopeBuild(format!("{} name is empty", property)));
            }

            current = match current {
                None if property == ScopeProperty::Cluster => Some(ScopeProperty::Cluster),
                None => {
                    return Err(Error::ScopeBuild(format!(
                        "missing CLUSTER scope; can't build scope using {}",
                        self
                    )))
                },
                Some(scope) => match transition(scope, property) {
                    Some(next) => Some(next),
                    None => {
                        return Err(Error::ScopeBuild(format!(
                            "invalid transition {} -> {}; can't build scope using {}",
                            scope, property, self
                        )))
                    },
                },
            };
            keys.push(value);
        }

        let scope = current.ok_or_else(|| {
            Error::ScopeBuild("missing CLUSTER scope; no tokens supplied".to_string())
        })?;
        let scope_str = instantiate(scope, &keys).ok_or_else(|| {
            Error::ScopeBuild(format!("no path template for {} scope", scope))
        })?;

        Ok(ConfigScope {
            cluster_name: keys[0].to_string(),
            scope,
            scope_str,
        })
    }
}

impl fmt::Display for ConfigScopeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self
            .tokens
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{{{}}}", tokens.join(", "))
    }
}

/// A resolved configuration scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigScope {
    cluster_name: String,
    scope: ScopeProperty,
    scope_str: String,
}

impl ConfigScope {
    /// Most specific scope reached
    pub fn scope(&self) -> ScopeProperty {
        self.scope
    }

    /// Cluster the scope belongs to
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Canonical path of the scope's configuration record
    pub fn scope_str(&self) -> &str {
        &self.scope_str
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.scope_str)
    }
}
