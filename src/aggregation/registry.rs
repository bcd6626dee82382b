//! Aggregator registry
//!
//! Maps aggregator type names to merge strategies. The registry resolves the
//! strategy at merge time and enforces the contract every strategy must
//! honour: the merged value and timestamp tuples are never empty.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{AggregationError, Error, Result};
use crate::tuple::Tuple;

use super::functions::{AccumulateAggregator, DecayAggregator, WindowAggregator};

/// Value and timestamp tuples of one catalog entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatState {
    /// Sample values
    pub values: Tuple,
    /// Sample timestamps, aligned with `values`
    pub timestamps: Tuple,
}

impl StatState {
    /// Create a state from its two tuples
    pub fn new(values: Tuple, timestamps: Tuple) -> Self {
        Self { values, timestamps }
    }

    /// True when both tuples hold data
    ///
    /// A state with either tuple empty is treated as the sentinel.
    pub fn has_data(&self) -> bool {
        !self.values.is_empty() && !self.timestamps.is_empty()
    }
}

/// Merge strategy for one aggregator type
pub trait Aggregator: Send + Sync + fmt::Debug + 'static {
    /// Type name used in statistic expressions
    fn name(&self) -> &'static str;

    /// Merge `incoming` into `existing`
    ///
    /// When `existing` is the sentinel the result is a cold start derived
    /// only from `incoming`.
    fn merge(
        &self,
        existing: &StatState,
        incoming: &StatState,
        args: &[String],
    ) -> std::result::Result<StatState, AggregationError>;
}

/// Registration table of aggregators keyed by type name
#[derive(Debug, Clone)]
pub struct AggregatorRegistry {
    aggregators: HashMap<String, Arc<dyn Aggregator>>,
}

impl AggregatorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            aggregators: HashMap::new(),
        }
    }

    /// Create a registry with `accumulate`, `decay` and `window`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AccumulateAggregator));
        registry.register(Arc::new(DecayAggregator));
        registry.register(Arc::new(WindowAggregator));
        registry
    }

    /// Register an aggregator, returning any previous one with the same name
    pub fn register(&mut self, aggregator: Arc<dyn Aggregator>) -> Option<Arc<dyn Aggregator>> {
        self.aggregators
            .insert(aggregator.name().to_string(), aggregator)
    }

    /// Look up an aggregator by type name
    pub fn get(&self, name: &str) -> Result<Arc<dyn Aggregator>> {
        self.aggregators
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownAggregator(name.to_string()))
    }

    /// True if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.aggregators.contains_key(name)
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.aggregators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve `name` and merge, rejecting empty results
    pub fn merge(
        &self,
        name: &str,
        existing: &StatState,
        incoming: &StatState,
        args: &[String],
    ) -> Result<StatState> {
        let aggregator = self.get(name)?;
        let merged = aggregator.merge(existing, incoming, args)?;

        if merged.timestamps.is_empty() {
            return Err(Error::Merge(format!(
                "{} produced an empty timestamp tuple",
                name
            )));
        }
        if merged.values.is_empty() {
            return Err(Error::Merge(format!("{} produced an empty value tuple", name)));
        }

        debug!(
            aggregator = name,
            samples = merged.values.len(),
            "Merged stat state"
        );
        Ok(merged)
    }
}

impl Default for AggregatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
