//! Kuba Stats - persistent stat catalog for cluster controllers
//!
//! This library provides:
//! - A statistic expression language with wildcard path segments
//! - Pluggable aggregators (`accumulate`, `decay`, `window`) over encoded tuples
//! - A catalog persisted as one record in a coordination store (in-memory or Redis)
//! - Configuration scope resolution for cluster/participant/resource/partition paths
//!
//! # Example
//!
//! ```rust
//! use kuba_stats::{InMemoryStore, StatCatalog, StatFields};
//! use std::sync::Arc;
//!
//! let mut catalog = StatCatalog::new(Arc::new(InMemoryStore::new()));
//! catalog.add_stat("controller.*.errors.accumulate()").unwrap();
//!
//! let report = StatFields::from([
//!     ("value".to_string(), "3".to_string()),
//!     ("timestamp".to_string(), "10".to_string()),
//! ]);
//! catalog.apply_stat("controller.node1.errors", &report).unwrap();
//!
//! assert!(catalog.contains("controller.node1.errors.accumulate()"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod expression;
pub mod tuple;

/// Aggregator trait, registry, and built-in aggregators
pub mod aggregation;

/// Stat catalog: refresh, add, apply, persist
pub mod catalog;

/// Configuration management with TOML support
pub mod config;

/// Prometheus metrics and telemetry
pub mod metrics;

/// Configuration scope resolution
pub mod scope;

/// Coordination store abstraction and backends
pub mod store;

// Re-export main types
pub use aggregation::{Aggregator, AggregatorRegistry, StatState};
pub use catalog::{CycleReport, StatCatalog, StatFields};
pub use error::{Error, Result};
pub use expression::StatExpression;
pub use scope::{ConfigScope, ConfigScopeBuilder, ScopeProperty};
pub use store::{CoordinationStore, InMemoryStore, Record};
pub use tuple::Tuple;
