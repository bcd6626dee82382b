//! Pluggable stat aggregation
//!
//! Every elemental statistic expression names an aggregator type, for example
//! `window` in `db.p1.latency.window(5)`. The [`AggregatorRegistry`] resolves
//! that name to an [`Aggregator`] which merges an incoming report into the
//! existing (value, timestamp) tuples of a catalog entry.
//!
//! ```text
//! existing {value, timestamp} ─┐
//!                              ├─► Aggregator::merge(args) ─► merged {value, timestamp}
//! incoming {value, timestamp} ─┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use kuba_stats::aggregation::{AggregatorRegistry, StatState};
//! use kuba_stats::tuple::Tuple;
//!
//! let registry = AggregatorRegistry::with_builtins();
//! let incoming = StatState::new(Tuple::decode("4").unwrap(), Tuple::decode("100").unwrap());
//!
//! let merged = registry
//!     .merge("accumulate", &StatState::default(), &incoming, &[])
//!     .unwrap();
//! assert_eq!(merged.values.encode(), "4");
//! ```

pub mod functions;
pub mod registry;

pub use functions::{AccumulateAggregator, DecayAggregator, WindowAggregator};
pub use registry::{Aggregator, AggregatorRegistry, StatState};
