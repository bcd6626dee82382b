//! Stat catalog
//!
//! The catalog maps fully resolved statistic expressions to their aggregated
//! state and persists the whole mapping as one record in the coordination
//! store. Each operation is one refresh → mutate → persist cycle:
//!
//! ```text
//! refresh()               store record ──► in-memory catalog
//! add_stat(expr)          seed missing elemental expressions, persist
//! apply_stat(name, rep)   scan every key:
//!                           exact match    ──► merge into staged update
//!                           wildcard match ──► substitute, merge into pending
//!                         commit staged + pending, persist
//! ```
//!
//! # Entry lifecycle
//!
//! `absent → seeded (empty tuples) → populated`. Entries are never removed.
//!
//! # Failure handling
//!
//! `apply_stat` is all-or-nothing: the scan reads from the catalog and writes
//! only into staging maps, so a failed merge leaves the catalog exactly as it
//! was refreshed and nothing is persisted. A rejected persist is reported
//! through [`CycleReport::persisted`], not as an error.
//!
//! A catalog instance must be the only writer of its record; concurrent
//! writers overwrite each other.
//!
//! # Example
//!
//! ```rust
//! use kuba_stats::catalog::{StatCatalog, StatFields};
//! use kuba_stats::store::InMemoryStore;
//! use std::sync::Arc;
//!
//! let mut catalog = StatCatalog::new(Arc::new(InMemoryStore::new()));
//! catalog.add_stat("db.*.latency.window(3)").unwrap();
//!
//! let report = StatFields::from([
//!     ("value".to_string(), "12".to_string()),
//!     ("timestamp".to_string(), "1000".to_string()),
//! ]);
//! let cycle = catalog.apply_stat("db.p1.latency", &report).unwrap();
//!
//! assert_eq!(cycle.created, vec!["db.p1.latency.window(3)"]);
//! assert!(cycle.persisted);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::aggregation::{AggregatorRegistry, StatState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::expression::{parse_report_name, StatExpression};
use crate::metrics;
use crate::store::{CoordinationStore, Record};
use crate::tuple::{Tuple, EMPTY_TUPLE};

/// Field holding the encoded value tuple
pub const VALUE_FIELD: &str = "value";

/// Field holding the encoded timestamp tuple
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Record key and record id the catalog persists under by default
pub const PERSISTENT_STATS_KEY: &str = "PersistentStats";

/// Encoded fields of one catalog entry or report
pub type StatFields = HashMap<String, String>;

/// Expression → fields
pub type Catalog = HashMap<String, StatFields>;

/// Outcome of one catalog cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Existing entries whose state changed
    pub updated: Vec<String>,
    /// Entries added (seeded by `add_stat`, wildcard-derived by `apply_stat`)
    pub created: Vec<String>,
    /// Expressions `add_stat` found already present
    pub skipped: Vec<String>,
    /// Whether the store accepted the catalog write
    pub persisted: bool,
}

/// Catalog of subscribed stats backed by a coordination store
pub struct StatCatalog {
    store: Arc<dyn CoordinationStore>,
    registry: AggregatorRegistry,
    record_key: String,
    stats: Catalog,
    metrics_enabled: bool,
}

impl StatCatalog {
    /// Create a catalog with the built-in aggregators and default record key
    ///
    /// The in-memory view starts empty; operations refresh it themselves.
    pub fn new(store: Arc<dyn CoordinationStore>) -> Self {
        Self {
            store,
            registry: AggregatorRegistry::with_builtins(),
            record_key: PERSISTENT_STATS_KEY.to_string(),
            stats: Catalog::new(),
            metrics_enabled: true,
        }
    }

    /// Open the configured store and record key
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = config.open_store()?;
        info!(
            store = store.store_id(),
            record_key = %config.store.record_key,
            "Opened stat catalog"
        );
        Ok(Self::new(store)
            .with_record_key(config.store.record_key.clone())
            .with_metrics(config.monitoring.metrics_enabled))
    }

    /// Enable or disable Prometheus recording for this catalog
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Whether cycles are recorded in Prometheus
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_enabled
    }

    /// Use a custom aggregator registry
    pub fn with_registry(mut self, registry: AggregatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Persist under a different record key
    pub fn with_record_key(mut self, record_key: impl Into<String>) -> Self {
        self.record_key = record_key.into();
        self
    }

    /// Record key in the coordination store
    pub fn record_key(&self) -> &str {
        &self.record_key
    }

    /// Aggregator registry used for merges
    pub fn registry(&self) -> &AggregatorRegistry {
        &self.registry
    }

    /// Sentinel entry for a stat that has never been merged
    pub fn empty_stat() -> StatFields {
        StatFields::from([
            (TIMESTAMP_FIELD.to_string(), EMPTY_TUPLE.to_string()),
            (VALUE_FIELD.to_string(), EMPTY_TUPLE.to_string()),
        ])
    }

    /// Reload the catalog from the coordination store
    ///
    /// A missing record yields an empty catalog.
    pub fn refresh(&mut self) -> Result<()> {
        self.stats = match self.store.get(&self.record_key)? {
            Some(record) => record.map_fields,
            None => Catalog::new(),
        };
        debug!(
            record_key = %self.record_key,
            entries = self.stats.len(),
            "Refreshed stat catalog"
        );
        Ok(())
    }

    /// Write the whole catalog to the store, reporting success
    pub fn persist(&self) -> bool {
        let persisted = self.try_persist();
        if self.metrics_enabled {
            metrics::record_persist(persisted.is_ok());
        }
        match persisted {
            Ok(()) => {
                debug!(
                    record_key = %self.record_key,
                    entries = self.stats.len(),
                    "Persisted stat catalog"
                );
                true
            },
            Err(e) => {
                warn!(record_key = %self.record_key, error = %e, "Failed to persist stat catalog");
                false
            },
        }
    }

    /// Write the whole catalog to the store
    ///
    /// The stored record keeps its id and simple fields; its map fields are
    /// replaced wholesale.
    pub fn try_persist(&self) -> Result<()> {
        let mut record = self
            .store
            .get(&self.record_key)
            .map_err(|e| Error::Persistence(e.to_string()))?
            .unwrap_or_else(|| Record::new(PERSISTENT_STATS_KEY));
        record.map_fields = self.stats.clone();

        match self.store.set(&self.record_key, &record) {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::Persistence(format!(
                "{} rejected write of '{}'",
                self.store.store_id(),
                self.record_key
            ))),
            Err(e) => Err(Error::Persistence(e.to_string())),
        }
    }

    /// Register the elemental expressions of `expression`
    ///
    /// Already present expressions are left untouched. The catalog is
    /// persisted even when nothing changed.
    pub fn add_stat(&mut self, expression: &str) -> Result<CycleReport> {
        let result = self.seed(expression);
        self.record_cycle("add", &result);
        let report = result?;

        info!(
            expression,
            added = report.created.len(),
            skipped = report.skipped.len(),
            persisted = report.persisted,
            "Added stat expression"
        );
        Ok(report)
    }

    fn seed(&mut self, expression: &str) -> Result<CycleReport> {
        self.refresh()?;
        let elemental = StatExpression::parse(expression)?.elemental();

        let mut report = CycleReport::default();
        for stat in elemental {
            let key = stat.to_string();
            if self.stats.contains_key(&key) {
                debug!(stat = %key, "Stat already exists; not adding");
                report.skipped.push(key);
                continue;
            }
            self.stats.insert(key.clone(), Self::empty_stat());
            report.created.push(key);
        }

        report.persisted = self.persist();
        Ok(report)
    }

    /// Merge a report into every catalog entry it matches
    ///
    /// Exact matches are merged into their entry. Each wildcard match derives
    /// a concrete expression; if it is neither in the catalog nor already
    /// derived in this call it is seeded and merged. One report may update
    /// and create several entries.
    pub fn apply_stat(&mut self, report_name: &str, fields: &StatFields) -> Result<CycleReport> {
        let result = self.apply(report_name, fields);
        self.record_cycle("apply", &result);

        match &result {
            Ok(report) => debug!(
                report = report_name,
                updated = report.updated.len(),
                created = report.created.len(),
                persisted = report.persisted,
                "Applied stat report"
            ),
            Err(e) => warn!(report = report_name, error = %e, "Stat report rejected"),
        }
        result
    }

    fn apply(&mut self, report_name: &str, fields: &StatFields) -> Result<CycleReport> {
        self.refresh()?;
        let (updates, pending) = self.scan(report_name, fields)?;

        let mut report = CycleReport {
            updated: updates.keys().cloned().collect(),
            created: pending.keys().cloned().collect(),
            ..Default::default()
        };
        report.updated.sort();
        report.created.sort();

        self.stats.extend(updates);
        self.stats.extend(pending);
        report.persisted = self.persist();
        Ok(report)
    }

    fn record_cycle(&self, operation: &str, result: &Result<CycleReport>) {
        if !self.metrics_enabled {
            return;
        }
        match result {
            Ok(report) => {
                metrics::record_cycle(operation, true);
                let created = if operation == "add" { "seeded" } else { "created" };
                metrics::record_entries("updated", report.updated.len());
                metrics::record_entries(created, report.created.len());
                metrics::update_catalog_entries(self.stats.len());
            },
            Err(_) => metrics::record_cycle(operation, false),
        }
    }

    /// Compute staged exact-match updates and pending wildcard creations
    ///
    /// Reads the catalog only; nothing is inserted while keys are scanned.
    fn scan(&self, report_name: &str, fields: &StatFields) -> Result<(Catalog, Catalog)> {
        let report = parse_report_name(report_name)?;
        let mut updates = Catalog::new();
        let mut pending = Catalog::new();

        for (key, existing) in &self.stats {
            let expr = StatExpression::parse(key)?;

            if expr.matches_exactly(&report) {
                let merged = self.merge_parsed(&expr, existing, fields)?;
                // stale reports leave the entry as it was
                if merged != *existing {
                    updates.insert(key.clone(), merged);
                }
            } else if expr.matches_wildcard(&report) {
                let derived = expr.substitute(&report)?;
                let derived_key = derived.to_string();
                // existing derived keys are merged by their own exact match
                if self.stats.contains_key(&derived_key) || pending.contains_key(&derived_key) {
                    continue;
                }
                let merged = self.merge_parsed(&derived, &Self::empty_stat(), fields)?;
                debug!(wildcard = %key, stat = %derived_key, "Derived stat from wildcard");
                pending.insert(derived_key, merged);
            }
        }

        Ok((updates, pending))
    }

    /// Merge `incoming` into `existing` with the aggregator named by `expression`
    ///
    /// Both field maps are required; missing `value`/`timestamp` fields
    /// decode as empty tuples.
    pub fn merge_fields(
        &self,
        expression: &str,
        existing: Option<&StatFields>,
        incoming: Option<&StatFields>,
    ) -> Result<StatFields> {
        let existing = existing
            .ok_or_else(|| Error::Validation("existing stat for merge is null".to_string()))?;
        let incoming = incoming
            .ok_or_else(|| Error::Validation("incoming stat for merge is null".to_string()))?;

        let expr = StatExpression::parse(expression)?;
        self.merge_parsed(&expr, existing, incoming)
    }

    fn merge_parsed(
        &self,
        expr: &StatExpression,
        existing: &StatFields,
        incoming: &StatFields,
    ) -> Result<StatFields> {
        let spec = expr.aggregator()?;
        let existing = decode_state(existing)?;
        let incoming = decode_state(incoming)?;

        let merged = self
            .registry
            .merge(&spec.name, &existing, &incoming, &spec.args)
            .inspect_err(|_| {
                if self.metrics_enabled {
                    metrics::record_merge_failure(&spec.name)
                }
            })?;

        Ok(StatFields::from([
            (TIMESTAMP_FIELD.to_string(), merged.timestamps.encode()),
            (VALUE_FIELD.to_string(), merged.values.encode()),
        ]))
    }

    /// Fields of one catalog entry
    pub fn get(&self, expression: &str) -> Option<&StatFields> {
        self.stats.get(expression)
    }

    /// True if `expression` is a catalog key
    pub fn contains(&self, expression: &str) -> bool {
        self.stats.contains_key(expression)
    }

    /// Number of catalog entries
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// True when the catalog has no entries
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Catalog keys, sorted
    pub fn stat_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stats.keys().cloned().collect();
        names.sort();
        names
    }

    /// The in-memory catalog as of the last refresh or cycle
    pub fn stats(&self) -> &Catalog {
        &self.stats
    }
}

fn decode_state(fields: &StatFields) -> Result<StatState> {
    Ok(StatState::new(
        Tuple::decode_field(fields.get(VALUE_FIELD))?,
        Tuple::decode_field(fields.get(TIMESTAMP_FIELD))?,
    ))
}
