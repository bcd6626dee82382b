//! Coordination store integration
//!
//! The stat catalog persists itself as a single [`Record`] in a shared
//! coordination store. Two backends are provided:
//!
//! - [`InMemoryStore`]: process-local, for tests and single-node setups
//! - [`RedisStore`]: one Redis string key per record, JSON encoded
//!
//! # Record Layout
//!
//! ```text
//! {key_prefix}PersistentStats → {
//!     "id": "PersistentStats",
//!     "simple_fields": {},
//!     "map_fields": {
//!         "<stat expression>": { "timestamp": "<tuple>", "value": "<tuple>" },
//!         ...
//!     }
//! }
//! ```
//!
//! Writes overwrite the whole record; the last writer wins.

pub mod memory;
pub mod record;
pub mod redis;
pub mod traits;
pub mod util;

pub use memory::InMemoryStore;
pub use record::Record;
pub use self::redis::{RedisStore, RedisStoreConfig};
pub use traits::CoordinationStore;
