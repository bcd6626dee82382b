//! Coordination store contract

use crate::error::StoreError;

use super::record::Record;

/// Blocking get/set access to opaque records
///
/// Implementations make no transactional guarantee across writers.
pub trait CoordinationStore: Send + Sync {
    /// Unique identifier for this backend
    fn store_id(&self) -> &str;

    /// Read a record, `None` if it has never been written
    fn get(&self, key: &str) -> Result<Option<Record>, StoreError>;

    /// Overwrite a record wholesale
    ///
    /// Returns `Ok(false)` when the backend refused the write.
    fn set(&self, key: &str, record: &Record) -> Result<bool, StoreError>;
}
