//! Read path: `get()`.
//!
//! Point lookups check the memtable first (freshest data), then SSTables in
//! strictly decreasing `seq` order. The first layer that stores the key
//! decides the outcome; a tombstone anywhere short-circuits to `NotFound`.

use memtable::Entry;

use crate::{Store, StoreError, StoreInner};

impl Store {
    /// Looks up the current value for `key`.
    ///
    /// # Errors
    ///
    /// `EmptyKey` on invalid input, `NotFound` when the key is absent or
    /// tombstoned, `Closed` after [`Store::close`]; SSTable read errors
    /// (corruption, I/O) propagate as is.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        // The memtable read guard is held across the table lookup so a
        // concurrent flush cannot move the key out from under us.
        let mem = self.inner.mem.read().unwrap();
        if mem.closing {
            return Err(StoreError::Closed);
        }

        if let Some(entry) = mem.table.get(key) {
            return match entry {
                Entry::Value(v) => Ok(v.clone()),
                Entry::Tombstone => Err(StoreError::NotFound),
            };
        }

        self.inner.lookup_tables(key)
    }
}

impl StoreInner {
    /// Consults SSTables newest-`seq`-first under the table-set read lock,
    /// which keeps a concurrent merge from erasing a table mid-scan.
    pub(crate) fn lookup_tables(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        let tables = self.tables.read().unwrap();
        for table in tables.values().rev() {
            match table.get(key)? {
                Some(Entry::Value(v)) => return Ok(v),
                Some(Entry::Tombstone) => return Err(StoreError::NotFound),
                None => continue,
            }
        }
        Err(StoreError::NotFound)
    }
}
