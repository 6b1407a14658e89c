//! Write path: `set()` and `delete()`.
//!
//! Every mutation is appended to the WAL (with fsync) before the memtable is
//! touched, under the memtable's exclusive lock. If the WAL append fails the
//! memtable is left unchanged — durability errors are never masked. The
//! flush signal is sent only after the lock is released.

use record::Record;

use crate::{Store, StoreError};

impl Store {
    /// Inserts or overwrites a key-value pair.
    ///
    /// On success the write is durable: the record has been fsynced to the
    /// WAL before this returns.
    ///
    /// # Errors
    ///
    /// `EmptyKey` / `EmptyValue` on invalid input, `Closed` after
    /// [`Store::close`], otherwise WAL I/O errors.
    pub fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if value.is_empty() {
            return Err(StoreError::EmptyValue);
        }

        let want_flush;
        {
            let mut mem = self.inner.mem.write().unwrap();
            if mem.closing {
                return Err(StoreError::Closed);
            }

            let rec = Record::put(key, value);
            {
                let mut wal = self.inner.wal.lock().unwrap();
                match wal.as_mut() {
                    Some(wal) => wal.append(&rec)?,
                    None => return Err(StoreError::Closed),
                }
            }

            let Record { key, value, .. } = rec;
            mem.table.insert(key, value);
            want_flush = mem.table.len() > self.inner.config.max_memtable_entries;
        }

        if want_flush {
            // Coalescing: a full channel means a flush is already pending.
            let _ = self.inner.flush_tx.try_send(());
        }
        Ok(())
    }

    /// Deletes a key by recording a tombstone.
    ///
    /// Deleting an absent key succeeds: the tombstone is legitimate either
    /// way, since it must shadow whatever older SSTables may hold.
    ///
    /// # Errors
    ///
    /// `EmptyKey` on invalid input, `Closed` after [`Store::close`],
    /// otherwise WAL I/O errors.
    pub fn delete(&self, key: Vec<u8>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        let want_flush;
        {
            let mut mem = self.inner.mem.write().unwrap();
            if mem.closing {
                return Err(StoreError::Closed);
            }

            let rec = Record::tombstone(key);
            {
                let mut wal = self.inner.wal.lock().unwrap();
                match wal.as_mut() {
                    Some(wal) => wal.append(&rec)?,
                    None => return Err(StoreError::Closed),
                }
            }

            mem.table.remove(rec.key);
            want_flush = mem.table.len() > self.inner.config.max_memtable_entries;
        }

        if want_flush {
            let _ = self.inner.flush_tx.try_send(());
        }
        Ok(())
    }
}
