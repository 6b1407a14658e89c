//! # SSTable - Sorted String Table
//!
//! Immutable, on-disk storage files for the CinderKV storage engine.
//!
//! When the in-memory [`memtable::Memtable`] exceeds its entry threshold the
//! engine flushes it to disk as an SSTable. SSTables are *write-once,
//! read-many* — once created they are never modified, only consumed by a
//! merge and then erased.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ record | record | record | ...                                │
//! │                                                               │
//! │ Records use the shared codec (24-byte checksummed header      │
//! │ followed by key and value bytes), sorted ascending by key,    │
//! │ one record per key. Tombstones are stored like live records   │
//! │ with the deleted flag set — they must survive to shadow       │
//! │ older tables.                                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no footer and no on-disk index. The sparse index (every
//! [`KEYS_PER_INDEX`]-th key with its byte offset, plus the min/max key
//! fence) is rebuilt by a single sequential scan on create and on open, so
//! the file and its index always describe the same byte sequence.

mod index;
mod merge;
mod table;

pub use index::KEYS_PER_INDEX;
pub use merge::merge;
pub use table::{SsTable, TableError};

#[cfg(test)]
mod tests;
