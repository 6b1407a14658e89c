//! # Engine - CinderKV Storage Engine
//!
//! The central orchestrator that ties together the [`memtable`], [`wal`],
//! and [`sstable`] crates into a complete LSM key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client (any thread)
//!   |
//!   v
//! ┌─────────────────────────────────────────────────┐
//! │                    STORE                        │
//! │                                                 │
//! │ write.rs → WAL append + fsync → Memtable upsert │
//! │              |                                  │
//! │              | (entry count over threshold?)    │
//! │              v                                  │
//! │        flush signal ──► background worker       │
//! │                            |                    │
//! │              flush: memtable → lsm_<seq>.sstable│
//! │              merge: two newest → one fresh seq  │
//! │                                                 │
//! │ read.rs → Memtable → SSTables (newest seq first)│
//! │             (first table that stores the key    │
//! │              wins; tombstones read as NotFound) │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module         | Purpose                                             |
//! |----------------|-----------------------------------------------------|
//! | `lib.rs`       | `Store` struct, config, open/close, `Debug`, `Drop` |
//! | [`recovery`]   | Directory scan, WAL replay, recovery flush          |
//! | [`write`]      | `set()`, `delete()`                                 |
//! | [`read`]       | `get()`                                             |
//! | [`compaction`] | Flush, pairwise merge, background worker loop       |
//! | [`error`]      | `StoreError` taxonomy                               |
//!
//! ## Crash safety
//!
//! Every write is appended (and fsynced) to the WAL **before** the memtable
//! update. The WAL is truncated only **after** a flushed SSTable has been
//! registered. New SSTables are created exclusively and fsynced before
//! registration; merge inputs are erased only after the merged output is
//! registered. On open, an existing WAL is replayed and force-flushed, so a
//! crash at any point loses nothing that was acknowledged.
//!
//! ## Recency
//!
//! Every SSTable is named `lsm_<seq>.sstable` by a strictly increasing
//! counter, bumped on each flush and merge and resumed from `max(seq)` on
//! restart. For a given key the table with the largest `seq` that stores it
//! wins, and a merge output always carries a larger `seq` than its inputs,
//! so the newest-first read path stays correct under compaction.

mod compaction;
mod error;
mod read;
mod recovery;
mod write;

pub use error::StoreError;

use crossbeam_channel::Sender;
use memtable::Memtable;
use sstable::SsTable;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wal::Wal;

/// Name of the write-ahead log inside the store's root directory. Its
/// presence is what distinguishes an existing store from a fresh one.
pub const WAL_FILE_NAME: &str = "lsm.log";

/// Tuning knobs for a [`Store`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Memtable entry count (tombstones included) above which a flush is
    /// requested.
    pub max_memtable_entries: usize,
    /// How often the background worker attempts a merge of the two newest
    /// SSTables.
    pub merge_interval: Duration,
    /// How often the background worker checks the flush threshold, in
    /// addition to the signal sent by writers.
    pub flush_interval: Duration,
    /// If `true`, every WAL append is followed by `fsync`.
    pub wal_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memtable_entries: 1000,
            merge_interval: Duration::from_secs(1),
            flush_interval: Duration::from_millis(100),
            wal_sync: true,
        }
    }
}

/// Memtable plus the closing flag, guarded together by one lock.
pub(crate) struct MemState {
    pub(crate) table: Memtable,
    pub(crate) closing: bool,
}

/// Shared engine state. All mutation goes through the locks; the lock order
/// is compact lock, then memtable, then WAL or table set — never the other
/// way around.
pub(crate) struct StoreInner {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
    pub(crate) mem: RwLock<MemState>,
    /// `None` once the store is closed. Guarded by the `closing` flag: no
    /// writer can reach the WAL after `closing` is set.
    pub(crate) wal: Mutex<Option<Wal>>,
    /// Live SSTables by `seq`. `BTreeMap` keeps them ordered so the read
    /// path can walk strictly decreasing `seq`.
    pub(crate) tables: RwLock<BTreeMap<u64, Arc<SsTable>>>,
    /// Creation counter for SSTables; larger is newer. Survives restarts by
    /// resuming from the largest on-disk `seq`.
    pub(crate) time: AtomicU64,
    /// Serializes flush and merge. Without it a merge could register its
    /// output at a `seq` above a concurrently flushed table that carries
    /// newer data, breaking the newest-seq-wins read path.
    pub(crate) compact_lock: Mutex<()>,
    /// Coalescing flush signal to the background worker.
    pub(crate) flush_tx: Sender<()>,
}

impl StoreInner {
    pub(crate) fn table_path(&self, seq: u64) -> PathBuf {
        self.root.join(format!("lsm_{}.sstable", seq))
    }
}

/// A thread-safe LSM key-value store rooted at one directory.
///
/// # Write path
///
/// 1. Append the record to the WAL and fsync (crash-safe durability).
/// 2. Upsert into the memtable (tombstone for `delete`).
/// 3. Signal the background worker when the memtable is over threshold.
///
/// # Read path
///
/// 1. Check the memtable (freshest data, includes tombstones).
/// 2. Check SSTables from largest `seq` to smallest; the first table that
///    stores the key decides — a tombstone means `NotFound`.
///
/// # Recovery
///
/// [`Store::open`] on a directory with an existing `lsm.log` indexes every
/// `lsm_<seq>.sstable`, replays the WAL into a fresh memtable, force-flushes
/// it, and truncates the WAL.
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
    /// Rendezvous stop signal: `send` completes only once the worker has
    /// taken it, so close cannot race a mid-loop worker.
    stop_tx: Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Store {
    /// Opens the store rooted at `root`, creating it if no WAL exists there.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on a corrupt SSTable, or when a fresh store
    /// races another instance for the exclusive WAL create.
    pub fn open<P: AsRef<Path>>(root: P, config: Config) -> Result<Store, StoreError> {
        let root = root.as_ref().to_path_buf();
        if root.join(WAL_FILE_NAME).exists() {
            Self::recover(root, config)
        } else {
            Self::create(root, config)
        }
    }

    fn create(root: PathBuf, config: Config) -> Result<Store, StoreError> {
        fs::create_dir_all(&root)?;
        let wal = Wal::create(root.join(WAL_FILE_NAME), config.wal_sync)?;
        log::info!("created store at {}", root.display());

        Self::start(root, config, Memtable::new(), wal, BTreeMap::new(), 0, false)
    }

    fn recover(root: PathBuf, config: Config) -> Result<Store, StoreError> {
        let tables = recovery::load_tables(&root)?;
        let time = tables.keys().next_back().copied().unwrap_or(0);

        let mut mem = Memtable::new();
        let replayed = Wal::replay(root.join(WAL_FILE_NAME), |rec| {
            if rec.deleted {
                mem.remove(rec.key);
            } else {
                mem.insert(rec.key, rec.value);
            }
        })?;
        log::info!(
            "opened store at {}: {} tables, {} WAL records replayed",
            root.display(),
            tables.len(),
            replayed
        );

        let wal = Wal::append_to(root.join(WAL_FILE_NAME), config.wal_sync)?;
        Self::start(root, config, mem, wal, tables, time, true)
    }

    fn start(
        root: PathBuf,
        config: Config,
        mem: Memtable,
        wal: Wal,
        tables: BTreeMap<u64, Arc<SsTable>>,
        time: u64,
        recovered: bool,
    ) -> Result<Store, StoreError> {
        let (flush_tx, flush_rx) = crossbeam_channel::bounded(1);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);

        let inner = Arc::new(StoreInner {
            root,
            config,
            mem: RwLock::new(MemState {
                table: mem,
                closing: false,
            }),
            wal: Mutex::new(Some(wal)),
            tables: RwLock::new(tables),
            time: AtomicU64::new(time),
            compact_lock: Mutex::new(()),
            flush_tx,
        });

        if recovered {
            // Persist the replayed memtable as SSTable seq = time + 1, then
            // clear the log unconditionally so a discarded torn tail cannot
            // hide records appended after it.
            inner.flush(true)?;
            if let Some(wal) = inner.wal.lock().unwrap().as_mut() {
                wal.truncate()?;
            }
        }

        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("cinder-background".to_owned())
            .spawn(move || compaction::run(&worker_inner, &flush_rx, &stop_rx))?;

        Ok(Store {
            inner,
            stop_tx,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Forces a flush of the current memtable to a new SSTable. A no-op when
    /// the memtable is empty.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.inner.flush(true)
    }

    /// Shuts the store down: stops the background worker, closes every
    /// SSTable, and syncs the WAL. Idempotent; also run by `Drop`.
    ///
    /// Unflushed memtable contents stay durable in the WAL and are recovered
    /// by the next [`Store::open`].
    pub fn close(&self) {
        {
            let mut mem = self.inner.mem.write().unwrap();
            if mem.closing {
                return;
            }
            mem.closing = true;
        }

        // Rendezvous with the worker, then reap it. A send error means the
        // worker is already gone.
        let _ = self.stop_tx.send(());
        if let Some(worker) = self.worker.lock().unwrap().take() {
            let _ = worker.join();
        }

        {
            let tables = self.inner.tables.read().unwrap();
            for table in tables.values() {
                table.close();
            }
        }
        if let Some(mut wal) = self.inner.wal.lock().unwrap().take() {
            if let Err(e) = wal.sync() {
                log::warn!("wal sync on close failed: {}", e);
            }
        }
        log::info!("closed store at {}", self.inner.root.display());
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Number of live SSTables.
    pub fn table_count(&self) -> usize {
        self.inner.tables.read().unwrap().len()
    }

    /// Number of memtable entries, tombstones included.
    pub fn memtable_len(&self) -> usize {
        self.inner.mem.read().unwrap().table.len()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mem = self.inner.mem.read().unwrap();
        let tables = self.inner.tables.read().unwrap();
        f.debug_struct("Store")
            .field("root", &self.inner.root)
            .field("time", &self.inner.time.load(std::sync::atomic::Ordering::SeqCst))
            .field("memtable_entries", &mem.table.len())
            .field("closing", &mem.closing)
            .field("table_seqs", &tables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests;
