//! Flush, pairwise merge, and the background worker.
//!
//! Flush turns the memtable into a new SSTable at a fresh `seq` and then
//! truncates the WAL. Merge combines the two newest SSTables into one at a
//! fresh `seq` — the output always outranks both inputs, so the newest-first
//! read path stays correct across any later merge.
//!
//! The worker is one dedicated thread multiplexing {merge tick, flush tick,
//! flush-requested, stop}. Writers signal it through a bounded(1) channel so
//! requests coalesce instead of queueing; stop is a rendezvous send that the
//! closer follows with a join. Worker errors are logged and retried on the
//! next tick.

use crossbeam_channel::{select, tick, Receiver};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::{MemState, StoreError, StoreInner};

impl StoreInner {
    fn should_flush(&self, mem: &MemState, force: bool) -> bool {
        !mem.closing && (force || mem.table.len() > self.config.max_memtable_entries)
    }

    /// Flushes the memtable to a new SSTable and truncates the WAL.
    ///
    /// Under the exclusive memtable lock: skip when empty (or below
    /// threshold and not forced); assign `seq`; write `lsm_<seq>.sstable`;
    /// register it in the table set; reset the memtable; truncate the WAL —
    /// in that order. If the SSTable write fails the WAL is kept and the
    /// memtable is untouched, so the next open replays everything.
    pub(crate) fn flush(&self, force: bool) -> Result<(), StoreError> {
        {
            let mem = self.mem.read().unwrap();
            if mem.table.is_empty() || !self.should_flush(&mem, force) {
                return Ok(());
            }
        }

        let _compact = self.compact_lock.lock().unwrap();
        let mut mem = self.mem.write().unwrap();
        if mem.table.is_empty() || !self.should_flush(&mem, force) {
            return Ok(());
        }

        let seq = self.time.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.table_path(seq);
        log::info!("flushing {} entries to {}", mem.table.len(), path.display());

        let table = sstable::SsTable::create(&path, &mem.table)?;
        self.tables.write().unwrap().insert(seq, Arc::new(table));

        mem.table.clear();
        if let Some(wal) = self.wal.lock().unwrap().as_mut() {
            wal.truncate()?;
        }
        Ok(())
    }

    /// Merges the two SSTables with the largest `seq`s into one.
    ///
    /// A no-op with fewer than two tables. The table-set lock is held only
    /// for picking the inputs and for the registration/removal swap; the
    /// input files are erased last, after the swap, so a failed merge leaves
    /// them untouched and the next tick retries.
    pub(crate) fn merge_once(&self) -> Result<(), StoreError> {
        let _compact = self.compact_lock.lock().unwrap();

        let (curr_seq, curr, prev_seq, prev) = {
            let tables = self.tables.read().unwrap();
            if tables.len() < 2 {
                return Ok(());
            }
            let mut newest = tables.iter().rev();
            let (curr_seq, curr) = match newest.next() {
                Some((s, t)) => (*s, Arc::clone(t)),
                None => return Ok(()),
            };
            let (prev_seq, prev) = match newest.next() {
                Some((s, t)) => (*s, Arc::clone(t)),
                None => return Ok(()),
            };
            (curr_seq, curr, prev_seq, prev)
        };

        let seq = self.time.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.table_path(seq);
        log::info!(
            "merging seq {} + {} into {}",
            prev_seq,
            curr_seq,
            path.display()
        );

        let merged = sstable::merge(&prev, &curr, &path)?;

        {
            let mut tables = self.tables.write().unwrap();
            tables.insert(seq, Arc::new(merged));
            tables.remove(&prev_seq);
            tables.remove(&curr_seq);
        }

        prev.erase();
        curr.erase();
        Ok(())
    }
}

/// Background worker loop. Runs until the stop rendezvous (or until the
/// stop sender is dropped).
pub(crate) fn run(inner: &StoreInner, flush_rx: &Receiver<()>, stop_rx: &Receiver<()>) {
    let merge_tick = tick(inner.config.merge_interval);
    let flush_tick = tick(inner.config.flush_interval);
    log::debug!("background worker started");

    loop {
        select! {
            recv(merge_tick) -> _ => {
                merge_step(inner);
            }
            recv(flush_tick) -> _ => {
                flush_step(inner);
                merge_step(inner);
            }
            recv(flush_rx) -> _ => {
                flush_step(inner);
                merge_step(inner);
            }
            recv(stop_rx) -> _ => {
                log::debug!("background worker stopping");
                return;
            }
        }
    }
}

fn flush_step(inner: &StoreInner) {
    if let Err(e) = inner.flush(false) {
        log::error!("background flush failed: {}", e);
    }
}

fn merge_step(inner: &StoreInner) {
    if let Err(e) = inner.merge_once() {
        log::error!("background merge failed: {}", e);
    }
}
