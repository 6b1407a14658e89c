//! # WAL — Write-Ahead Log
//!
//! Crash-safe durability for the CinderKV storage engine.
//!
//! Every mutation is serialized with the [`record`] codec and appended to
//! the log **before** the corresponding memtable update. On restart the log
//! is replayed to reconstruct the memtable, so no acknowledged write is
//! lost. A `set` appends a live record; a `delete` appends a tombstone.
//!
//! The log is truncated to zero length only after a memtable flush has
//! produced (and registered) an SSTable containing the same mutations.
//!
//! ## Torn tails
//!
//! A power loss during an append leaves a partial record at the end of the
//! file. Replay treats an unreadable header, bad magic, bad checksum, or
//! short tail as a clean end of log: every complete record before it is
//! applied and the tail is discarded. The record magic and per-record
//! checksum guarantee garbage is never interpreted as a mutation.

use record::{Record, RecordError};
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, ErrorKind};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A codec failure while appending or replaying (other than the
    /// tolerated torn-tail cases).
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Append-only WAL writer.
///
/// When `sync` is `true` every append is followed by `sync_all()` (fsync),
/// so the record is durable before the call returns.
pub struct Wal {
    file: File,
    sync: bool,
}

impl Wal {
    /// Exclusively creates a new, empty WAL file. Fails if the file already
    /// exists — an existing log means an existing store that must be
    /// recovered first.
    pub fn create<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)?;
        Ok(Self { file, sync })
    }

    /// Opens an existing WAL file for appending.
    pub fn append_to<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file, sync })
    }

    /// Appends one record, fsyncing before returning when `sync` is set.
    pub fn append(&mut self, rec: &Record) -> Result<(), WalError> {
        rec.write_to(&mut self.file)?;
        if self.sync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Truncates the log to zero length. Called after a flushed SSTable has
    /// been registered; the next append starts at offset zero.
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.file.set_len(0)?;
        Ok(())
    }

    /// Forces buffered data to disk.
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Replays every complete record in the log in append order, calling
    /// `apply` for each. Returns the number of records applied.
    ///
    /// # Termination
    ///
    /// - Clean EOF → `Ok(count)`.
    /// - Torn tail (partial header, short key/value read, bad magic, bad
    ///   checksum) → `Ok(count)` after the complete records before it; the
    ///   discarded tail is logged.
    /// - Any other I/O error → `Err`.
    pub fn replay<P, F>(path: P, mut apply: F) -> Result<usize, WalError>
    where
        P: AsRef<Path>,
        F: FnMut(Record),
    {
        let file = File::open(path.as_ref())?;
        let mut rdr = BufReader::new(file);
        let mut count = 0usize;

        loop {
            match Record::read_from(&mut rdr) {
                Ok(Some(rec)) => {
                    apply(rec);
                    count += 1;
                }
                Ok(None) => return Ok(count),
                Err(e) if is_torn_tail(&e) => {
                    log::warn!(
                        "discarding torn tail of {} after {} records: {}",
                        path.as_ref().display(),
                        count,
                        e
                    );
                    return Ok(count);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// A torn trailing record: the expected leftover of an append interrupted by
/// a crash. Anything else is real corruption or an I/O fault.
fn is_torn_tail(err: &RecordError) -> bool {
    match err {
        RecordError::BadMagic | RecordError::BadChecksum => true,
        RecordError::Io(e) => e.kind() == ErrorKind::UnexpectedEof,
    }
}
