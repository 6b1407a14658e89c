use memtable::{Entry, Memtable};
use record::{Record, RecordError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

use crate::index::SparseIndex;

/// Errors from SSTable operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// The table handle was closed or erased.
    #[error("sstable is closed")]
    Closed,

    /// A record failed to decode (corruption) or encode.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Handle to one immutable sorted table on disk.
///
/// The lock protects the owning file handle and the sparse index: lookups
/// take it shared, `close` and `erase` take it exclusive, so no new lookup
/// can begin once `erase` has returned. Lookups read through their own
/// short-lived read handle, which keeps concurrent `get`s from contending
/// on a shared seek position.
pub struct SsTable {
    path: PathBuf,
    pub(crate) state: RwLock<TableState>,
}

pub(crate) struct TableState {
    /// Owning handle, held for the table's lifetime. `None` once closed.
    pub(crate) file: Option<File>,
    pub(crate) index: SparseIndex,
}

impl std::fmt::Debug for SsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsTable").field("path", &self.path).finish()
    }
}

impl SsTable {
    pub(crate) fn from_parts(path: PathBuf, state: RwLock<TableState>) -> SsTable {
        SsTable { path, state }
    }

    /// Writes a new SSTable at `path` from the memtable's contents and
    /// returns a handle to it.
    ///
    /// The file is created exclusively (`create_new`) — a leftover file at
    /// the same path is an error, never silently overwritten. Entries are
    /// streamed in key order, tombstones included, then the file is fsynced
    /// and scanned once to build the sparse index. Any failure after the
    /// create closes and unlinks the partial file.
    pub fn create<P: AsRef<Path>>(path: P, mem: &Memtable) -> Result<SsTable, TableError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(&path)?;

        match write_and_index(&file, mem) {
            Ok(index) => Ok(SsTable {
                path,
                state: RwLock::new(TableState {
                    file: Some(file),
                    index,
                }),
            }),
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&path);
                Err(e)
            }
        }
    }

    /// Opens an existing SSTable and rebuilds its sparse index by scanning.
    ///
    /// A failure anywhere during the scan closes the file and fails the
    /// open; the file itself is left on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SsTable, TableError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let index = SparseIndex::scan(&file)?;

        Ok(SsTable {
            path,
            state: RwLock::new(TableState {
                file: Some(file),
                index,
            }),
        })
    }

    /// Point lookup.
    ///
    /// Returns `Ok(None)` when the key is not stored in this table,
    /// `Ok(Some(Entry::Tombstone))` when it is stored deleted, and
    /// `Ok(Some(Entry::Value(..)))` when it is stored live. The caller
    /// decides what a tombstone means — here it is just a stored record.
    pub fn get(&self, key: &[u8]) -> Result<Option<Entry>, TableError> {
        let state = self.state.read().unwrap();
        if state.file.is_none() {
            return Err(TableError::Closed);
        }

        if !state.index.covers(key) {
            return Ok(None);
        }
        let offset = match state.index.seek_offset(key) {
            Some(o) => o,
            None => return Ok(None),
        };

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut rdr = BufReader::new(file);

        while let Some(rec) = Record::read_from(&mut rdr)? {
            if rec.key.as_slice() > key {
                break;
            }
            if rec.key == key {
                return Ok(Some(if rec.deleted {
                    Entry::Tombstone
                } else {
                    Entry::Value(rec.value)
                }));
            }
        }

        Ok(None)
    }

    /// Releases the file handle. The file stays on disk.
    pub fn close(&self) {
        let mut state = self.state.write().unwrap();
        state.file = None;
    }

    /// Closes the table and unlinks its file. Once this returns no new
    /// lookup can begin against the table.
    pub fn erase(&self) {
        let mut state = self.state.write().unwrap();
        if state.file.take().is_some() {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("failed to unlink {}: {}", self.path.display(), e);
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Smallest key in the table, or `None` for an empty table.
    pub fn min_key(&self) -> Option<Vec<u8>> {
        self.state.read().unwrap().index.min_key().map(<[u8]>::to_vec)
    }

    /// Largest key in the table, or `None` for an empty table.
    pub fn max_key(&self) -> Option<Vec<u8>> {
        self.state.read().unwrap().index.max_key().map(<[u8]>::to_vec)
    }
}

fn write_and_index(file: &File, mem: &Memtable) -> Result<SparseIndex, TableError> {
    let mut w = BufWriter::new(file);
    for (key, entry) in mem.iter() {
        match entry {
            Entry::Value(v) => Record::write_parts(&mut w, key, v, false)?,
            Entry::Tombstone => Record::write_parts(&mut w, key, &[], true)?,
        }
    }
    w.flush()?;
    drop(w);

    file.sync_all()?;
    SparseIndex::scan(file)
}
