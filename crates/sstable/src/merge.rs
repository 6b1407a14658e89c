//! Two-way streaming merge of SSTables.
//!
//! Produces one output table from two inputs, reading a single record ahead
//! on each side, so memory stays flat regardless of table size. When both
//! sides hold the same key, the newer table's record wins. Tombstones are
//! **preserved**, not elided — a tombstone in either input may still shadow
//! an older table that is not part of this merge.

use record::Record;
use std::cmp::Ordering;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::RwLock;

use crate::index::SparseIndex;
use crate::table::{SsTable, TableError, TableState};

/// Merges `prev` (older) and `curr` (newer) into a new table at `path`.
///
/// Both inputs are read under their shared locks and left untouched; the
/// output is created exclusively, fsynced, and indexed before the handle is
/// returned. Failure at any step unlinks the partial output.
pub fn merge(prev: &SsTable, curr: &SsTable, path: &Path) -> Result<SsTable, TableError> {
    let prev_state = prev.state.read().unwrap();
    let curr_state = curr.state.read().unwrap();
    if prev_state.file.is_none() || curr_state.file.is_none() {
        return Err(TableError::Closed);
    }

    let out_file = OpenOptions::new()
        .create_new(true)
        .read(true)
        .write(true)
        .open(path)?;

    match write_merged(prev.path(), curr.path(), &out_file) {
        Ok(index) => Ok(SsTable::from_parts(
            path.to_path_buf(),
            RwLock::new(TableState {
                file: Some(out_file),
                index,
            }),
        )),
        Err(e) => {
            drop(out_file);
            let _ = fs::remove_file(path);
            Err(e)
        }
    }
}

fn write_merged(
    prev_path: &Path,
    curr_path: &Path,
    out_file: &File,
) -> Result<SparseIndex, TableError> {
    let mut prev_rdr = BufReader::new(File::open(prev_path)?);
    let mut curr_rdr = BufReader::new(File::open(curr_path)?);
    let mut out = BufWriter::new(out_file);

    let mut prev_next = Record::read_from(&mut prev_rdr)?;
    let mut curr_next = Record::read_from(&mut curr_rdr)?;

    loop {
        match (prev_next.take(), curr_next.take()) {
            (None, None) => break,
            (Some(p), None) => {
                p.write_to(&mut out)?;
                prev_next = Record::read_from(&mut prev_rdr)?;
            }
            (None, Some(c)) => {
                c.write_to(&mut out)?;
                curr_next = Record::read_from(&mut curr_rdr)?;
            }
            (Some(p), Some(c)) => match p.key.cmp(&c.key) {
                Ordering::Less => {
                    p.write_to(&mut out)?;
                    prev_next = Record::read_from(&mut prev_rdr)?;
                    curr_next = Some(c);
                }
                Ordering::Greater => {
                    c.write_to(&mut out)?;
                    curr_next = Record::read_from(&mut curr_rdr)?;
                    prev_next = Some(p);
                }
                Ordering::Equal => {
                    // Same key on both sides: the newer table wins.
                    c.write_to(&mut out)?;
                    prev_next = Record::read_from(&mut prev_rdr)?;
                    curr_next = Record::read_from(&mut curr_rdr)?;
                }
            },
        }
    }

    out.flush()?;
    drop(out);

    out_file.sync_all()?;
    SparseIndex::scan(out_file)
}
