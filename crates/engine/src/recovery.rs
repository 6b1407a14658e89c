//! Cold-start recovery: indexing existing SSTables from the root directory.
//!
//! The table registry is not persisted separately — it is rebuilt on every
//! open from the `lsm_<seq>.sstable` filenames, and the `seq` counter
//! resumes from the largest one found. Files that do not match the pattern
//! are ignored.

use sstable::SsTable;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::StoreError;

/// Opens every `lsm_<seq>.sstable` under `root`, keyed by `seq`.
///
/// # Errors
///
/// Fails if a matching table cannot be opened or indexed — a corrupt table
/// is not silently skipped.
pub(crate) fn load_tables(root: &Path) -> Result<BTreeMap<u64, Arc<SsTable>>, StoreError> {
    let mut tables = BTreeMap::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(seq) = parse_table_seq(name) else { continue };

        let table = SsTable::open(entry.path())?;
        log::info!("indexed {}", name);
        tables.insert(seq, Arc::new(table));
    }

    Ok(tables)
}

/// Parses a `lsm_<seq>.sstable` filename; anything else yields `None`.
pub(crate) fn parse_table_seq(name: &str) -> Option<u64> {
    let digits = name.strip_prefix("lsm_")?.strip_suffix(".sstable")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
