use crate::{Config, Store};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Fast ticks and no fsync: keeps the background worker responsive in tests
/// without waiting out production intervals.
pub fn test_config() -> Config {
    Config {
        max_memtable_entries: 1000,
        merge_interval: Duration::from_millis(25),
        flush_interval: Duration::from_millis(10),
        wal_sync: false,
    }
}

/// Worker ticks pushed out past the test's lifetime, so flushes and merges
/// happen only when the test invokes them.
pub fn quiet_config() -> Config {
    Config {
        max_memtable_entries: 1000,
        merge_interval: Duration::from_secs(3600),
        flush_interval: Duration::from_secs(3600),
        wal_sync: false,
    }
}

pub fn open_store(root: &Path) -> Store {
    Store::open(root, test_config()).unwrap()
}

pub fn open_quiet_store(root: &Path) -> Store {
    Store::open(root, quiet_config()).unwrap()
}

/// Number of `lsm_<seq>.sstable` files in `root`.
pub fn count_table_files(root: &Path) -> usize {
    table_seqs(root).len()
}

/// Sorted `seq`s of the table files in `root`.
pub fn table_seqs(root: &Path) -> Vec<u64> {
    let mut seqs: Vec<u64> = fs::read_dir(root)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().and_then(crate::recovery::parse_table_seq))
        .collect();
    seqs.sort_unstable();
    seqs
}

/// Polls `pred` until it holds or `timeout` elapses.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut pred: F) -> bool {
    let start = Instant::now();
    loop {
        if pred() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
