use record::Record;
use std::io::{BufReader, Read, Seek, SeekFrom};

use crate::table::TableError;

/// Sampling interval: one sparse-index entry per this many records.
pub const KEYS_PER_INDEX: usize = 128;

/// In-memory sparse index over one SSTable file.
///
/// Holds every [`KEYS_PER_INDEX`]-th key with the byte offset of its record,
/// plus the smallest and largest key in the file. A point lookup
/// binary-searches the samples for the closest preceding offset and scans at
/// most one sampling interval of records from there; the min/max fence
/// answers out-of-range keys without any disk I/O.
#[derive(Debug, Default)]
pub(crate) struct SparseIndex {
    /// `(key, offset)` samples in ascending key order.
    samples: Vec<(Vec<u8>, u64)>,
    min_key: Option<Vec<u8>>,
    max_key: Option<Vec<u8>>,
}

impl SparseIndex {
    /// Builds the index by scanning `file` from the start.
    ///
    /// Every record is decoded (which also verifies its checksum); the
    /// pre-record offset of each sampled key is captured before the record
    /// is read. Any decode failure fails the scan — a torn SSTable is not
    /// recoverable the way a torn WAL tail is.
    pub(crate) fn scan<R: Read + Seek>(src: R) -> Result<SparseIndex, TableError> {
        let mut rdr = BufReader::new(src);
        rdr.seek(SeekFrom::Start(0))?;

        let mut index = SparseIndex::default();
        let mut i = 0usize;

        loop {
            let offset = rdr.stream_position()?;
            let rec = match Record::read_from(&mut rdr)? {
                Some(rec) => rec,
                None => break,
            };

            match &index.min_key {
                Some(min) if *min <= rec.key => {}
                _ => index.min_key = Some(rec.key.clone()),
            }
            match &index.max_key {
                Some(max) if *max >= rec.key => {}
                _ => index.max_key = Some(rec.key.clone()),
            }

            if i % KEYS_PER_INDEX == 0 {
                index.samples.push((rec.key, offset));
            }
            i += 1;
        }

        Ok(index)
    }

    /// `true` if `key` falls inside the `[min_key, max_key]` fence. An empty
    /// table covers nothing.
    pub(crate) fn covers(&self, key: &[u8]) -> bool {
        match (&self.min_key, &self.max_key) {
            (Some(min), Some(max)) => min.as_slice() <= key && key <= max.as_slice(),
            _ => false,
        }
    }

    /// Byte offset to start scanning from: the offset of the largest sampled
    /// key `<= key`, or of the first sample when `key` precedes it.
    pub(crate) fn seek_offset(&self, key: &[u8]) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let pos = self.samples.partition_point(|(k, _)| k.as_slice() <= key);
        Some(self.samples[pos.saturating_sub(1)].1)
    }

    pub(crate) fn min_key(&self) -> Option<&[u8]> {
        self.min_key.as_deref()
    }

    pub(crate) fn max_key(&self) -> Option<&[u8]> {
        self.max_key.as_deref()
    }
}
