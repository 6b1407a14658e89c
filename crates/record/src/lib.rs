//! # Record — on-disk record codec
//!
//! The single wire format shared by the WAL and every SSTable in the
//! CinderKV storage engine. One record carries a key, a value, and a
//! deletion flag (tombstone).
//!
//! ## Binary layout
//!
//! ```text
//! [magic: u32 LE][deleted: u32 LE][key_len: u32 LE][val_len: u32 LE]
//! [checksum: u64 LE][key bytes][value bytes]
//! ```
//!
//! The checksum is XXH3-64 over the first sixteen header bytes followed by
//! the key bytes followed by the value bytes. Checksumming each record lets
//! a reader detect a torn append (power loss mid-write) and stop cleanly
//! instead of interpreting garbage as a mutation.
//!
//! Records are written as one `write_all` with no padding or alignment, so
//! a record's byte offset in a file is exactly the sum of the encoded
//! lengths of the records before it.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::hash::Hasher;
use std::io::{self, Read, Write};
use thiserror::Error;
use twox_hash::xxh3::Hash64 as Xxh3;

/// Magic identifying a record header.
pub const RECORD_MAGIC: u32 = 0x4CBD_ABDA;

/// Fixed header size: magic + deleted + key_len + val_len + checksum.
pub const HEADER_BYTES: usize = 4 + 4 + 4 + 4 + 8;

/// Maximum key size (64 KiB). Prevents OOM on corrupt length fields.
pub const MAX_KEY_BYTES: usize = 64 * 1024;
/// Maximum value size (10 MiB). Prevents OOM on corrupt length fields.
pub const MAX_VALUE_BYTES: usize = 10 * 1024 * 1024;

/// Errors produced by the codec.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The header's magic did not match [`RECORD_MAGIC`].
    #[error("bad record magic")]
    BadMagic,

    /// The recomputed checksum did not match the stored one.
    #[error("bad record checksum")]
    BadChecksum,

    /// An underlying I/O error (including a short read mid-record).
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A single key/value record. `deleted == true` marks a tombstone; the
/// engine writes tombstones with an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub deleted: bool,
}

impl Record {
    /// A live key/value record.
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            deleted: false,
        }
    }

    /// A tombstone for `key`.
    pub fn tombstone(key: Vec<u8>) -> Self {
        Self {
            key,
            value: Vec::new(),
            deleted: true,
        }
    }

    /// Encoded size of this record on disk.
    pub fn encoded_len(&self) -> usize {
        HEADER_BYTES + self.key.len() + self.value.len()
    }

    /// Serializes the record and writes it as a single append.
    ///
    /// Keys larger than [`MAX_KEY_BYTES`] and values larger than
    /// [`MAX_VALUE_BYTES`] are rejected as invalid input.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), RecordError> {
        Self::write_parts(w, &self.key, &self.value, self.deleted)
    }

    /// Writes a record assembled from borrowed parts. Lets the flush path
    /// stream memtable entries without building owned `Record`s.
    pub fn write_parts<W: Write>(
        w: &mut W,
        key: &[u8],
        value: &[u8],
        deleted: bool,
    ) -> Result<(), RecordError> {
        if key.len() > MAX_KEY_BYTES || value.len() > MAX_VALUE_BYTES {
            return Err(RecordError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "record key or value exceeds maximum size",
            )));
        }

        let mut buf = Vec::with_capacity(HEADER_BYTES + key.len() + value.len());
        buf.write_u32::<LittleEndian>(RECORD_MAGIC)?;
        buf.write_u32::<LittleEndian>(u32::from(deleted))?;
        buf.write_u32::<LittleEndian>(key.len() as u32)?;
        buf.write_u32::<LittleEndian>(value.len() as u32)?;

        let sum = checksum(&buf[..16], key, value);
        buf.write_u64::<LittleEndian>(sum)?;
        buf.extend_from_slice(key);
        buf.extend_from_slice(value);

        w.write_all(&buf)?;
        Ok(())
    }

    /// Reads one record.
    ///
    /// Returns `Ok(None)` on EOF at the first header byte — the only
    /// non-error stop condition. A partial header or a short key/value read
    /// surfaces as `RecordError::Io` with `UnexpectedEof`; callers that
    /// tolerate torn tails (WAL replay) treat that, `BadMagic`, and
    /// `BadChecksum` as end-of-log.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Option<Record>, RecordError> {
        let mut header = [0u8; HEADER_BYTES];
        let mut filled = 0;
        while filled < HEADER_BYTES {
            let n = r.read(&mut header[filled..])?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(RecordError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated record header",
                )));
            }
            filled += n;
        }

        let mut hdr = &header[..];
        let magic = hdr.read_u32::<LittleEndian>()?;
        if magic != RECORD_MAGIC {
            return Err(RecordError::BadMagic);
        }
        let deleted = hdr.read_u32::<LittleEndian>()?;
        let key_len = hdr.read_u32::<LittleEndian>()? as usize;
        let val_len = hdr.read_u32::<LittleEndian>()? as usize;
        let stored_sum = hdr.read_u64::<LittleEndian>()?;

        if key_len > MAX_KEY_BYTES || val_len > MAX_VALUE_BYTES {
            return Err(RecordError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "record length field out of range",
            )));
        }

        let mut key = vec![0u8; key_len];
        r.read_exact(&mut key)?;
        let mut value = vec![0u8; val_len];
        r.read_exact(&mut value)?;

        if checksum(&header[..16], &key, &value) != stored_sum {
            return Err(RecordError::BadChecksum);
        }

        Ok(Some(Record {
            key,
            value,
            deleted: deleted != 0,
        }))
    }
}

fn checksum(header_prefix: &[u8], key: &[u8], value: &[u8]) -> u64 {
    let mut h = Xxh3::with_seed(0);
    h.write(header_prefix);
    h.write(key);
    h.write(value);
    h.finish()
}
