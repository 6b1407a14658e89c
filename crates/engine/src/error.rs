use sstable::TableError;
use std::io;
use thiserror::Error;
use wal::WalError;

/// The engine's error taxonomy, matched exhaustively at the API boundary.
///
/// Corruption errors (`BadMagic`, `BadChecksum`) surface through the
/// transparent `Wal`/`Table` wrappers. Tombstones never appear here: an
/// SSTable lookup that hits one is reported to callers as [`NotFound`].
///
/// [`NotFound`]: StoreError::NotFound
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller passed an empty key.
    #[error("empty key")]
    EmptyKey,

    /// The caller passed an empty value to `set`. Empty values are reserved
    /// for tombstones inside the engine, so accepting them would be
    /// ambiguous.
    #[error("empty value")]
    EmptyValue,

    /// The key is absent or deleted.
    #[error("not found")]
    NotFound,

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    #[error(transparent)]
    Wal(#[from] WalError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
