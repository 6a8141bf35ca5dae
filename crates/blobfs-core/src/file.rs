//! The file abstraction implemented by blob store handles.
//!
//! [`BlobFile`] mirrors an ordinary asynchronous file interface: offset
//! writes, ranged reads, truncate, sync, flush, size. Blob store handles
//! implement only the half that makes sense for them —
//! [`BlobStoreWriteFile`](crate::write::BlobStoreWriteFile) rejects reads
//! and [`BlobStoreReadFile`](crate::read::BlobStoreReadFile) rejects
//! writes — and neither supports zero-copy access.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BlobFileResult;

/// An asynchronous file handle backed by a blob store object.
///
/// `#[async_trait]` keeps the trait object-safe so callers can hold
/// `Box<dyn BlobFile>` alongside other file backends.
#[async_trait]
pub trait BlobFile: Send {
    /// Read up to `length` bytes starting at `offset`.
    async fn read(&self, length: usize, offset: i64) -> BlobFileResult<Bytes>;

    /// Write `data` at `offset`, which must equal the current cursor.
    async fn write(&mut self, data: &[u8], offset: i64) -> BlobFileResult<()>;

    /// Truncate the file to `size`. Blob store files only accept a no-op
    /// truncate to the current cursor.
    async fn truncate(&mut self, size: i64) -> BlobFileResult<()>;

    /// Resolve once all written data is committed remotely.
    async fn sync(&mut self) -> BlobFileResult<()>;

    /// Flush buffered data. See each implementation for its semantics.
    async fn flush(&mut self) -> BlobFileResult<()>;

    /// The logical size of the file in bytes.
    async fn size(&self) -> BlobFileResult<i64>;

    /// Zero-copy read access. Unsupported by blob store files.
    async fn read_zero_copy(&self, length: usize, offset: i64) -> BlobFileResult<Bytes>;

    /// The object name this handle refers to.
    fn filename(&self) -> &str;
}
