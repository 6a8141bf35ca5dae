//! The read handle: ranged GETs against a finished object.
//!
//! [`BlobStoreReadFile`] is stateless relative to the write machinery:
//! every read is an independent ranged GET and the object size is a
//! metadata query cached per handle. Writes, truncate, and zero-copy
//! access are rejected.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::OnceCell;
use tracing::error;

use crate::endpoint::BlobStoreEndpoint;
use crate::error::{BlobFileError, BlobFileResult};
use crate::file::BlobFile;

/// A read-only file that lives in an S3-style blob store.
pub struct BlobStoreReadFile {
    endpoint: Arc<dyn BlobStoreEndpoint>,
    bucket: String,
    key: String,
    /// Remote object size, fetched once on first use.
    size: OnceCell<i64>,
}

impl BlobStoreReadFile {
    /// Create a read handle for `bucket`/`key` on the given endpoint.
    #[must_use]
    pub fn new(
        endpoint: Arc<dyn BlobStoreEndpoint>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            bucket: bucket.into(),
            key: key.into(),
            size: OnceCell::new(),
        }
    }

    /// Read up to `length` bytes starting at `offset` via a ranged GET.
    pub async fn read(&self, length: usize, offset: i64) -> BlobFileResult<Bytes> {
        self.endpoint
            .read_object_range(&self.bucket, &self.key, offset, length)
            .await
    }

    /// The remote object size, cached after the first metadata query.
    pub async fn size(&self) -> BlobFileResult<i64> {
        self.size
            .get_or_try_init(|| async { self.endpoint.object_size(&self.bucket, &self.key).await })
            .await
            .copied()
    }

    /// The object key this handle reads from.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for BlobStoreReadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStoreReadFile")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("size", &self.size.get())
            .finish()
    }
}

#[async_trait]
impl BlobFile for BlobStoreReadFile {
    async fn read(&self, length: usize, offset: i64) -> BlobFileResult<Bytes> {
        Self::read(self, length, offset).await
    }

    async fn write(&mut self, _data: &[u8], _offset: i64) -> BlobFileResult<()> {
        Err(BlobFileError::NotWritable)
    }

    async fn truncate(&mut self, _size: i64) -> BlobFileResult<()> {
        Err(BlobFileError::NotWritable)
    }

    async fn sync(&mut self) -> BlobFileResult<()> {
        Ok(())
    }

    async fn flush(&mut self) -> BlobFileResult<()> {
        Ok(())
    }

    async fn size(&self) -> BlobFileResult<i64> {
        Self::size(self).await
    }

    async fn read_zero_copy(&self, _length: usize, _offset: i64) -> BlobFileResult<Bytes> {
        error!(file_type = "blob_store_read", "zero-copy read not supported");
        Err(BlobFileError::ZeroCopyUnsupported)
    }

    fn filename(&self) -> &str {
        Self::filename(self)
    }
}
