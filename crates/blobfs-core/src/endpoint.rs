//! The blob store endpoint contract.
//!
//! [`BlobStoreEndpoint`] is the seam between the file layer and the
//! S3-style REST transport. Implementations own the HTTP client, request
//! signing, and any retry policy; the file layer only sequences calls and
//! aggregates their failures.
//!
//! # Object safety
//!
//! The trait uses `#[async_trait]` so handles can hold an
//! `Arc<dyn BlobStoreEndpoint>` and tests can substitute a mock.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::config::BlobConfig;
use crate::error::BlobFileResult;

/// Ordered manifest of a completed multipart upload: part number to the
/// etag the server returned for that part.
///
/// A `BTreeMap` keeps the manifest in ascending part-number order, which
/// the finish call requires regardless of the order uploads completed in.
pub type PartManifest = BTreeMap<u32, String>;

/// Remote operations exposed by an S3-style blob store.
///
/// All byte bodies are passed as [`Bytes`] together with an explicit
/// `length`, matching the REST protocol in which every part is sent with a
/// declared size.
#[async_trait]
pub trait BlobStoreEndpoint: Send + Sync {
    /// The shared read-only configuration for this endpoint.
    fn config(&self) -> &BlobConfig;

    /// Begin a multipart upload for `bucket`/`key`, returning the upload id
    /// shared by all subsequent part uploads of the same object.
    async fn begin_multipart_upload(&self, bucket: &str, key: &str) -> BlobFileResult<String>;

    /// Upload one part of a multipart upload, returning the server-assigned
    /// etag for the part.
    ///
    /// `content_md5` is the base64 `Content-MD5` of `body`.
    #[allow(clippy::too_many_arguments)]
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        length: usize,
        content_md5: &str,
    ) -> BlobFileResult<String>;

    /// Complete a multipart upload from the ordered part manifest.
    async fn finish_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: PartManifest,
    ) -> BlobFileResult<()>;

    /// Write an entire object in one request, bypassing the multipart
    /// protocol.
    async fn write_entire_file(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        length: usize,
        content_md5: &str,
    ) -> BlobFileResult<()>;

    /// Read `length` bytes of an object starting at `offset` (ranged GET).
    ///
    /// The returned buffer may be shorter than `length` at end of object.
    async fn read_object_range(
        &self,
        bucket: &str,
        key: &str,
        offset: i64,
        length: usize,
    ) -> BlobFileResult<Bytes>;

    /// The size of an object in bytes (metadata query).
    async fn object_size(&self, bucket: &str, key: &str) -> BlobFileResult<i64>;
}
