//! The write handle: a sequential byte stream turned into a concurrent
//! multipart upload.
//!
//! [`BlobStoreWriteFile`] buffers incoming writes into the current
//! [`Part`], begins transferring each part in the background as soon as it
//! reaches the configured minimum part size, and finalizes the object on
//! [`sync`](BlobStoreWriteFile::sync) — as one whole-object write if only
//! a single part was ever produced, otherwise by completing the multipart
//! upload from the ordered part manifest.
//!
//! All operations must be sequential and contiguous. Part sizes and the
//! per-file upload concurrency come from the endpoint's
//! [`BlobConfig`](crate::config::BlobConfig).
//!
//! # Shared ownership and failure
//!
//! Each background upload task holds an `Arc` of the session's shared
//! state, so the state outlives the handle for as long as any upload is
//! outstanding. The first failure from any task is recorded in the
//! session's [`FailureSlot`] and observed by every other in-flight
//! operation; once poisoned, no later `write` or `sync` succeeds.

use std::mem;
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

use async_trait::async_trait;

use crate::endpoint::{BlobStoreEndpoint, PartManifest};
use crate::error::{BlobFileError, BlobFileResult};
use crate::failure::FailureSlot;
use crate::file::BlobFile;
use crate::part::Part;

/// Memoized outcome of the finalize protocol, awaited by every `sync` call.
type FinishFuture = Shared<BoxFuture<'static, BlobFileResult<()>>>;

/// Session state shared with background upload tasks.
struct WriteShared {
    endpoint: Arc<dyn BlobStoreEndpoint>,
    bucket: String,
    key: String,
    /// Copied from the endpoint config at construction.
    min_part_size: usize,
    /// Created exactly once, on the first part upload, and reused by all
    /// later parts.
    upload_id: OnceCell<String>,
    /// First upload failure; poisons the whole session.
    errors: FailureSlot,
    /// Bounds how many part uploads are in flight for this file.
    upload_slots: Arc<Semaphore>,
}

impl std::fmt::Debug for WriteShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteShared")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("min_part_size", &self.min_part_size)
            .field("upload_id", &self.upload_id.get())
            .finish()
    }
}

/// A write-only file that lives in an S3-style blob store.
///
/// Writes using the REST API behind
/// [`BlobStoreEndpoint`](crate::endpoint::BlobStoreEndpoint), using
/// multipart upload and beginning to transfer each part as soon as it is
/// large enough.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use blobfs_core::{BlobStoreWriteFile, endpoint::BlobStoreEndpoint};
/// # async fn example(endpoint: Arc<dyn BlobStoreEndpoint>) -> blobfs_core::error::BlobFileResult<()> {
/// let mut file = BlobStoreWriteFile::new(endpoint, "backups", "db/segment-0001");
/// file.write(b"hello", 0).await?;
/// file.sync().await?;
/// # Ok(())
/// # }
/// ```
pub struct BlobStoreWriteFile {
    shared: Arc<WriteShared>,
    /// Ordered parts, numbered 1..N; the last one is the current write
    /// target. Taken by the finalize task once `sync` starts.
    parts: Vec<Part>,
    /// Next expected write offset; -1 once finalization has begun.
    cursor: i64,
    finished: Option<FinishFuture>,
    finish_abort: Option<AbortHandle>,
}

// Offsets are i64 to allow the -1 "finalized" sentinel; lengths are usize.
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
impl BlobStoreWriteFile {
    /// Create a write handle for `bucket`/`key` on the given endpoint.
    ///
    /// The minimum part size and upload concurrency are read from the
    /// endpoint's configuration once, here.
    #[must_use]
    pub fn new(
        endpoint: Arc<dyn BlobStoreEndpoint>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let config = endpoint.config();
        let min_part_size = config.multipart_min_part_size.max(1);
        let upload_slots = Arc::new(Semaphore::new(config.concurrent_writes_per_file.max(1)));

        Self {
            shared: Arc::new(WriteShared {
                endpoint,
                bucket: bucket.into(),
                key: key.into(),
                min_part_size,
                upload_id: OnceCell::new(),
                errors: FailureSlot::new(),
                upload_slots,
            }),
            parts: vec![Part::new(1)],
            cursor: 0,
            finished: None,
            finish_abort: None,
        }
    }

    /// Write `data` at `offset`, which must equal the current cursor.
    ///
    /// The cursor advances immediately; durability is gated by
    /// [`sync`](Self::sync). Suspends only when a part boundary is crossed
    /// and all upload slots are taken. Fails with the session's first
    /// upload error if any previously-started part upload has failed.
    pub async fn write(&mut self, data: &[u8], offset: i64) -> BlobFileResult<()> {
        if offset != self.cursor {
            return Err(BlobFileError::NonSequentialOp {
                expected: self.cursor,
                actual: offset,
            });
        }
        self.cursor += data.len() as i64;

        if let Some(err) = self.shared.errors.get() {
            return Err(err);
        }
        self.shared
            .errors
            .race(write_impl(&self.shared, &mut self.parts, data))
            .await
    }

    /// Truncate to `size`. Only a no-op truncate to the current cursor is
    /// accepted; this file type never shrinks or grows in place.
    pub fn truncate(&mut self, size: i64) -> BlobFileResult<()> {
        if size != self.cursor {
            return Err(BlobFileError::NonSequentialOp {
                expected: self.cursor,
                actual: size,
            });
        }
        Ok(())
    }

    /// Resolve once all data has been sent and acknowledged remotely.
    ///
    /// Idempotent: the first call starts the finalize protocol and blocks
    /// further writes; later calls return the same outcome.
    pub async fn sync(&mut self) -> BlobFileResult<()> {
        if self.cursor == 0 {
            return Err(BlobFileError::NotWritable);
        }

        // Only initiate the finish operation once, and also prevent
        // further writing.
        if self.finished.is_none() {
            let shared = Arc::clone(&self.shared);
            let parts = mem::take(&mut self.parts);
            let handle = tokio::spawn(finish_upload(shared, parts));
            self.finish_abort = Some(handle.abort_handle());
            self.finished = Some(
                async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(err) if err.is_cancelled() => Err(BlobFileError::Cancelled),
                        Err(err) => Err(BlobFileError::Internal(err.to_string())),
                    }
                }
                .boxed()
                .shared(),
            );
            self.cursor = -1;
        }

        match self.finished.clone() {
            Some(finished) => finished.await,
            None => Err(BlobFileError::Internal("finalize state missing".to_owned())),
        }
    }

    /// Deliberate no-op.
    ///
    /// A flush cannot do what a caller would notionally want here: the
    /// store enforces a minimum size for every part but the last, and each
    /// part is sent with a declared size. A below-minimum buffer could be
    /// sent early only at the cost of re-sending the entire part once more
    /// data arrives, so an eager flush would multiply write traffic rather
    /// than reduce unsent data.
    pub fn flush(&mut self) -> BlobFileResult<()> {
        Ok(())
    }

    /// The logical byte count written so far (-1 once finalized).
    #[must_use]
    pub fn size(&self) -> i64 {
        self.cursor
    }

    /// The object key this handle writes to.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.shared.key
    }
}

impl std::fmt::Debug for BlobStoreWriteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStoreWriteFile")
            .field("bucket", &self.shared.bucket)
            .field("key", &self.shared.key)
            .field("cursor", &self.cursor)
            .field("parts", &self.parts.len())
            .field("finished", &self.finished.is_some())
            .finish()
    }
}

impl Drop for BlobStoreWriteFile {
    fn drop(&mut self) {
        // Abandon outstanding work; incomplete remote uploads are an
        // operational concern, not rolled back here.
        for part in &self.parts {
            part.abort_upload();
        }
        if let Some(abort) = &self.finish_abort {
            abort.abort();
        }
    }
}

#[async_trait]
impl BlobFile for BlobStoreWriteFile {
    async fn read(&self, _length: usize, _offset: i64) -> BlobFileResult<Bytes> {
        Err(BlobFileError::NotReadable)
    }

    async fn write(&mut self, data: &[u8], offset: i64) -> BlobFileResult<()> {
        Self::write(self, data, offset).await
    }

    async fn truncate(&mut self, size: i64) -> BlobFileResult<()> {
        Self::truncate(self, size)
    }

    async fn sync(&mut self) -> BlobFileResult<()> {
        Self::sync(self).await
    }

    async fn flush(&mut self) -> BlobFileResult<()> {
        Self::flush(self)
    }

    async fn size(&self) -> BlobFileResult<i64> {
        Ok(Self::size(self))
    }

    async fn read_zero_copy(&self, _length: usize, _offset: i64) -> BlobFileResult<Bytes> {
        error!(file_type = "blob_store_write", "zero-copy read not supported");
        Err(BlobFileError::ZeroCopyUnsupported)
    }

    fn filename(&self) -> &str {
        Self::filename(self)
    }
}

/// Append `data` to the current part, rolling over at every minimum-part-
/// size boundary so that every non-final part is closed at exactly the
/// minimum size.
async fn write_impl(
    shared: &Arc<WriteShared>,
    parts: &mut Vec<Part>,
    mut data: &[u8],
) -> BlobFileResult<()> {
    let min = shared.min_part_size;
    loop {
        let Some(current) = parts.last_mut() else {
            return Err(BlobFileError::Internal(
                "write issued after finalize started".to_owned(),
            ));
        };
        if current.length() + data.len() < min {
            current.append(data);
            return Ok(());
        }

        // Fill the current part exactly to the boundary, then end it and
        // continue with the remainder in a fresh part.
        let room = min - current.length();
        current.append(&data[..room]);
        data = &data[room..];
        end_current_part(shared, parts, true).await?;
    }
}

/// End the current part and start uploading it in the background, waiting
/// first for an upload slot if too many parts are already in transit.
#[allow(clippy::cast_possible_truncation)]
async fn end_current_part(
    shared: &Arc<WriteShared>,
    parts: &mut Vec<Part>,
    start_new: bool,
) -> BlobFileResult<()> {
    let next_number = parts.len() as u32 + 1;
    let Some(part) = parts.last_mut() else {
        return Err(BlobFileError::Internal("no current part".to_owned()));
    };

    // Never upload a spurious empty part mid-stream.
    if part.length() == 0 {
        return Ok(());
    }

    let permit = shared
        .upload_slots
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| BlobFileError::Cancelled)?;

    let number = part.number();
    let length = part.length();
    let checksum = part.finalize_checksum().to_owned();
    let body = part.take_body();
    debug!(part = number, length, "starting part upload");

    let task_shared = Arc::clone(shared);
    let handle = tokio::spawn(async move {
        // The permit rides with the task and is released on every exit
        // path: success, failure, or abort.
        let _permit = permit;
        let result = task_shared
            .errors
            .race(do_part_upload(&task_shared, number, body, length, &checksum))
            .await;
        if let Err(err) = &result {
            warn!(part = number, error = %err, "part upload failed");
            task_shared.errors.fail(err.clone());
        }
        result
    });
    part.set_etag(handle);

    if start_new {
        parts.push(Part::new(next_number));
    }
    Ok(())
}

/// Upload one finished part, creating the shared upload id on first use.
async fn do_part_upload(
    shared: &WriteShared,
    number: u32,
    body: Bytes,
    length: usize,
    content_md5: &str,
) -> BlobFileResult<String> {
    // Exactly-once lazy initialization: concurrent part uploads share one
    // pending begin call instead of opening two remote sessions.
    let upload_id = shared
        .upload_id
        .get_or_try_init(|| async {
            debug!(bucket = %shared.bucket, key = %shared.key, "beginning multipart upload");
            shared
                .endpoint
                .begin_multipart_upload(&shared.bucket, &shared.key)
                .await
        })
        .await?
        .clone();

    shared
        .endpoint
        .upload_part(
            &shared.bucket,
            &shared.key,
            &upload_id,
            number,
            body,
            length,
            content_md5,
        )
        .await
}

/// Run the finalize protocol, forwarding any failure into the shared slot.
async fn finish_upload(shared: Arc<WriteShared>, mut parts: Vec<Part>) -> BlobFileResult<()> {
    let result = do_finish_upload(&shared, &mut parts).await;
    if let Err(err) = &result {
        warn!(error = %err, "finalize failed");
        shared.errors.fail(err.clone());
    }
    result
}

async fn do_finish_upload(
    shared: &Arc<WriteShared>,
    parts: &mut Vec<Part>,
) -> BlobFileResult<()> {
    // A single part means no part upload ever started: write the whole
    // object at once and skip the multipart protocol entirely.
    if parts.len() == 1 {
        let Some(part) = parts.last_mut() else {
            return Err(BlobFileError::Internal("no part to finalize".to_owned()));
        };
        let length = part.length();
        let checksum = part.finalize_checksum().to_owned();
        let body = part.take_body();
        debug!(length, "writing single-part object");
        return shared
            .endpoint
            .write_entire_file(&shared.bucket, &shared.key, body, length, &checksum)
            .await;
    }

    // At least two parts: end the last part (which may be empty) without
    // starting another.
    end_current_part(shared, parts, false).await?;

    // Wait for every part's etag in part-number order and assemble the
    // manifest. An empty trailing part was never uploaded and is omitted.
    let mut manifest = PartManifest::new();
    for part in parts.iter_mut() {
        let Some(handle) = part.take_etag() else {
            continue;
        };
        let etag = match handle.await {
            Ok(result) => result?,
            Err(err) if err.is_cancelled() => return Err(BlobFileError::Cancelled),
            Err(err) => return Err(BlobFileError::Internal(err.to_string())),
        };
        if part.length() > 0 {
            manifest.insert(part.number(), etag);
        }
    }

    // Every part required the upload id, so it is resolved by now.
    let Some(upload_id) = shared.upload_id.get().cloned() else {
        return Err(BlobFileError::Internal(
            "upload id missing after part uploads".to_owned(),
        ));
    };
    debug!(parts = manifest.len(), "finishing multipart upload");
    shared
        .endpoint
        .finish_multipart_upload(&shared.bucket, &shared.key, &upload_id, manifest)
        .await
}
