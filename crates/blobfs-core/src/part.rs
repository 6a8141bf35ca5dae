//! In-memory buffer for one multipart part.
//!
//! A [`Part`] accumulates bytes for one object-store part, keeps its
//! Content-MD5 accumulator up to date as bytes arrive, and carries the
//! handle of the background task uploading it once the part rolls over.
//! Size bookkeeping and rollover decisions belong to the write session;
//! the part itself enforces no bound.

use bytes::{Bytes, BytesMut};
use md5::Digest;
use tokio::task::JoinHandle;

use crate::checksums::encode_md5_digest;
use crate::error::BlobFileResult;

/// One object-store part under construction or in flight.
pub(crate) struct Part {
    number: u32,
    buffer: BytesMut,
    length: usize,
    hasher: md5::Md5,
    content_md5: Option<String>,
    etag: Option<JoinHandle<BlobFileResult<String>>>,
}

impl Part {
    /// Create an empty part with the given 1-based number.
    pub(crate) fn new(number: u32) -> Self {
        Self {
            number,
            buffer: BytesMut::new(),
            length: 0,
            hasher: md5::Md5::new(),
            content_md5: None,
            etag: None,
        }
    }

    /// Append bytes, updating the checksum accumulator and length.
    pub(crate) fn append(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        Digest::update(&mut self.hasher, data);
        self.length += data.len();
    }

    /// Finalize and cache the Content-MD5 digest.
    ///
    /// Idempotent: the digest is computed exactly once, and bytes appended
    /// afterwards do not change the cached value. The session guarantees no
    /// such bytes arrive (rollover to a new part happens first).
    pub(crate) fn finalize_checksum(&mut self) -> &str {
        if self.content_md5.is_none() {
            let digest = Digest::finalize(self.hasher.clone());
            self.content_md5 = Some(encode_md5_digest(&digest));
        }
        self.content_md5.as_deref().unwrap_or_default()
    }

    /// Detach the buffered bytes for upload, leaving `length` intact.
    pub(crate) fn take_body(&mut self) -> Bytes {
        self.buffer.split().freeze()
    }

    /// Attach the handle of the background task uploading this part.
    pub(crate) fn set_etag(&mut self, handle: JoinHandle<BlobFileResult<String>>) {
        self.etag = Some(handle);
    }

    /// Take the upload handle, if this part was ever handed off for upload.
    ///
    /// `None` means the part had zero length and no upload was started; only
    /// the trailing part of a session can be in that state.
    pub(crate) fn take_etag(&mut self) -> Option<JoinHandle<BlobFileResult<String>>> {
        self.etag.take()
    }

    /// Abort the background upload, if one is running.
    pub(crate) fn abort_upload(&self) {
        if let Some(handle) = &self.etag {
            handle.abort();
        }
    }

    /// The 1-based part number.
    pub(crate) fn number(&self) -> u32 {
        self.number
    }

    /// Bytes accumulated so far.
    pub(crate) fn length(&self) -> usize {
        self.length
    }
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part")
            .field("number", &self.number)
            .field("length", &self.length)
            .field("checksum_finalized", &self.content_md5.is_some())
            .field("upload_started", &self.etag.is_some())
            .finish()
    }
}
