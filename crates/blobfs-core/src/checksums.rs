//! Content-MD5 computation for blob store parts.
//!
//! S3-style stores verify each uploaded part (and whole-object write)
//! against a `Content-MD5` header: the base64 encoding of the raw MD5
//! digest of the body. This module provides the one-shot form; the write
//! path accumulates the digest incrementally on each
//! [`Part`](crate::part::Part) as bytes arrive.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use md5::Digest;

/// Compute the base64-encoded MD5 digest of `data`, the form carried in
/// the S3 `Content-MD5` header.
///
/// # Examples
///
/// ```
/// use blobfs_core::checksums::content_md5;
///
/// assert_eq!(content_md5(b"hello"), "XUFAKrxLKna5cZ2REBfFkg==");
/// ```
#[must_use]
pub fn content_md5(data: &[u8]) -> String {
    let hash = md5::Md5::digest(data);
    BASE64_STANDARD.encode(hash)
}

/// Encode an already-finalized MD5 digest as a `Content-MD5` value.
#[must_use]
pub(crate) fn encode_md5_digest(digest: impl AsRef<[u8]>) -> String {
    BASE64_STANDARD.encode(digest)
}
