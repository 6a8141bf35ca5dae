//! Virtual files backed by S3-style blob stores.
//!
//! blobfs turns an object-store REST API into ordinary file handles.
//! The write handle accepts sequential byte-stream writes, slices them
//! into multipart parts, uploads parts concurrently up to a configured
//! limit with a per-part Content-MD5, and finalizes the object as either
//! one whole-object write or a completed multipart upload. The read
//! handle performs ranged GETs with a cached size query.
//!
//! # Architecture
//!
//! ```text
//! BlobFile trait (shared file interface)
//!       |                    |
//!       v                    v
//! BlobStoreWriteFile   BlobStoreReadFile
//!   |     |     |
//!   v     v     v
//! Part  FailureSlot  upload slots (semaphore)
//!   |
//!   v
//! BlobStoreEndpoint (REST transport collaborator)
//! ```
//!
//! The transport itself — HTTP, signing, retries — lives behind the
//! [`endpoint::BlobStoreEndpoint`] trait and is not part of this crate.

pub mod checksums;
pub mod config;
pub mod endpoint;
pub mod error;
mod failure;
pub mod file;
mod part;
pub mod read;
pub mod write;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::BlobConfig;
pub use endpoint::{BlobStoreEndpoint, PartManifest};
pub use error::{BlobFileError, BlobFileResult};
pub use file::BlobFile;
pub use read::BlobStoreReadFile;
pub use write::BlobStoreWriteFile;
