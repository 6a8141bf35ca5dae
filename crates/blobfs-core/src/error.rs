//! Blob file error types.
//!
//! Defines [`BlobFileError`], the error taxonomy shared by the write and
//! read handles. The enum is `Clone` because the first failure observed by
//! any in-flight part upload is broadcast through the session's
//! [`FailureSlot`](crate::failure::FailureSlot) and must be observable by
//! every caller racing against it.
//!
//! No error in this taxonomy is retried internally: sequencing and
//! unsupported-operation errors are caller bugs fixed by construction, and
//! transport failures are the responsibility of the endpoint collaborator
//! (which may retry before surfacing them here).

/// Errors produced by blob store file handles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobFileError {
    // -----------------------------------------------------------------------
    // Sequencing errors
    // -----------------------------------------------------------------------
    /// A write or truncate was issued at an offset other than the cursor.
    ///
    /// Blob store files support only strictly sequential, contiguous
    /// operations.
    #[error("non-sequential operation: expected offset {expected}, got {actual}")]
    NonSequentialOp {
        /// The offset the file expected (its current cursor).
        expected: i64,
        /// The offset the caller supplied.
        actual: i64,
    },

    // -----------------------------------------------------------------------
    // Unsupported-operation errors
    // -----------------------------------------------------------------------
    /// The file is not writable (read handle, or sync before any write).
    #[error("blob store file is not writable")]
    NotWritable,

    /// The file is not readable (write handle).
    #[error("blob store file is not readable")]
    NotReadable,

    /// Zero-copy access is not supported by blob store files.
    #[error("zero-copy access is not supported on blob store files")]
    ZeroCopyUnsupported,

    // -----------------------------------------------------------------------
    // Upload-transport failures
    // -----------------------------------------------------------------------
    /// A remote blob store request failed.
    ///
    /// Produced by [`BlobStoreEndpoint`](crate::endpoint::BlobStoreEndpoint)
    /// implementations; once observed by a write session the session is
    /// poisoned and every later operation returns this error.
    #[error("blob store request failed: {message}")]
    Transport {
        /// Human-readable description of the transport failure.
        message: String,
    },

    /// The session was torn down while uploads were still outstanding.
    #[error("upload cancelled before completion")]
    Cancelled,

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------
    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BlobFileError {
    /// Build a [`BlobFileError::Transport`] from anything displayable.
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }
}

/// Convenience result type for blob file operations.
pub type BlobFileResult<T> = Result<T, BlobFileError>;
