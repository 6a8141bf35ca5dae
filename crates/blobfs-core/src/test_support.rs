//! In-memory mock endpoint for unit tests.
//!
//! Records every remote call, tracks the peak number of simultaneous part
//! uploads, and can inject delays and per-part failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use md5::Digest;
use parking_lot::{Mutex, MutexGuard};

use crate::config::BlobConfig;
use crate::endpoint::{BlobStoreEndpoint, PartManifest};
use crate::error::{BlobFileError, BlobFileResult};

/// One recorded `upload_part` call that succeeded.
#[derive(Debug, Clone)]
pub(crate) struct UploadedPart {
    pub upload_id: String,
    pub number: u32,
    pub body: Bytes,
    pub length: usize,
    pub content_md5: String,
    pub etag: String,
}

/// One recorded `finish_multipart_upload` call.
#[derive(Debug, Clone)]
pub(crate) struct FinishCall {
    pub upload_id: String,
    pub parts: PartManifest,
}

/// One recorded `write_entire_file` call.
#[derive(Debug, Clone)]
pub(crate) struct WholeWrite {
    pub body: Bytes,
    pub length: usize,
    pub content_md5: String,
}

/// Mutable call log behind the mock.
#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub begin_calls: usize,
    pub upload_attempts: Vec<u32>,
    pub uploaded_parts: Vec<UploadedPart>,
    pub finish_calls: Vec<FinishCall>,
    pub whole_writes: Vec<WholeWrite>,
}

impl MockState {
    /// The successfully uploaded part with the given number, if any.
    pub(crate) fn part(&self, number: u32) -> Option<&UploadedPart> {
        self.uploaded_parts.iter().find(|p| p.number == number)
    }
}

/// A recording [`BlobStoreEndpoint`] double.
#[derive(Debug)]
pub(crate) struct MockEndpoint {
    config: BlobConfig,
    state: Mutex<MockState>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    size_calls: AtomicUsize,
    fail_part: Option<u32>,
    upload_delay: Option<Duration>,
    object: Option<Bytes>,
}

impl MockEndpoint {
    pub(crate) fn new(config: BlobConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MockState::default()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            size_calls: AtomicUsize::new(0),
            fail_part: None,
            upload_delay: None,
            object: None,
        }
    }

    /// Fail every `upload_part` call for the given part number.
    pub(crate) fn with_failing_part(config: BlobConfig, number: u32) -> Self {
        Self {
            fail_part: Some(number),
            ..Self::new(config)
        }
    }

    /// Hold every `upload_part` call open for `delay` before completing.
    pub(crate) fn with_upload_delay(config: BlobConfig, delay: Duration) -> Self {
        Self {
            upload_delay: Some(delay),
            ..Self::new(config)
        }
    }

    /// Serve `object` to the read-side operations.
    pub(crate) fn with_object(config: BlobConfig, object: Bytes) -> Self {
        Self {
            object: Some(object),
            ..Self::new(config)
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock()
    }

    /// Highest number of `upload_part` calls that were ever open at once.
    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Part numbers of every `upload_part` call, successful or not.
    pub(crate) fn upload_attempts(&self) -> Vec<u32> {
        self.state.lock().upload_attempts.clone()
    }

    pub(crate) fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStoreEndpoint for MockEndpoint {
    fn config(&self) -> &BlobConfig {
        &self.config
    }

    async fn begin_multipart_upload(&self, _bucket: &str, _key: &str) -> BlobFileResult<String> {
        let mut state = self.state.lock();
        state.begin_calls += 1;
        Ok(format!("upload-{}", state.begin_calls))
    }

    #[allow(clippy::too_many_arguments)]
    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
        length: usize,
        content_md5: &str,
    ) -> BlobFileResult<String> {
        self.state.lock().upload_attempts.push(part_number);

        let open = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(open, Ordering::SeqCst);
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_part == Some(part_number) {
            return Err(BlobFileError::transport(format!(
                "injected failure for part {part_number}"
            )));
        }

        let etag = format!("\"{}\"", hex::encode(md5::Md5::digest(&body)));
        self.state.lock().uploaded_parts.push(UploadedPart {
            upload_id: upload_id.to_owned(),
            number: part_number,
            body,
            length,
            content_md5: content_md5.to_owned(),
            etag: etag.clone(),
        });
        Ok(etag)
    }

    async fn finish_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        parts: PartManifest,
    ) -> BlobFileResult<()> {
        self.state.lock().finish_calls.push(FinishCall {
            upload_id: upload_id.to_owned(),
            parts,
        });
        Ok(())
    }

    async fn write_entire_file(
        &self,
        _bucket: &str,
        _key: &str,
        body: Bytes,
        length: usize,
        content_md5: &str,
    ) -> BlobFileResult<()> {
        self.state.lock().whole_writes.push(WholeWrite {
            body,
            length,
            content_md5: content_md5.to_owned(),
        });
        Ok(())
    }

    async fn read_object_range(
        &self,
        _bucket: &str,
        _key: &str,
        offset: i64,
        length: usize,
    ) -> BlobFileResult<Bytes> {
        let Some(object) = &self.object else {
            return Err(BlobFileError::transport("no such object"));
        };
        let start = usize::try_from(offset)
            .map_err(|_| BlobFileError::transport("negative range offset"))?;
        let end = start.saturating_add(length).min(object.len());
        if start > object.len() {
            return Err(BlobFileError::transport("range out of bounds"));
        }
        Ok(object.slice(start..end))
    }

    async fn object_size(&self, _bucket: &str, _key: &str) -> BlobFileResult<i64> {
        self.size_calls.fetch_add(1, Ordering::SeqCst);
        let Some(object) = &self.object else {
            return Err(BlobFileError::transport("no such object"));
        };
        i64::try_from(object.len()).map_err(|_| BlobFileError::transport("object too large"))
    }
}
