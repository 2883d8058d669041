//! Upload dispatch and the two transfer strategies.
//!
//! [`DriveUploader`] is the single entry point callers depend on. Per
//! file it either:
//!
//! - PUTs the whole payload in one request (at or below the 4 MiB
//!   threshold), reporting read progress in the 0–50 band and 100 on
//!   completion, or
//! - negotiates an upload session and feeds it fixed-size byte ranges
//!   strictly in offset order, reporting a percentage after each range.
//!
//! Neither strategy retries or falls back to the other; a failure
//! aborts the file's upload and surfaces the cause wrapped with the
//! file name.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use driveup_model::{ConflictBehavior, Destination, DriveItem, UploadSession};

use crate::progress::{ProgressFn, ProgressReporter};
use crate::range::range_plan;
use crate::source::UploadSource;
use crate::store::{DriveStore, RangeAck};
use crate::{DEFAULT_RANGE_SIZE, RANGE_ALIGNMENT, SESSION_THRESHOLD, TransferError};

/// Options applied to every upload made through one [`DriveUploader`].
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Byte-range size for chunked sessions.
    ///
    /// Must be a non-zero multiple of [`RANGE_ALIGNMENT`].
    pub range_size: u64,
    /// Collision policy passed to the store for both strategies.
    pub conflict_behavior: ConflictBehavior,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            range_size: DEFAULT_RANGE_SIZE,
            conflict_behavior: ConflictBehavior::Rename,
        }
    }
}

impl UploadOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the byte-range size for chunked sessions.
    pub fn with_range_size(mut self, range_size: u64) -> Self {
        self.range_size = range_size;
        self
    }

    /// Sets the collision policy.
    pub fn with_conflict_behavior(mut self, conflict_behavior: ConflictBehavior) -> Self {
        self.conflict_behavior = conflict_behavior;
        self
    }
}

/// Error returned to callers: the failing file plus the underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("failed to upload file {name}: {source}")]
pub struct UploadError {
    /// Display name of the file that failed.
    pub name: String,
    #[source]
    pub source: TransferError,
}

/// Uploads files into a drive, choosing a strategy per file size.
pub struct DriveUploader<'a> {
    store: &'a dyn DriveStore,
    cancel: CancellationToken,
    options: UploadOptions,
}

impl<'a> DriveUploader<'a> {
    /// Creates an uploader over a store with default options.
    pub fn new(store: &'a dyn DriveStore) -> Self {
        Self {
            store,
            cancel: CancellationToken::new(),
            options: UploadOptions::default(),
        }
    }

    /// Sets upload options.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns a token that aborts in-flight uploads when cancelled.
    ///
    /// Cancellation is observed before each range/request boundary.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Uploads one file and resolves to the finalized remote item.
    ///
    /// `on_progress` receives a strictly increasing sequence of whole
    /// percentages ending at 100 on success. Reported progress is
    /// advisory until the call resolves; it is not rolled back on
    /// failure.
    pub async fn upload(
        &self,
        dest: &Destination,
        source: &UploadSource,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<DriveItem, UploadError> {
        let result = match self.validate(dest, source) {
            Err(e) => Err(e),
            Ok(()) => {
                if source.size() > SESSION_THRESHOLD {
                    self.upload_session(dest, source, on_progress).await
                } else {
                    self.upload_direct(dest, source, on_progress).await
                }
            }
        };

        result.map_err(|e| UploadError {
            name: source.name().to_string(),
            source: e,
        })
    }

    /// Uploads several files to one destination, one at a time.
    ///
    /// Each file gets an independent result; one failure does not stop
    /// the remaining files. `on_progress` receives the source index
    /// alongside each percentage.
    pub async fn upload_batch(
        &self,
        dest: &Destination,
        sources: &[UploadSource],
        on_progress: Option<&(dyn Fn(usize, u8) + Send + Sync)>,
    ) -> Vec<Result<DriveItem, UploadError>> {
        let mut results = Vec::with_capacity(sources.len());
        for (index, source) in sources.iter().enumerate() {
            let result = match on_progress {
                Some(callback) => {
                    let forward = move |p: u8| callback(index, p);
                    self.upload(dest, source, Some(&forward)).await
                }
                None => self.upload(dest, source, None).await,
            };
            if let Err(ref e) = result {
                warn!(file = source.name(), error = %e, "batch upload item failed");
            }
            results.push(result);
        }
        results
    }

    /// Rejects bad inputs before any collaborator call.
    fn validate(&self, dest: &Destination, source: &UploadSource) -> Result<(), TransferError> {
        if source.name().is_empty() {
            return Err(TransferError::InvalidSource("empty file name".into()));
        }
        if source.size() == 0 {
            return Err(TransferError::InvalidSource("zero-length payload".into()));
        }
        if dest.drive_id.is_empty() {
            return Err(TransferError::InvalidDestination("empty drive id".into()));
        }
        if dest.parent_id.is_empty() {
            return Err(TransferError::InvalidDestination("empty parent id".into()));
        }
        let range_size = self.options.range_size;
        if range_size == 0 || range_size % RANGE_ALIGNMENT != 0 {
            return Err(TransferError::InvalidRangeSize(range_size));
        }
        Ok(())
    }

    /// Chunked session transfer for files above the threshold.
    async fn upload_session(
        &self,
        dest: &Destination,
        source: &UploadSource,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<DriveItem, TransferError> {
        self.check_cancelled()?;
        let progress = ProgressReporter::new(on_progress, source.size());

        let session = self
            .store
            .create_upload_session(dest, source.name(), self.options.conflict_behavior)
            .await?;
        debug!(
            file = source.name(),
            size = source.size(),
            url = %session.upload_url,
            "upload session created"
        );

        match self.upload_ranges(&session, source, &progress).await {
            Ok(item) => {
                progress.finished();
                info!(file = source.name(), id = %item.id, "chunked upload complete");
                Ok(item)
            }
            Err(e) => {
                // The server would eventually expire the session; cancel
                // it anyway so the abandoned upload is not left pending.
                self.abandon_session(&session).await;
                Err(e)
            }
        }
    }

    /// Sends every planned range in increasing offset order.
    async fn upload_ranges(
        &self,
        session: &UploadSession,
        source: &UploadSource,
        progress: &ProgressReporter<'_>,
    ) -> Result<DriveItem, TransferError> {
        let total_size = source.size();
        let plan = range_plan(total_size, self.options.range_size);
        let last_index = plan.len() - 1;

        let mut reader = source.open().await?;
        let mut item = None;

        for (index, range) in plan.iter().enumerate() {
            self.check_cancelled()?;

            let body = reader.read_range(*range).await?;
            let ack = self
                .store
                .upload_range(session, *range, total_size, body)
                .await
                .map_err(|e| TransferError::Range {
                    min: range.min,
                    max: range.max,
                    source: e,
                })?;

            match ack {
                RangeAck::Accepted if index == last_index => {
                    return Err(TransferError::Session(
                        "server did not finalize the last range".into(),
                    ));
                }
                RangeAck::Completed(_) if index != last_index => {
                    return Err(TransferError::Session(format!(
                        "server finalized early at range {}-{}",
                        range.min, range.max
                    )));
                }
                RangeAck::Completed(finalized) => item = Some(finalized),
                RangeAck::Accepted => {}
            }

            progress.range_complete(*range);
            debug!(min = range.min, max = range.max, "range uploaded");
        }

        item.ok_or_else(|| TransferError::Session("empty range plan".into()))
    }

    /// Single-shot transfer for files at or below the threshold.
    async fn upload_direct(
        &self,
        dest: &Destination,
        source: &UploadSource,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Result<DriveItem, TransferError> {
        self.check_cancelled()?;
        let progress = ProgressReporter::new(on_progress, source.size());
        progress.started();

        let reader = source.open().await?;
        let body = reader
            .read_all(|loaded, _| progress.read_progress(loaded))
            .await?;

        self.check_cancelled()?;
        let item = self.store.put_content(dest, source.name(), body).await?;
        progress.finished();
        info!(file = source.name(), id = %item.id, "upload complete");
        Ok(item)
    }

    async fn abandon_session(&self, session: &UploadSession) {
        if let Err(e) = self.store.cancel_upload_session(session).await {
            warn!(url = %session.upload_url, error = %e, "failed to cancel abandoned upload session");
        }
    }

    fn check_cancelled(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            Err(TransferError::Cancelled)
        } else {
            Ok(())
        }
    }
}
