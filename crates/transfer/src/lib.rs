//! Chunked upload pipeline with strategy dispatch and progress reporting.
//!
//! Files are uploaded into a remote drive through a [`DriveStore`]
//! collaborator. The [`DriveUploader`] picks a strategy per file:
//!
//! - at or below [`SESSION_THRESHOLD`]: one full-body request
//! - above it: a negotiated upload session fed fixed-size byte ranges in
//!   strictly increasing offset order
//!
//! Both strategies report whole-number progress percentages through an
//! optional callback and resolve to the finalized [`DriveItem`].
//!
//! [`DriveItem`]: driveup_model::DriveItem

pub mod progress;
pub mod range;
pub mod source;
pub mod store;
pub mod upload;

pub use progress::{ProgressFn, ProgressReporter};
pub use range::{ByteRange, range_plan};
pub use source::{SourceReader, UploadSource};
pub use store::{DriveStore, RangeAck, StoreError, StoreFuture};
pub use upload::{DriveUploader, UploadError, UploadOptions};

/// Files strictly larger than this (4 MiB) use a chunked upload session.
pub const SESSION_THRESHOLD: u64 = 4 * 1024 * 1024;

/// Byte-range sizes must be a multiple of 320 KiB, a rule of the remote
/// range protocol.
pub const RANGE_ALIGNMENT: u64 = 320 * 1024;

/// Default byte-range size for chunked sessions (10 × 320 KiB).
pub const DEFAULT_RANGE_SIZE: u64 = 10 * RANGE_ALIGNMENT;

/// Errors produced by the upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid upload source: {0}")]
    InvalidSource(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("invalid range size {0}: must be a non-zero multiple of 320 KiB")]
    InvalidRangeSize(u64),

    #[error("upload session error: {0}")]
    Session(String),

    #[error("range {min}-{max} failed: {source}")]
    Range {
        min: u64,
        max: u64,
        #[source]
        source: StoreError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cancelled")]
    Cancelled,
}
