//! Abstract remote drive storage collaborator.
//!
//! `DriveStore` is implemented over HTTP by `driveup-client`. Using an
//! object-safe trait keeps the pipeline decoupled from transport and
//! testable with mocks.

use std::future::Future;
use std::pin::Pin;

use driveup_model::{ConflictBehavior, Destination, DriveItem, UploadSession};

use crate::range::ByteRange;

/// Errors surfaced by a [`DriveStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("auth error: {0}")]
    Auth(String),
}

/// Boxed future returned by [`DriveStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Server response to one transmitted byte range.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeAck {
    /// Intermediate range accepted; more ranges expected.
    Accepted,
    /// Final range accepted; the server finalized the item.
    Completed(DriveItem),
}

/// Remote object storage the pipeline uploads into.
///
/// Implementations own their transport; borrowed arguments are only
/// required to live for the duration of the call, so they must be
/// copied into the returned future as needed.
pub trait DriveStore: Send + Sync {
    /// Opens a chunked upload session for `file_name` under `dest`.
    fn create_upload_session(
        &self,
        dest: &Destination,
        file_name: &str,
        conflict: ConflictBehavior,
    ) -> StoreFuture<'_, UploadSession>;

    /// Transmits one byte range to a session.
    ///
    /// Ranges must be submitted in strictly increasing offset order;
    /// the session is implicitly closed by the server when the final
    /// range completes.
    fn upload_range(
        &self,
        session: &UploadSession,
        range: ByteRange,
        total_size: u64,
        body: Vec<u8>,
    ) -> StoreFuture<'_, RangeAck>;

    /// Uploads a full payload as one request.
    fn put_content(
        &self,
        dest: &Destination,
        file_name: &str,
        body: Vec<u8>,
    ) -> StoreFuture<'_, DriveItem>;

    /// Best-effort cancellation of an abandoned upload session.
    fn cancel_upload_session(&self, session: &UploadSession) -> StoreFuture<'_, ()>;
}
