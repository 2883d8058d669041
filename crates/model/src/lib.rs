//! Wire types for drive containers, items and upload sessions.
//!
//! These mirror the JSON shapes of the remote document-storage API so the
//! transfer pipeline and the HTTP client can share one vocabulary without
//! depending on each other's internals.

pub mod item;
pub mod session;

pub use item::{DriveItem, FileFacet, FolderFacet, ItemKind};
pub use session::{ConflictBehavior, CreateSessionRequest, SessionItem, UploadSession};

use serde::{Deserialize, Serialize};

/// Addresses the drive and parent folder an upload lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Drive (container) identifier.
    pub drive_id: String,
    /// Parent folder item identifier ("root" for the drive root).
    pub parent_id: String,
}

impl Destination {
    /// Creates a destination pointing at a folder inside a drive.
    pub fn new(drive_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            drive_id: drive_id.into(),
            parent_id: parent_id.into(),
        }
    }

    /// Creates a destination pointing at the drive root.
    pub fn root(drive_id: impl Into<String>) -> Self {
        Self::new(drive_id, "root")
    }
}
