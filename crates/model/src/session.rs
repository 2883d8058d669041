//! Upload session wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-issued handle for an in-progress chunked upload.
///
/// Created once per chunked transfer and consumed range by range. The
/// server owns the expiration; the client never refreshes it — a stale
/// session simply surfaces as a transport error on the next range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Opaque, pre-authenticated URL ranges are PUT against.
    pub upload_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_expected_ranges: Vec<String>,
}

/// What the server should do when the target name already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictBehavior {
    /// Keep both, giving the new item a deconflicted name.
    #[default]
    Rename,
    /// Overwrite the existing item.
    Replace,
    /// Fail the upload.
    Fail,
}

/// Body of a create-upload-session request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub item: SessionItem,
}

/// Item properties sent when opening a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    pub conflict_behavior: ConflictBehavior,
    pub name: String,
}

impl CreateSessionRequest {
    /// Builds the session request for a file name and collision policy.
    pub fn new(name: impl Into<String>, conflict_behavior: ConflictBehavior) -> Self {
        Self {
            item: SessionItem {
                conflict_behavior,
                name: name.into(),
            },
        }
    }
}
