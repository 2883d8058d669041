//! Remote drive item descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A finalized remote object descriptor returned by the storage API.
///
/// This is the durable output of an upload; sessions and ranges are
/// transient and never retained past completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    /// File/folder discriminator, flattened to match the wire shape
    /// (a sibling `"file"` or `"folder"` object on the item).
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl DriveItem {
    /// Returns `true` if the item is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ItemKind::Folder(_))
    }
}

/// Discriminates files from folders as a closed sum type.
///
/// The remote API signals the kind through the presence of a `file` or
/// `folder` facet; modeling that as an enum makes the distinction
/// exhaustive at compile time instead of a runtime field probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemKind {
    File(FileFacet),
    Folder(FolderFacet),
}

/// File-specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Folder-specific metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderFacet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u64>,
}
