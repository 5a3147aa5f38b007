//! Directory capability used by folder sync

use crate::Result;
use serde::{Deserialize, Serialize};

/// Read permission state of a directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionState {
    #[serde(rename = "granted")]
    Granted,
    #[serde(rename = "denied")]
    Denied,
    /// Access may be granted after asking the user
    #[serde(rename = "prompt")]
    Prompt,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }
}

/// One file entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// Epoch milliseconds
    pub last_modified: i64,
}

/// A readable directory
///
/// Enumeration is non-recursive: subdirectories are never reported.
pub trait DirectoryHandle: Send + Sync {
    /// Folder name, used to tag synced files
    fn name(&self) -> &str;

    /// List the current file entries
    fn entries(&self) -> Result<Vec<DirEntry>>;

    /// Read the contents of one entry
    fn read(&self, entry: &DirEntry) -> Result<Vec<u8>>;

    /// Current read permission, without asking
    fn query_permission(&self) -> PermissionState;

    /// Ask for read permission (may be interactive)
    fn request_permission(&self) -> PermissionState;
}
