//! RefBoard File System Abstraction Layer
//!
//! Provides the directory capability consumed by folder sync:
//! - DirectoryHandle: enumerate / read / permission contract
//! - LocalDirectory: std::fs backed implementation
//! - Media type detection by extension

mod directory;
mod local;
mod media;

pub use directory::{DirEntry, DirectoryHandle, PermissionState};
pub use local::{LocalDirectory, ListOptions};
pub use media::{is_previewable, media_type_for_name, DEFAULT_IMAGE_EXTENSIONS};

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

impl FsError {
    /// Classify an I/O error raised while touching `path`
    pub fn from_io(err: std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                FsError::AccessDenied(path.display().to_string())
            }
            _ => FsError::Io(err),
        }
    }

    /// Did the file system refuse access?
    pub fn is_access_denied(&self) -> bool {
        matches!(self, FsError::AccessDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
