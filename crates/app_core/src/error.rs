//! Application error types

use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Sync errors =====
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Cannot list folder: {0}")]
    Enumeration(String),

    #[error("Cannot read {name}: {reason}")]
    EntryRead { name: String, reason: String },

    // ===== Rejected commands (nothing changed) =====
    #[error("{0}")]
    Validation(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    // ===== Environment =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Does this error end the current folder sync session?
    pub fn stops_sync(&self) -> bool {
        matches!(self, AppError::PermissionDenied(_))
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::PermissionDenied(folder) => {
                format!("Folder read permission denied for '{}'. Sync stopped.", folder)
            }
            AppError::Enumeration(msg) => format!("Error processing folder: {}", msg),
            AppError::EntryRead { name, .. } => format!("Could not read '{}'", name),
            _ => self.to_string(),
        }
    }

    pub(crate) fn from_scan(folder: &str, e: app_fs::FsError) -> Self {
        if e.is_access_denied() {
            AppError::PermissionDenied(folder.to_string())
        } else {
            AppError::Enumeration(format!("{}: {}", folder, e))
        }
    }
}
