//! Board entities: files, references, ratings

use crate::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

entity_id!(
    /// Identifier of a file on the board
    FileId
);
entity_id!(
    /// Identifier of a reference (tag)
    ReferenceId
);

/// Star rating, 0 (unrated) to 5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;
    pub const UNRATED: Rating = Rating(0);

    /// Values above 5 are rejected
    pub fn new(stars: u8) -> Result<Self, AppError> {
        if stars > Self::MAX {
            return Err(AppError::Validation(format!(
                "Rating must be between 0 and {}, got {}",
                Self::MAX,
                stars
            )));
        }
        Ok(Self(stars))
    }

    pub fn stars(self) -> u8 {
        self.0
    }

    pub fn is_rated(self) -> bool {
        self.0 > 0
    }
}

impl TryFrom<u8> for Rating {
    type Error = AppError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Self::new(stars)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

/// Where a file came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    Manual,
    Synced { folder: String },
}

impl Origin {
    pub fn synced(folder: impl Into<String>) -> Self {
        Origin::Synced { folder: folder.into() }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Origin::Manual)
    }

    pub fn is_synced_from(&self, folder: &str) -> bool {
        matches!(self, Origin::Synced { folder: f } if f == folder)
    }

    pub fn folder(&self) -> Option<&str> {
        match self {
            Origin::Manual => None,
            Origin::Synced { folder } => Some(folder),
        }
    }
}

/// Inline-renderable payload of an image file
#[derive(Clone, PartialEq, Eq)]
pub struct Preview {
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl fmt::Debug for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preview")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A file on the board
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: FileId,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// Epoch milliseconds
    pub last_modified: i64,
    #[serde(skip_serializing)]
    pub preview: Option<Preview>,
    pub rating: Rating,
    pub reference: Option<ReferenceId>,
    pub origin: Origin,
}

impl FileRecord {
    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }

    pub fn is_associated_with(&self, reference: ReferenceId) -> bool {
        self.reference == Some(reference)
    }
}

/// A tag files can be associated with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub id: ReferenceId,
    pub text: String,
}

impl Reference {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: ReferenceId::new(),
            text: text.into(),
        }
    }
}

/// Raw file handed over for ingestion
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub last_modified: i64,
    pub data: Option<Vec<u8>>,
}

impl NewFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>, last_modified: i64) -> Self {
        let name = name.into();
        Self {
            mime_type: app_fs::media_type_for_name(&name).to_string(),
            size: data.len() as u64,
            name,
            last_modified,
            data: Some(data),
        }
    }

    /// Read a file from disk for manual upload
    pub fn from_path<P: AsRef<Path>>(path: P) -> app_fs::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| app_fs::FsError::from_io(e, path))?;
        if !metadata.is_file() {
            return Err(app_fs::FsError::InvalidPath(path.display().to_string()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| app_fs::FsError::InvalidPath(path.display().to_string()))?;
        let mime_type = app_fs::media_type_for_name(&name).to_string();

        let data = if app_fs::is_previewable(&mime_type) {
            Some(std::fs::read(path).map_err(|e| app_fs::FsError::from_io(e, path))?)
        } else {
            None
        };

        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or_else(now_millis);

        Ok(Self {
            name,
            mime_type,
            size: metadata.len(),
            last_modified,
            data,
        })
    }

    /// Turn into a fresh, unrated, unassociated record
    pub fn into_record(self, origin: Origin) -> FileRecord {
        let preview = match self.data {
            Some(data) if app_fs::is_previewable(&self.mime_type) => Some(Preview {
                mime_type: self.mime_type.clone(),
                data: data.into(),
            }),
            _ => None,
        };

        FileRecord {
            id: FileId::new(),
            name: self.name,
            mime_type: self.mime_type,
            size: self.size,
            last_modified: self.last_modified,
            preview,
            rating: Rating::UNRATED,
            reference: None,
            origin,
        }
    }
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
