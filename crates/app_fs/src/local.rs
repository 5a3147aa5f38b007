//! Local directory backed by std::fs

use crate::{media_type_for_name, DirEntry, DirectoryHandle, FsError, PermissionState, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Options for listing directory contents
#[derive(Debug, Clone)]
pub struct ListOptions {
    pub show_hidden: bool,
    /// Lowercase extensions to keep; `None` keeps every file
    pub filter_extensions: Option<Vec<String>>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            show_hidden: false,
            filter_extensions: None,
        }
    }
}

impl ListOptions {
    /// Filter for images only
    pub fn images_only() -> Self {
        Self::with_extensions(crate::DEFAULT_IMAGE_EXTENSIONS.iter().copied())
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            filter_extensions: Some(
                extensions
                    .into_iter()
                    .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                    .collect(),
            ),
            ..Default::default()
        }
    }

    fn accepts(&self, name: &str) -> bool {
        if !self.show_hidden && name.starts_with('.') {
            return false;
        }

        match &self.filter_extensions {
            Some(exts) => {
                let ext = Path::new(name)
                    .extension()
                    .map(|e| e.to_string_lossy().to_ascii_lowercase())
                    .unwrap_or_default();
                exts.iter().any(|e| *e == ext)
            }
            None => true,
        }
    }
}

/// A directory on the local file system
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    path: PathBuf,
    name: String,
    options: ListOptions,
}

impl LocalDirectory {
    /// Open a directory; fails if the path is missing or not a directory
    pub fn open<P: AsRef<Path>>(path: P, options: ListOptions) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| FsError::from_io(e, path))?;

        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(path.display().to_string()));
        }

        let path = path.canonicalize().map_err(|e| FsError::from_io(e, path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| FsError::InvalidPath(path.display().to_string()))?;

        Ok(Self { path, name, options })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entry_path(&self, name: &str) -> Result<PathBuf> {
        // Entry names come from enumeration; refuse anything that escapes the folder
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(FsError::InvalidPath(name.to_string()));
        }
        Ok(self.path.join(name))
    }
}

impl DirectoryHandle for LocalDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn entries(&self) -> Result<Vec<DirEntry>> {
        let mut entries = Vec::new();

        let read_dir = fs::read_dir(&self.path).map_err(|e| FsError::from_io(e, &self.path))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| FsError::from_io(e, &self.path))?;
            let name = entry.file_name().to_string_lossy().to_string();

            if !self.options.accepts(&name) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", name, e);
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }

            let last_modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);

            entries.push(DirEntry {
                mime_type: media_type_for_name(&name).to_string(),
                name,
                size: metadata.len(),
                last_modified,
            });
        }

        Ok(entries)
    }

    fn read(&self, entry: &DirEntry) -> Result<Vec<u8>> {
        let path = self.entry_path(&entry.name)?;
        fs::read(&path).map_err(|e| FsError::from_io(e, &path))
    }

    fn query_permission(&self) -> PermissionState {
        match fs::read_dir(&self.path) {
            Ok(_) => PermissionState::Granted,
            Err(e) => {
                tracing::debug!("Permission check failed for {}: {}", self.path.display(), e);
                PermissionState::Denied
            }
        }
    }

    fn request_permission(&self) -> PermissionState {
        // The OS grants or refuses; there is nobody to ask
        self.query_permission()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), b"png-bytes").unwrap();
        fs::write(dir.path().join("b.JPG"), b"jpg").unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();
        fs::write(dir.path().join(".hidden.png"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();
        fs::write(dir.path().join("nested.png").join("c.png"), b"c").unwrap();
        dir
    }

    #[test]
    fn test_lists_images_only() {
        let dir = fixture();
        let local = LocalDirectory::open(dir.path(), ListOptions::images_only()).unwrap();

        let mut names: Vec<_> = local.entries().unwrap().into_iter().map(|e| e.name).collect();
        names.sort();
        assert_eq!(names, vec!["a.png", "b.JPG"]);
    }

    #[test]
    fn test_entry_metadata_and_read() {
        let dir = fixture();
        let local = LocalDirectory::open(dir.path(), ListOptions::default()).unwrap();

        let entry = local
            .entries()
            .unwrap()
            .into_iter()
            .find(|e| e.name == "a.png")
            .unwrap();
        assert_eq!(entry.mime_type, "image/png");
        assert_eq!(entry.size, 9);
        assert!(entry.last_modified > 0);
        assert_eq!(local.read(&entry).unwrap(), b"png-bytes");
    }

    #[test]
    fn test_name_and_permission() {
        let dir = fixture();
        let local = LocalDirectory::open(dir.path(), ListOptions::default()).unwrap();
        let expected = dir.path().file_name().unwrap().to_string_lossy().to_string();

        assert_eq!(local.name(), expected);
        assert_eq!(local.query_permission(), PermissionState::Granted);
    }

    #[test]
    fn test_removed_directory() {
        let dir = fixture();
        let local = LocalDirectory::open(dir.path(), ListOptions::default()).unwrap();
        drop(dir);

        assert_eq!(local.query_permission(), PermissionState::Denied);
        assert!(matches!(local.entries(), Err(FsError::NotFound(_))));
    }

    #[test]
    fn test_open_rejects_file() {
        let dir = fixture();
        let result = LocalDirectory::open(dir.path().join("a.png"), ListOptions::default());
        assert!(matches!(result, Err(FsError::NotADirectory(_))));
    }

    #[test]
    fn test_read_rejects_traversal() {
        let dir = fixture();
        let local = LocalDirectory::open(dir.path(), ListOptions::default()).unwrap();
        let entry = DirEntry {
            name: "../escape.png".into(),
            mime_type: "image/png".into(),
            size: 0,
            last_modified: 0,
        };
        assert!(matches!(local.read(&entry), Err(FsError::InvalidPath(_))));
    }
}
