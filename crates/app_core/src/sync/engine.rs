//! Directory reconciliation
//!
//! A pass has two halves. [`scan`] does the blocking I/O without touching the
//! board; [`reconcile`] computes the next file collection from a scan and is
//! committed under the board's write lock by `Board::apply_scan`.

use crate::{AppError, FileId, FileRecord, NewFile, Origin};
use app_fs::{DirEntry, DirectoryHandle};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Snapshot of a directory, ready to be applied
#[derive(Debug, Clone)]
pub struct Scan {
    pub folder: String,
    /// Entries in enumeration order, names unique
    pub entries: Vec<NewFile>,
    /// Listed entries that could not be read this pass
    pub unreadable: HashSet<String>,
}

/// Change counts of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub conflicts_resolved: usize,
}

impl SyncSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no changes");
        }

        let parts = [
            (self.added, "added"),
            (self.updated, "updated"),
            (self.removed, "removed"),
            (self.conflicts_resolved, "replaced"),
        ];
        let text: Vec<String> = parts
            .iter()
            .filter(|(n, _)| *n > 0)
            .map(|(n, label)| format!("{} {}", n, label))
            .collect();
        f.write_str(&text.join(", "))
    }
}

/// Read every file entry of `handle`
///
/// Only previewable entries have their bytes loaded; reads run on the rayon
/// pool. A failed read leaves that name out of `entries` and records it in
/// `unreadable`. Listing failures abort the scan.
pub fn scan(handle: &dyn DirectoryHandle) -> Result<Scan, AppError> {
    let folder = handle.name().to_string();
    let listed = handle.entries().map_err(|e| AppError::from_scan(&folder, e))?;

    let results: Vec<(String, Result<NewFile, AppError>)> = listed
        .into_par_iter()
        .map(|entry| (entry.name.clone(), read_entry(handle, entry)))
        .collect();

    let mut entries: Vec<NewFile> = Vec::with_capacity(results.len());
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut unreadable = HashSet::new();

    for (name, result) in results {
        match result {
            Ok(file) => match by_name.get(&file.name) {
                // Same name listed twice: the later one wins
                Some(&at) => entries[at] = file,
                None => {
                    by_name.insert(file.name.clone(), entries.len());
                    entries.push(file);
                }
            },
            Err(e) => {
                tracing::warn!("{}: {}", folder, e);
                unreadable.insert(name);
            }
        }
    }

    Ok(Scan {
        folder,
        entries,
        unreadable,
    })
}

fn read_entry(handle: &dyn DirectoryHandle, entry: DirEntry) -> Result<NewFile, AppError> {
    let data = if app_fs::is_previewable(&entry.mime_type) {
        let bytes = handle.read(&entry).map_err(|e| AppError::EntryRead {
            name: entry.name.clone(),
            reason: e.to_string(),
        })?;
        Some(bytes)
    } else {
        None
    };

    Ok(NewFile {
        name: entry.name,
        mime_type: entry.mime_type,
        size: entry.size,
        last_modified: entry.last_modified,
        data,
    })
}

/// Next file collection computed from a scan
#[derive(Debug)]
pub(crate) struct Reconciled {
    pub files: Vec<FileRecord>,
    /// Ids that left the board, removed or replaced
    pub gone: HashSet<FileId>,
    pub summary: SyncSummary,
}

/// Diff `current` against a scan
///
/// Synced files of the scanned folder are matched by name and updated in
/// place, keeping id, rating and association. A manual file whose name shows
/// up in the folder is replaced by a fresh synced record, unless the folder
/// already has a synced file of that name. Synced files of the folder that were
/// not listed are removed; ones listed but unreadable are kept as they are.
/// Everything else passes through untouched and in place.
pub(crate) fn reconcile(current: &[FileRecord], scan: Scan) -> Reconciled {
    let Scan {
        folder,
        entries,
        unreadable,
    } = scan;

    let mut pending: Vec<Option<NewFile>> = Vec::with_capacity(entries.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(entries.len());
    for entry in entries {
        match index.get(&entry.name) {
            Some(&at) => pending[at] = Some(entry),
            None => {
                index.insert(entry.name.clone(), pending.len());
                pending.push(Some(entry));
            }
        }
    }

    let synced_here: HashSet<&str> = current
        .iter()
        .filter(|f| f.origin.is_synced_from(&folder))
        .map(|f| f.name.as_str())
        .collect();

    let mut summary = SyncSummary::default();
    let mut gone = HashSet::new();
    let mut replaced_names: HashSet<&str> = HashSet::new();
    let mut files = Vec::with_capacity(current.len() + pending.len());

    for file in current {
        let slot = index.get(&file.name).copied();

        if file.origin.is_synced_from(&folder) {
            match slot.and_then(|at| pending[at].take()) {
                Some(entry) => {
                    let fresh = entry.into_record(file.origin.clone());
                    if fresh.size != file.size || fresh.last_modified != file.last_modified {
                        summary.updated += 1;
                    }
                    files.push(FileRecord {
                        mime_type: fresh.mime_type,
                        size: fresh.size,
                        last_modified: fresh.last_modified,
                        preview: fresh.preview,
                        ..file.clone()
                    });
                }
                None if unreadable.contains(&file.name) => files.push(file.clone()),
                None => {
                    summary.removed += 1;
                    gone.insert(file.id);
                }
            }
        } else if file.origin.is_manual() && slot.is_some() && !synced_here.contains(file.name.as_str()) {
            tracing::warn!("{} in {} replaces the manually added file", file.name, folder);
            replaced_names.insert(file.name.as_str());
            gone.insert(file.id);
        } else {
            files.push(file.clone());
        }
    }

    for entry in pending.into_iter().flatten() {
        if replaced_names.contains(entry.name.as_str()) {
            summary.conflicts_resolved += 1;
        } else {
            summary.added += 1;
        }
        files.push(entry.into_record(Origin::synced(folder.as_str())));
    }

    Reconciled { files, gone, summary }
}
