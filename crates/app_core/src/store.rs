//! Canonical collections: files, references and per-reference custom order
//!
//! Every mutation keeps these post-conditions:
//! - a custom order lists each file at most once, only files associated with
//!   its reference, and is never empty
//! - a file's reference is either `None` or an existing reference

use crate::{AppError, FileId, FileRecord, Origin, Rating, Reference, ReferenceId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityStore {
    files: Vec<FileRecord>,
    references: Vec<Reference>,
    custom_order: HashMap<ReferenceId, Vec<FileId>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Queries =====

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// References in creation order
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn file(&self, id: FileId) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn reference(&self, id: ReferenceId) -> Option<&Reference> {
        self.references.iter().find(|r| r.id == id)
    }

    pub fn custom_order(&self, reference: ReferenceId) -> Option<&[FileId]> {
        self.custom_order.get(&reference).map(Vec::as_slice)
    }

    pub fn custom_orders(&self) -> &HashMap<ReferenceId, Vec<FileId>> {
        &self.custom_order
    }

    pub fn files_for(&self, reference: ReferenceId) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(move |f| f.is_associated_with(reference))
    }

    // ===== Files =====

    pub fn add_files<I: IntoIterator<Item = FileRecord>>(&mut self, files: I) -> usize {
        let before = self.files.len();
        self.files.extend(files);
        self.files.len() - before
    }

    /// Remove a file and purge it from every custom order
    pub fn remove_file(&mut self, id: FileId) -> Option<FileRecord> {
        let index = self.files.iter().position(|f| f.id == id)?;
        let removed = self.files.remove(index);
        self.purge_from_orders(&HashSet::from([id]));
        Some(removed)
    }

    /// Associate files with a reference, or clear their association
    ///
    /// Unknown file ids are ignored. Returns the number of files whose
    /// association changed.
    pub fn set_association(
        &mut self,
        ids: &[FileId],
        reference: Option<ReferenceId>,
        now: i64,
    ) -> Result<usize, AppError> {
        if let Some(r) = reference {
            if self.reference(r).is_none() {
                return Err(AppError::ReferenceNotFound(r.to_string()));
            }
        }

        let wanted: HashSet<FileId> = ids.iter().copied().collect();
        let mut moved: Vec<(FileId, Option<ReferenceId>)> = Vec::new();

        for file in self.files.iter_mut().filter(|f| wanted.contains(&f.id)) {
            if file.reference == reference {
                continue;
            }
            moved.push((file.id, file.reference));
            file.reference = reference;
            file.last_modified = now;
        }

        for (id, old) in &moved {
            if let Some(old) = old {
                self.prune_order(*old, |f| f != *id);
            }
        }

        if let Some(r) = reference {
            if !moved.is_empty() {
                // Newly associated files go last, in the caller's order
                let mut fresh: HashSet<FileId> = moved.iter().map(|(id, _)| *id).collect();
                let order = self.custom_order.entry(r).or_default();
                order.extend(ids.iter().copied().filter(|id| fresh.remove(id)));
            }
        }

        Ok(moved.len())
    }

    pub fn set_rating(&mut self, ids: &[FileId], rating: Rating) -> usize {
        let wanted: HashSet<FileId> = ids.iter().copied().collect();
        let mut changed = 0;
        for file in self.files.iter_mut().filter(|f| wanted.contains(&f.id)) {
            file.rating = rating;
            changed += 1;
        }
        changed
    }

    // ===== References =====

    /// Add references, skipping blanks and case-insensitive duplicates
    pub fn add_references<I, S>(&mut self, texts: I) -> Vec<ReferenceId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut known: HashSet<String> =
            self.references.iter().map(|r| r.text.to_lowercase()).collect();
        let mut added = Vec::new();

        for text in texts {
            let text = text.as_ref().trim();
            if text.is_empty() || !known.insert(text.to_lowercase()) {
                continue;
            }
            let reference = Reference::new(text);
            added.push(reference.id);
            self.references.push(reference);
        }

        added
    }

    /// Delete a reference, unassociating its files and dropping its order
    pub fn remove_reference(&mut self, id: ReferenceId, now: i64) -> Option<Reference> {
        let index = self.references.iter().position(|r| r.id == id)?;
        let removed = self.references.remove(index);

        for file in self.files.iter_mut().filter(|f| f.reference == Some(id)) {
            file.reference = None;
            file.last_modified = now;
        }
        self.custom_order.remove(&id);

        Some(removed)
    }

    // ===== Custom order =====

    /// Replace a reference's custom order
    ///
    /// Duplicates and files not associated with the reference are dropped; an
    /// empty result deletes the entry.
    pub fn reorder_within_reference(&mut self, reference: ReferenceId, order: Vec<FileId>) {
        let members: HashSet<FileId> = self.files_for(reference).map(|f| f.id).collect();
        let mut seen = HashSet::new();
        let order: Vec<FileId> = order
            .into_iter()
            .filter(|id| members.contains(id) && seen.insert(*id))
            .collect();

        if order.is_empty() {
            self.custom_order.remove(&reference);
        } else {
            self.custom_order.insert(reference, order);
        }
    }

    // ===== Bulk =====

    /// Swap in a new file collection computed by a sync pass
    ///
    /// `gone` lists ids that left the store; they are purged from every order.
    pub(crate) fn commit_files(&mut self, files: Vec<FileRecord>, gone: &HashSet<FileId>) {
        self.files = files;
        if !gone.is_empty() {
            self.purge_from_orders(gone);
        }
    }

    /// Remove every file matching `pred`, returning the removed ids
    pub(crate) fn remove_files_where<F>(&mut self, pred: F) -> HashSet<FileId>
    where
        F: Fn(&FileRecord) -> bool,
    {
        let gone: HashSet<FileId> = self.files.iter().filter(|f| pred(f)).map(|f| f.id).collect();
        if !gone.is_empty() {
            self.files.retain(|f| !gone.contains(&f.id));
            self.purge_from_orders(&gone);
        }
        gone
    }

    /// Drop every reference, association and custom order
    ///
    /// Files synced from `active_folder` stay synced; every other file
    /// becomes a manual file.
    pub(crate) fn reset_references(&mut self, active_folder: Option<&str>) {
        self.references.clear();
        self.custom_order.clear();

        for file in &mut self.files {
            file.reference = None;
            if !active_folder.is_some_and(|folder| file.origin.is_synced_from(folder)) {
                file.origin = Origin::Manual;
            }
        }
    }

    fn prune_order<F: Fn(FileId) -> bool>(&mut self, reference: ReferenceId, keep: F) {
        if let Some(order) = self.custom_order.get_mut(&reference) {
            order.retain(|id| keep(*id));
            if order.is_empty() {
                self.custom_order.remove(&reference);
            }
        }
    }

    fn purge_from_orders(&mut self, gone: &HashSet<FileId>) {
        self.custom_order.retain(|_, order| {
            order.retain(|id| !gone.contains(id));
            !order.is_empty()
        });
    }

    /// Verify the store invariants
    pub fn check(&self) -> Result<(), String> {
        let refs: HashSet<ReferenceId> = self.references.iter().map(|r| r.id).collect();

        for file in &self.files {
            if let Some(r) = file.reference {
                if !refs.contains(&r) {
                    return Err(format!("file {} points at missing reference {}", file.id, r));
                }
            }
        }

        for (r, order) in &self.custom_order {
            if order.is_empty() {
                return Err(format!("empty custom order for {}", r));
            }
            let mut seen = HashSet::new();
            for id in order {
                if !seen.insert(*id) {
                    return Err(format!("duplicate {} in custom order for {}", id, r));
                }
                match self.file(*id) {
                    Some(f) if f.reference == Some(*r) => {}
                    _ => return Err(format!("stale {} in custom order for {}", id, r)),
                }
            }
        }

        let mut synced_names = HashSet::new();
        for file in &self.files {
            if let Origin::Synced { folder } = &file.origin {
                if !synced_names.insert((folder.as_str(), file.name.as_str())) {
                    return Err(format!("duplicate synced name {} in {}", file.name, folder));
                }
            }
        }

        Ok(())
    }
}
