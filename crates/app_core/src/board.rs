//! The board: store, selection and view behind one lock
//!
//! Every command runs to completion under the caller's write lock, cascades
//! included, so readers never see a file pointing at a deleted reference or a
//! selection holding a removed file.

use crate::session::SessionCatalog;
use crate::sync::{reconcile, Scan, SyncSummary};
use crate::view::{self, ViewGroup, ViewState};
use crate::{
    now_millis, reorder, AppError, EntityStore, FileId, FileRecord, NewFile, Origin, Preview, Rating, Reference,
    ReferenceId, SelectionState, StatusFilter, Step,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Board shared between the front end and the sync scheduler
pub type SharedBoard = Arc<RwLock<Board>>;

#[derive(Debug, Clone, Default)]
pub struct Board {
    store: EntityStore,
    selection: SelectionState,
    view: ViewState,
    /// Folder currently mirrored by the scheduler
    synced_folder: Option<String>,
    session: Option<String>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty board using the configured default view
    pub fn with_view(config: &crate::config::ViewConfig) -> Self {
        let mut board = Self::new();
        board.view.sort_order = config.sort_order;
        board.view.status = config.status_filter;
        board
    }

    pub fn shared(self) -> SharedBoard {
        Arc::new(RwLock::new(self))
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn synced_folder(&self) -> Option<&str> {
        self.synced_folder.as_deref()
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    // ===== Queries =====

    pub fn project(&self) -> Vec<ViewGroup<'_>> {
        view::project(&self.store, &self.view)
    }

    pub fn visible_ids(&self) -> Vec<FileId> {
        view::visible_ids(&self.project())
    }

    pub fn reference_preview(&self, reference: ReferenceId) -> Option<&Preview> {
        view::reference_preview(&self.store, reference).and_then(|f| f.preview.as_ref())
    }

    /// Rating shared by the whole selection
    pub fn selection_rating(&self) -> Option<Rating> {
        view::common_rating(&self.store, self.selection.selected())
    }

    /// Can the active reference's files be dragged into a custom order?
    ///
    /// Needs a single-reference view, and none of that reference's files may be
    /// mirrored from the folder being synced.
    pub fn is_reorder_enabled(&self) -> bool {
        let Some(reference) = self.view.active_reference() else {
            return false;
        };
        if self.store.reference(reference).is_none() {
            return false;
        }

        match &self.synced_folder {
            Some(folder) => !self
                .store
                .files_for(reference)
                .any(|f| f.origin.is_synced_from(folder)),
            None => true,
        }
    }

    // ===== File commands =====

    /// Add manually uploaded files
    pub fn upload<I: IntoIterator<Item = NewFile>>(&mut self, files: I) -> Vec<FileId> {
        let records: Vec<FileRecord> = files.into_iter().map(|f| f.into_record(Origin::Manual)).collect();
        let ids: Vec<FileId> = records.iter().map(|f| f.id).collect();
        self.store.add_files(records);
        tracing::debug!("Uploaded {} files", ids.len());
        ids
    }

    /// Delete a manually added file
    pub fn delete_file(&mut self, id: FileId) -> Result<FileRecord, AppError> {
        let file = self
            .store
            .file(id)
            .ok_or_else(|| AppError::FileNotFound(id.to_string()))?;

        if let Some(folder) = file.origin.folder() {
            return Err(AppError::Validation(format!(
                "'{}' is mirrored from '{}'; remove it from the folder instead",
                file.name, folder
            )));
        }

        let removed = self
            .store
            .remove_file(id)
            .ok_or_else(|| AppError::FileNotFound(id.to_string()))?;
        self.selection.forget(&[id]);
        self.debug_check();
        Ok(removed)
    }

    /// Associate files with a reference, or clear their association
    ///
    /// The files leave the selection either way.
    pub fn set_association(&mut self, ids: &[FileId], reference: Option<ReferenceId>) -> Result<usize, AppError> {
        let changed = self.store.set_association(ids, reference, now_millis())?;
        self.selection.forget(ids);
        self.debug_check();
        Ok(changed)
    }

    pub fn set_rating(&mut self, ids: &[FileId], rating: Rating) -> usize {
        self.store.set_rating(ids, rating)
    }

    // ===== Reference commands =====

    pub fn add_references<I, S>(&mut self, texts: I) -> Vec<ReferenceId>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.store.add_references(texts)
    }

    pub fn delete_reference(&mut self, id: ReferenceId) -> Result<Reference, AppError> {
        let unassociated: Vec<FileId> = self.store.files_for(id).map(|f| f.id).collect();
        let removed = self
            .store
            .remove_reference(id, now_millis())
            .ok_or_else(|| AppError::ReferenceNotFound(id.to_string()))?;

        self.selection.forget(&unassociated);
        if self.view.reference == Some(id) {
            self.view.reference = None;
        }
        self.debug_check();
        Ok(removed)
    }

    /// Drop `dragged` in front of `target` within the active reference
    ///
    /// Returns `false` without touching anything when reorder mode is off, the
    /// two are the same file, or either is not in the active reference.
    pub fn reorder(&mut self, dragged: FileId, target: FileId) -> bool {
        if dragged == target || !self.is_reorder_enabled() {
            return false;
        }
        let Some(reference) = self.view.active_reference() else {
            return false;
        };

        let member = |id| self.store.file(id).is_some_and(|f| f.is_associated_with(reference));
        if !member(dragged) || !member(target) {
            return false;
        }

        let visible = self.visible_ids();
        let order = reorder::move_before(self.store.custom_order(reference), &visible, dragged, target);
        self.store.reorder_within_reference(reference, order);
        self.debug_check();
        true
    }

    // ===== Selection =====

    /// Toggle one file; ignored in reorder mode
    pub fn select(&mut self, id: FileId) -> bool {
        if self.is_reorder_enabled() {
            return false;
        }
        self.selection.toggle(id);
        true
    }

    /// Shift-click selection over the visible list; ignored in reorder mode
    pub fn range_select(&mut self, id: FileId) -> bool {
        if self.is_reorder_enabled() {
            return false;
        }
        let visible = self.visible_ids();
        self.selection.range_select(id, &visible);
        true
    }

    /// Move a single selection to the adjacent visible file
    pub fn step(&mut self, direction: Step) -> Option<FileId> {
        if self.is_reorder_enabled() {
            return None;
        }
        let visible = self.visible_ids();
        self.selection.step(direction, &visible)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn select_all_visible(&mut self) -> bool {
        if self.is_reorder_enabled() {
            return false;
        }
        for id in self.visible_ids() {
            if !self.selection.contains(id) {
                self.selection.toggle(id);
            }
        }
        true
    }

    // ===== View =====

    /// Change the status filter; the selection is dropped unless reordering
    pub fn set_status_filter(&mut self, status: StatusFilter) {
        if !self.is_reorder_enabled() {
            self.selection.clear();
        }
        self.view.set_status(status);
    }

    /// Show a single reference's files
    pub fn focus_reference(&mut self, reference: ReferenceId) -> Result<(), AppError> {
        if self.store.reference(reference).is_none() {
            return Err(AppError::ReferenceNotFound(reference.to_string()));
        }
        self.view.focus_reference(reference);
        Ok(())
    }

    pub fn toggle_rating_filter(&mut self, rating: Rating) {
        self.view.toggle_rating(rating);
    }

    pub fn toggle_sort_order(&mut self) {
        self.view.toggle_sort_order();
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    // ===== Sync =====

    /// Commit a scan of the synced folder
    pub fn apply_scan(&mut self, scan: Scan) -> SyncSummary {
        let unreadable = scan.unreadable.len();
        let folder = scan.folder.clone();
        let next = reconcile(self.store.files(), scan);

        self.store.commit_files(next.files, &next.gone);
        self.selection.forget(&next.gone);
        self.debug_check();

        if unreadable > 0 {
            tracing::warn!("{}: {} entries unreadable, left as they were", folder, unreadable);
        }
        next.summary
    }

    pub(crate) fn set_synced_folder(&mut self, folder: Option<String>) {
        self.synced_folder = folder;
    }

    /// Remove every file mirrored from `folder`
    pub(crate) fn remove_folder_files(&mut self, folder: &str) -> usize {
        let gone = self.store.remove_files_where(|f| f.origin.is_synced_from(folder));
        self.selection.forget(&gone);
        self.debug_check();
        gone.len()
    }

    // ===== Sessions =====

    /// Replace the references with a catalog session's list
    pub fn load_session(&mut self, catalog: &dyn SessionCatalog, id: &str) -> Result<Vec<ReferenceId>, AppError> {
        let texts = catalog
            .references(id)
            .ok_or_else(|| AppError::Validation(format!("Unknown session '{}'", id)))?;
        let name = catalog.name(id).unwrap_or_else(|| id.to_string());

        self.reset_session(Some(name));
        let added = self.store.add_references(texts);
        tracing::info!("Loaded session {} with {} references", id, added.len());
        Ok(added)
    }

    /// Start an empty named session
    pub fn create_session(&mut self, name: &str) -> Result<(), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Session name cannot be empty".into()));
        }
        self.reset_session(Some(name.to_string()));
        tracing::info!("Created session {}", name);
        Ok(())
    }

    pub fn unload_session(&mut self) {
        self.reset_session(None);
    }

    fn reset_session(&mut self, name: Option<String>) {
        self.store.reset_references(self.synced_folder.as_deref());
        self.selection.clear();
        self.view.reset();
        self.session = name;
    }

    fn debug_check(&self) {
        debug_assert_eq!(self.store.check(), Ok(()));
        debug_assert!(self.selection.selected().iter().all(|id| self.store.file(*id).is_some()));
    }
}
