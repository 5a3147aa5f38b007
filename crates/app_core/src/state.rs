//! Application state management

use crate::session::{SessionCatalog, StaticCatalog};
use crate::sync::{SyncPhase, SyncReport, SyncScheduler, SyncSummary};
use crate::{AppConfig, AppError, Board, SharedBoard};
use app_fs::{DirectoryHandle, LocalDirectory};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// Main application state
pub struct AppState {
    /// Application configuration
    pub config: RwLock<AppConfig>,

    /// Files, references, selection and view
    pub board: SharedBoard,

    /// Session catalog seeded from config
    pub catalog: Arc<dyn SessionCatalog>,

    /// Folder sync
    pub sync: SyncScheduler,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: AppConfig) -> Self {
        let board = Board::with_view(&config.view).shared();
        let catalog: Arc<dyn SessionCatalog> = Arc::new(StaticCatalog::from_config(&config));
        let sync = SyncScheduler::new(Arc::clone(&board), config.sync.interval());

        Self {
            config: RwLock::new(config),
            board,
            catalog,
            sync,
        }
    }

    /// Open a local folder with the configured filters
    pub fn open_folder(&self, path: &Path) -> Result<Arc<dyn DirectoryHandle>, AppError> {
        let options = self.config.read().sync.list_options();
        let dir = LocalDirectory::open(path, options).map_err(|e| {
            if e.is_access_denied() {
                AppError::PermissionDenied(path.display().to_string())
            } else {
                AppError::Validation(format!("Cannot open {}: {}", path.display(), e))
            }
        })?;
        Ok(Arc::new(dir))
    }

    pub async fn start_sync(&self, handle: Arc<dyn DirectoryHandle>) -> Result<SyncSummary, AppError> {
        self.sync.start(handle).await
    }

    pub async fn stop_sync(&self) {
        self.sync.stop().await
    }

    pub async fn refresh_sync(&self) -> Result<SyncSummary, AppError> {
        self.sync.refresh().await
    }

    pub fn sync_status(&self) -> SyncPhase {
        self.sync.status()
    }

    pub fn poll_sync_reports(&self) -> Vec<SyncReport> {
        self.sync.poll_reports()
    }

    /// Load a catalog session into the board
    pub fn load_session(&self, id: &str) -> Result<usize, AppError> {
        let added = self.board.write().load_session(self.catalog.as_ref(), id)?;
        Ok(added.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SortOrder;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_sync_local_folder() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.png"), b"png").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip").unwrap();

        let state = AppState::new(AppConfig::default());
        let handle = state.open_folder(dir.path()).unwrap();

        let summary = state.start_sync(handle).await.unwrap();
        assert_eq!(summary.added, 1);
        assert!(state.board.read().store().files()[0].has_preview());

        std::fs::remove_file(dir.path().join("a.png")).unwrap();
        assert_eq!(state.refresh_sync().await.unwrap().removed, 1);

        state.stop_sync().await;
        assert_eq!(state.sync_status(), SyncPhase::Idle);
    }

    #[test]
    fn test_board_uses_view_config() {
        let mut config = AppConfig::default();
        config.view.sort_order = SortOrder::Ascending;

        let state = AppState::new(config);
        assert_eq!(state.board.read().view().sort_order, SortOrder::Ascending);
        assert_eq!(state.load_session("session_client_beta").unwrap(), 5);
        assert!(state.open_folder(Path::new("/definitely/not/here")).is_err());
    }
}
