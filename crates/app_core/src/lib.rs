//! RefBoard Core Domain Logic
//!
//! This crate contains:
//! - Entity store (files, references, custom order)
//! - View projection, selection and reordering
//! - Folder sync engine and scheduler
//! - Board, commands and application state
//! - Configuration and error types

pub mod board;
pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod reorder;
pub mod selection;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;
pub mod view;

pub use board::{Board, SharedBoard};
pub use command::{Command, CommandOutput};
pub use config::{AppConfig, GeneralConfig, SessionConfig, SortOrder, SyncConfig, ViewConfig};
pub use error::AppError;
pub use model::{now_millis, FileId, FileRecord, NewFile, Origin, Preview, Rating, Reference, ReferenceId};
pub use selection::{SelectionState, Step};
pub use session::{SessionCatalog, SessionInfo, StaticCatalog};
pub use state::AppState;
pub use store::EntityStore;
pub use sync::{SyncOutcome, SyncPhase, SyncReport, SyncScheduler, SyncSummary, SyncTrigger};
pub use view::{StatusFilter, ViewGroup, ViewState};
