//! Folder sync: reconciliation passes and the scheduler driving them

mod engine;
mod scheduler;

pub use engine::{scan, Scan, SyncSummary};
pub use scheduler::{SyncOutcome, SyncPhase, SyncReport, SyncScheduler, SyncTrigger};

pub(crate) use engine::reconcile;
