//! Timer-driven folder sync
//!
//! One folder at a time. Passes are serialized through a gate: timer ticks
//! skip when a pass is in flight, manual refreshes wait for it. Blocking I/O
//! runs on the blocking pool and only the commit takes the board lock.

use super::engine::{self, SyncSummary};
use crate::board::SharedBoard;
use crate::AppError;
use app_fs::{DirectoryHandle, PermissionState};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Scheduler state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Active { folder: String },
    /// Waiting for an in-flight pass before shutting down
    Stopping,
}

/// What started a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Start,
    Tick,
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed(SyncSummary),
    Failed {
        message: String,
        /// The failure ended the sync
        stopped: bool,
    },
}

/// Result of one pass, for user feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub folder: String,
    pub trigger: SyncTrigger,
    pub outcome: SyncOutcome,
}

struct Session {
    folder: String,
    handle: Arc<dyn DirectoryHandle>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct State {
    session: Option<Session>,
    stopping: bool,
}

struct Shared {
    board: SharedBoard,
    interval: Duration,
    state: Mutex<State>,
    /// Bumped on every start and halt; stale timers exit when it moves
    generation: AtomicU64,
    pass_gate: tokio::sync::Mutex<()>,
    reports: Sender<SyncReport>,
}

/// Keeps the board mirrored with one directory
pub struct SyncScheduler {
    shared: Arc<Shared>,
    reports: Receiver<SyncReport>,
}

impl SyncScheduler {
    pub fn new(board: SharedBoard, interval: Duration) -> Self {
        let (tx, rx) = unbounded();

        Self {
            shared: Arc::new(Shared {
                board,
                interval,
                state: Mutex::new(State::default()),
                generation: AtomicU64::new(0),
                pass_gate: tokio::sync::Mutex::new(()),
                reports: tx,
            }),
            reports: rx,
        }
    }

    pub fn status(&self) -> SyncPhase {
        let state = self.shared.state.lock();
        match (&state.session, state.stopping) {
            (Some(_), true) => SyncPhase::Stopping,
            (Some(session), false) => SyncPhase::Active {
                folder: session.folder.clone(),
            },
            (None, _) => SyncPhase::Idle,
        }
    }

    pub fn folder(&self) -> Option<String> {
        self.shared.state.lock().session.as_ref().map(|s| s.folder.clone())
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status(), SyncPhase::Active { .. })
    }

    /// Start mirroring `handle`, replacing any running sync
    ///
    /// Fails without side effects when read permission is not granted. The
    /// first pass runs before this returns; if it fails to list the folder the
    /// sync stays armed and the error is returned.
    pub async fn start(&self, handle: Arc<dyn DirectoryHandle>) -> Result<SyncSummary, AppError> {
        let folder = handle.name().to_string();

        let probe = Arc::clone(&handle);
        tokio::task::spawn_blocking(move || permit(&*probe, true))
            .await
            .map_err(|e| AppError::PermissionDenied(format!("{}: {}", folder, e)))??;

        let _gate = self.shared.pass_gate.lock().await;

        // Same folder again: keep its files, the first pass updates them
        let restarting = self.folder().as_deref() == Some(folder.as_str());
        self.shared.halt(restarting);

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.board.write().set_synced_folder(Some(folder.clone()));
        self.shared.state.lock().session = Some(Session {
            folder: folder.clone(),
            handle: Arc::clone(&handle),
            generation,
            timer: None,
        });
        tracing::info!("Sync started for {} every {:?}", folder, self.shared.interval);

        let result = self.shared.pass(&folder, &handle, SyncTrigger::Start).await;

        if let Some(session) = self
            .shared
            .state
            .lock()
            .session
            .as_mut()
            .filter(|s| s.generation == generation)
        {
            session.timer = Some(spawn_timer(Arc::clone(&self.shared), generation));
        }

        result
    }

    /// Run a pass now, after any pass already in flight
    pub async fn refresh(&self) -> Result<SyncSummary, AppError> {
        let _gate = self.shared.pass_gate.lock().await;
        let (folder, handle, _) = self
            .shared
            .current()
            .ok_or_else(|| AppError::Validation("No folder is being synced".into()))?;

        self.shared.pass(&folder, &handle, SyncTrigger::Refresh).await
    }

    /// Stop syncing and drop the folder's files
    ///
    /// An in-flight pass finishes and commits first. Stopping an idle
    /// scheduler does nothing.
    pub async fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.session.is_none() {
                return;
            }
            state.stopping = true;
        }

        let _gate = self.shared.pass_gate.lock().await;
        self.shared.halt(false);
    }

    /// Drain queued pass reports (non-blocking)
    pub fn poll_reports(&self) -> Vec<SyncReport> {
        self.reports.try_iter().collect()
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        let timer = self
            .shared
            .state
            .lock()
            .session
            .as_mut()
            .and_then(|s| s.timer.take());
        if let Some(timer) = timer {
            timer.abort();
        }
    }
}

impl Shared {
    fn current(&self) -> Option<(String, Arc<dyn DirectoryHandle>, u64)> {
        let state = self.state.lock();
        if state.stopping {
            return None;
        }
        state
            .session
            .as_ref()
            .map(|s| (s.folder.clone(), Arc::clone(&s.handle), s.generation))
    }

    async fn tick(&self, generation: u64) {
        let Ok(_gate) = self.pass_gate.try_lock() else {
            tracing::debug!("Pass in flight, skipping tick");
            return;
        };

        match self.current() {
            Some((folder, handle, current)) if current == generation => {
                // Failures are reported through the channel
                let _ = self.pass(&folder, &handle, SyncTrigger::Tick).await;
            }
            _ => {}
        }
    }

    /// One reconciliation pass; the caller holds the pass gate
    async fn pass(
        &self,
        folder: &str,
        handle: &Arc<dyn DirectoryHandle>,
        trigger: SyncTrigger,
    ) -> Result<SyncSummary, AppError> {
        let may_prompt = trigger != SyncTrigger::Tick;
        let probe = Arc::clone(handle);

        let scanned = tokio::task::spawn_blocking(move || {
            permit(&*probe, may_prompt)?;
            engine::scan(&*probe)
        })
        .await
        .map_err(|e| AppError::Enumeration(format!("{}: scan task failed: {}", folder, e)))
        .and_then(|result| result);

        let result = scanned.map(|scan| self.board.write().apply_scan(scan));

        let stopped = match &result {
            Ok(summary) if summary.is_empty() => {
                tracing::debug!("{}: no changes", folder);
                false
            }
            Ok(summary) => {
                tracing::info!("{}: {}", folder, summary);
                false
            }
            Err(e) if e.stops_sync() => {
                tracing::error!("{}; stopping sync", e);
                self.halt(true);
                true
            }
            Err(e) => {
                tracing::warn!("Sync pass failed: {}", e);
                false
            }
        };

        self.report(folder, trigger, &result, stopped);
        result
    }

    fn report(&self, folder: &str, trigger: SyncTrigger, result: &Result<SyncSummary, AppError>, stopped: bool) {
        let outcome = match result {
            // Quiet ticks are not worth a notification
            Ok(summary) if summary.is_empty() && trigger == SyncTrigger::Tick => return,
            Ok(summary) => SyncOutcome::Completed(*summary),
            Err(e) => SyncOutcome::Failed {
                message: e.user_message(),
                stopped,
            },
        };

        let _ = self.reports.send(SyncReport {
            folder: folder.to_string(),
            trigger,
            outcome,
        });
    }

    /// End the current session, if any, without waiting for the gate
    ///
    /// The folder's files stay on the board when `retain_files` is set.
    fn halt(&self, retain_files: bool) -> Option<String> {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let session = {
            let mut state = self.state.lock();
            state.stopping = false;
            state.session.take()
        }?;

        if let Some(timer) = session.timer {
            timer.abort();
        }

        let mut board = self.board.write();
        board.set_synced_folder(None);
        if retain_files {
            tracing::info!("Sync stopped for {}", session.folder);
        } else {
            let removed = board.remove_folder_files(&session.folder);
            tracing::info!("Sync stopped for {}, removed {} files", session.folder, removed);
        }

        Some(session.folder)
    }
}

fn spawn_timer(shared: Arc<Shared>, generation: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = shared.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if shared.generation.load(Ordering::SeqCst) != generation {
                break;
            }
            shared.tick(generation).await;
        }
    })
}

/// Ensure read access, prompting once when allowed
fn permit(handle: &dyn DirectoryHandle, may_prompt: bool) -> Result<(), AppError> {
    let permission = match handle.query_permission() {
        PermissionState::Prompt if may_prompt => handle.request_permission(),
        other => other,
    };

    if permission.is_granted() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(handle.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Board, NewFile};
    use app_fs::{DirEntry, FsError};
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::mpsc;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

    struct FakeDir {
        name: String,
        files: Mutex<Vec<(String, i64)>>,
        permission: Mutex<PermissionState>,
        broken: AtomicBool,
        requests: AtomicUsize,
        listings: AtomicUsize,
        hold: Mutex<Option<(UnboundedSender<()>, mpsc::Receiver<()>)>>,
    }

    impl FakeDir {
        fn new(name: &str, files: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                files: Mutex::new(files.iter().map(|f| (f.to_string(), 1)).collect()),
                permission: Mutex::new(PermissionState::Granted),
                broken: AtomicBool::new(false),
                requests: AtomicUsize::new(0),
                listings: AtomicUsize::new(0),
                hold: Mutex::new(None),
            })
        }

        /// Park the next listing until the returned sender fires
        ///
        /// The receiver yields once the listing has started.
        fn hold_next_listing(&self) -> (UnboundedReceiver<()>, mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = unbounded_channel();
            let (release_tx, release_rx) = mpsc::channel();
            *self.hold.lock() = Some((entered_tx, release_rx));
            (entered_rx, release_tx)
        }

        fn listings(&self) -> usize {
            self.listings.load(Ordering::SeqCst)
        }

        fn put(&self, name: &str, modified: i64) {
            let mut files = self.files.lock();
            files.retain(|(n, _)| n != name);
            files.push((name.to_string(), modified));
        }

        fn set_permission(&self, permission: PermissionState) {
            *self.permission.lock() = permission;
        }
    }

    impl DirectoryHandle for FakeDir {
        fn name(&self) -> &str {
            &self.name
        }

        fn entries(&self) -> app_fs::Result<Vec<DirEntry>> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            let held = self.hold.lock().take();
            if let Some((entered, release)) = held {
                let _ = entered.send(());
                let _ = release.recv();
            }

            if self.broken.load(Ordering::SeqCst) {
                return Err(FsError::Io(std::io::Error::other("device unplugged")));
            }
            Ok(self
                .files
                .lock()
                .iter()
                .map(|(name, modified)| DirEntry {
                    name: name.clone(),
                    mime_type: app_fs::media_type_for_name(name).into(),
                    size: name.len() as u64,
                    last_modified: *modified,
                })
                .collect())
        }

        fn read(&self, entry: &DirEntry) -> app_fs::Result<Vec<u8>> {
            Ok(entry.name.as_bytes().to_vec())
        }

        fn query_permission(&self) -> PermissionState {
            *self.permission.lock()
        }

        fn request_permission(&self) -> PermissionState {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let mut permission = self.permission.lock();
            if *permission == PermissionState::Prompt {
                *permission = PermissionState::Granted;
            }
            *permission
        }
    }

    fn setup() -> (SharedBoard, SyncScheduler) {
        let board = Board::new().shared();
        let scheduler = SyncScheduler::new(Arc::clone(&board), Duration::from_secs(1));
        (board, scheduler)
    }

    async fn next_report(scheduler: &SyncScheduler) -> SyncReport {
        for _ in 0..100 {
            if let Some(report) = scheduler.poll_reports().into_iter().next() {
                return report;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("no sync report");
    }

    fn names(board: &SharedBoard) -> Vec<String> {
        let mut names: Vec<String> = board.read().store().files().iter().map(|f| f.name.clone()).collect();
        names.sort();
        names
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_initial_pass() {
        let (board, scheduler) = setup();
        let dir = FakeDir::new("shots", &["a.png", "b.png"]);

        let summary = scheduler.start(dir).await.unwrap();

        assert_eq!(summary.added, 2);
        assert_eq!(scheduler.status(), SyncPhase::Active { folder: "shots".into() });
        assert_eq!(board.read().synced_folder(), Some("shots"));

        let reports = scheduler.poll_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].trigger, SyncTrigger::Start);
        assert_eq!(reports[0].outcome, SyncOutcome::Completed(summary));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_picks_up_changes() {
        let (board, scheduler) = setup();
        let dir = FakeDir::new("shots", &["a.png"]);
        scheduler.start(dir.clone()).await.unwrap();
        scheduler.poll_reports();

        dir.put("c.png", 5);
        let report = next_report(&scheduler).await;

        assert_eq!(report.trigger, SyncTrigger::Tick);
        assert_eq!(
            report.outcome,
            SyncOutcome::Completed(SyncSummary {
                added: 1,
                ..Default::default()
            })
        );
        assert_eq!(names(&board), vec!["a.png", "c.png"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoked_permission_stops_sync() {
        let (board, scheduler) = setup();
        let dir = FakeDir::new("shots", &["a.png"]);
        scheduler.start(dir.clone()).await.unwrap();
        scheduler.poll_reports();
        let before = board.read().store().clone();

        dir.set_permission(PermissionState::Denied);
        dir.put("late.png", 9);
        let report = next_report(&scheduler).await;

        assert_eq!(report.trigger, SyncTrigger::Tick);
        assert!(matches!(report.outcome, SyncOutcome::Failed { stopped: true, .. }));
        assert_eq!(scheduler.status(), SyncPhase::Idle);
        assert_eq!(board.read().store(), &before);
        assert_eq!(board.read().synced_folder(), None);

        // Timer is gone: nothing runs even once access comes back
        dir.set_permission(PermissionState::Granted);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(scheduler.poll_reports().is_empty());
        assert_eq!(board.read().store(), &before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_permission_changes_nothing() {
        let (board, scheduler) = setup();
        let dir = FakeDir::new("shots", &["a.png"]);
        dir.set_permission(PermissionState::Denied);

        let result = scheduler.start(dir).await;

        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
        assert_eq!(scheduler.status(), SyncPhase::Idle);
        assert!(board.read().store().files().is_empty());
        assert!(scheduler.poll_reports().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_is_requested() {
        let (_board, scheduler) = setup();
        let dir = FakeDir::new("shots", &["a.png"]);
        dir.set_permission(PermissionState::Prompt);

        scheduler.start(dir.clone()).await.unwrap();
        assert_eq!(dir.requests.load(Ordering::SeqCst), 1);
        assert!(scheduler.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_removes_folder_files() {
        let (board, scheduler) = setup();
        board.write().upload([NewFile::new("mine.png", vec![1], 1)]);
        scheduler.start(FakeDir::new("shots", &["a.png"])).await.unwrap();

        scheduler.stop().await;
        assert_eq!(scheduler.status(), SyncPhase::Idle);
        assert_eq!(names(&board), vec!["mine.png"]);

        scheduler.stop().await;
        assert!(matches!(scheduler.refresh().await, Err(AppError::Validation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_folders() {
        let (board, scheduler) = setup();
        scheduler.start(FakeDir::new("one", &["a.png"])).await.unwrap();

        let two = FakeDir::new("two", &["b.png"]);
        scheduler.start(two.clone()).await.unwrap();
        assert_eq!(names(&board), vec!["b.png"]);
        let id = board.read().store().files()[0].id;

        // Restarting the same folder keeps identities
        let summary = scheduler.start(two).await.unwrap();
        assert!(summary.is_empty());
        assert_eq!(board.read().store().files()[0].id, id);
        assert_eq!(scheduler.folder().as_deref(), Some("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_keeps_sync() {
        let (board, scheduler) = setup();
        let dir = FakeDir::new("shots", &["a.png"]);
        scheduler.start(dir.clone()).await.unwrap();
        let before = board.read().store().clone();

        dir.broken.store(true, Ordering::SeqCst);
        dir.put("b.png", 3);
        assert!(matches!(scheduler.refresh().await, Err(AppError::Enumeration(_))));
        assert!(scheduler.is_active());
        assert_eq!(board.read().store(), &before);

        dir.broken.store(false, Ordering::SeqCst);
        assert_eq!(scheduler.refresh().await.unwrap().added, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_do_not_double_apply() {
        let (board, scheduler) = setup();
        let dir = FakeDir::new("shots", &["a.png"]);
        scheduler.start(dir.clone()).await.unwrap();

        dir.put("b.png", 2);
        let (first, second) = tokio::join!(scheduler.refresh(), scheduler.refresh());

        assert_eq!(first.unwrap().added + second.unwrap().added, 1);
        assert_eq!(names(&board), vec!["a.png", "b.png"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_during_refresh_is_skipped() {
        let (board, scheduler) = setup();
        let scheduler = Arc::new(scheduler);
        let dir = FakeDir::new("shots", &["a.png"]);
        scheduler.start(dir.clone()).await.unwrap();
        scheduler.poll_reports();

        let (mut entered, release) = dir.hold_next_listing();
        dir.put("b.png", 2);
        let refresh = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.refresh().await }
        });
        entered.recv().await.unwrap();

        // The tick lands while the refresh holds the gate
        tokio::time::advance(Duration::from_millis(1_500)).await;
        tokio::task::yield_now().await;
        assert_eq!(dir.listings(), 2);

        release.send(()).unwrap();
        assert_eq!(refresh.await.unwrap().unwrap().added, 1);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(dir.listings(), 2);
        let reports = scheduler.poll_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].trigger, SyncTrigger::Refresh);

        // Later ticks still run
        dir.put("c.png", 3);
        let report = next_report(&scheduler).await;
        assert_eq!(report.trigger, SyncTrigger::Tick);
        assert_eq!(names(&board), vec!["a.png", "b.png", "c.png"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_pass_in_flight() {
        let (board, scheduler) = setup();
        let scheduler = Arc::new(scheduler);
        board.write().upload([NewFile::new("mine.png", vec![1], 1)]);
        let dir = FakeDir::new("shots", &["a.png"]);
        scheduler.start(dir.clone()).await.unwrap();
        scheduler.poll_reports();

        let (mut entered, release) = dir.hold_next_listing();
        dir.put("b.png", 2);
        let refresh = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.refresh().await }
        });
        entered.recv().await.unwrap();

        let stop = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.stop().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(scheduler.status(), SyncPhase::Stopping);

        // Ticks are suppressed while stopping
        tokio::time::advance(Duration::from_millis(1_500)).await;
        tokio::task::yield_now().await;

        release.send(()).unwrap();
        assert_eq!(refresh.await.unwrap().unwrap().added, 1);
        stop.await.unwrap();

        assert_eq!(scheduler.status(), SyncPhase::Idle);
        assert_eq!(names(&board), vec!["mine.png"]);
        let reports = scheduler.poll_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].outcome,
            SyncOutcome::Completed(SyncSummary {
                added: 1,
                ..Default::default()
            })
        );

        dir.put("late.png", 4);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(dir.listings(), 2);
        assert!(scheduler.poll_reports().is_empty());
        assert_eq!(names(&board), vec!["mine.png"]);
    }
}
