use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, sleep, Instant, MissedTickBehavior},
};

use crate::{
    clock::{Clock, SystemClock},
    config::Config,
    error::SyncError,
    generator::{basic_test_report, DummyReportGenerator},
    hooks::DashboardHooks,
    models::Report,
    notifier::{Notifier, Permission, PlatformNotifier},
    poller::Poller,
    remote::RemoteSource,
    store::{KeyValueStore, ReportSlot, StorageEvent},
};

/// Keeps a dashboard in step with the shared report slot.
///
/// Built once by the application and shared behind an `Arc`; [`start`] spawns
/// the poll loop, the periodic remote sync and the storage-change listener.
///
/// [`start`]: DashboardSync::start
pub struct DashboardSync {
    config: Config,
    slot: ReportSlot,
    clock: Arc<dyn Clock>,
    poller: Mutex<Poller>,
    notifier: Notifier,
    generator: Mutex<DummyReportGenerator>,
    remote: Option<Arc<dyn RemoteSource>>,
    running: Arc<AtomicBool>,
}

pub struct DashboardSyncBuilder {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    hooks: DashboardHooks,
    platform: Option<Arc<dyn PlatformNotifier>>,
    remote: Option<Arc<dyn RemoteSource>>,
}

impl DashboardSyncBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn hooks(mut self, hooks: DashboardHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn platform_notifier(mut self, platform: Arc<dyn PlatformNotifier>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteSource>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn build(self) -> DashboardSync {
        let slot = ReportSlot::new(self.store, self.config.sync_key.clone());
        let poller = Poller::new(slot.clone(), Arc::clone(&self.clock));
        let notifier = Notifier::new(
            self.hooks,
            self.platform,
            self.config.variant.notification_title(),
            self.config.notification_icon.clone(),
        );
        DashboardSync {
            config: self.config,
            slot,
            clock: self.clock,
            poller: Mutex::new(poller),
            notifier,
            generator: Mutex::new(DummyReportGenerator::new()),
            remote: self.remote,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl DashboardSync {
    pub fn builder(config: Config, store: Arc<dyn KeyValueStore>) -> DashboardSyncBuilder {
        DashboardSyncBuilder {
            config,
            store,
            clock: Arc::new(SystemClock),
            hooks: DashboardHooks::default(),
            platform: None,
            remote: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn slot(&self) -> &ReportSlot {
        &self.slot
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts syncing; same as [`DashboardSync::start`].
    pub fn initialize(self: &Arc<Self>) -> Result<SyncHandle, SyncError> {
        tracing::info!("Initializing {} dashboard sync...", self.config.variant.label());
        self.start()
    }

    pub fn start(self: &Arc<Self>) -> Result<SyncHandle, SyncError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SyncError::AlreadyRunning);
        }
        let (stop_tx, stop_rx) = watch::channel(false);

        tracing::info!("Started polling for new {} reports", self.config.variant.label());
        let tasks = vec![
            self.spawn_poll_loop(stop_rx.clone()),
            self.spawn_periodic_sync(stop_rx.clone()),
            self.spawn_storage_listener(stop_rx),
        ];

        Ok(SyncHandle {
            stop: stop_tx,
            tasks,
            running: Arc::clone(&self.running),
        })
    }

    fn spawn_poll_loop(self: &Arc<Self>, mut stop: watch::Receiver<bool>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                sync.check_for_new_reports();
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = sleep(sync.config.poll_interval) => {}
                }
            }
            tracing::debug!("poll loop stopped");
        })
    }

    fn spawn_periodic_sync(self: &Arc<Self>, mut stop: watch::Receiver<bool>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        tokio::spawn(async move {
            let period = sync.config.sync_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = ticker.tick() => sync.sync_reports().await,
                }
            }
            tracing::debug!("periodic sync stopped");
        })
    }

    fn spawn_storage_listener(self: &Arc<Self>, mut stop: watch::Receiver<bool>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        // Subscribe before spawning so writes right after start are not missed.
        let mut events = self.slot.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            sync.handle_storage_event(&event);
                        }
                        None => break,
                    },
                }
            }
            tracing::debug!("storage listener stopped");
        })
    }

    /// Runs one poll cycle. Returns how many new reports were dispatched.
    pub fn check_for_new_reports(&self) -> usize {
        let result = self
            .poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .poll();

        match result {
            Ok(new_reports) if new_reports.is_empty() => 0,
            Ok(new_reports) => {
                tracing::info!(
                    "Found {} new {} report(s)",
                    new_reports.len(),
                    self.config.variant.label()
                );
                self.notifier.handle_new_reports(Some(new_reports.as_slice()));
                new_reports.len()
            }
            Err(e) => {
                tracing::error!("Error checking for new reports: {}", e);
                0
            }
        }
    }

    pub fn handle_new_reports(&self, new_reports: Option<&[Report]>) {
        self.notifier.handle_new_reports(new_reports);
    }

    /// Reacts to a write made by another context. Returns whether the event
    /// concerned the report slot.
    pub fn handle_storage_event(&self, event: &StorageEvent) -> bool {
        if event.key != self.slot.key() {
            return false;
        }
        tracing::info!(
            "New reports detected from {} mobile app",
            self.config.variant.label()
        );
        self.notifier.handle_new_reports(None);
        true
    }

    /// Reconciles the slot with the remote source, if any. Never fails.
    pub async fn sync_reports(&self) {
        if let Err(e) = self.reconcile_with_remote().await {
            tracing::error!("Sync error: {:#}", e);
        }
    }

    async fn reconcile_with_remote(&self) -> anyhow::Result<()> {
        tracing::info!("Syncing {} reports...", self.config.variant.label());
        let Some(remote) = &self.remote else {
            return Ok(());
        };
        let reports = remote.fetch_reports().await?;
        self.slot.replace_all(&reports)?;
        tracing::info!("Synced {} report(s) from remote source", reports.len());
        Ok(())
    }

    pub fn request_notification_permission(&self) -> bool {
        match self.notifier.platform() {
            Some(platform) => {
                let permission = platform.request_permission();
                tracing::info!("Notification permission: {}", permission);
                permission == Permission::Granted
            }
            None => false,
        }
    }

    /// Appends the fixed test report and notifies about it.
    pub fn simulate_mobile_report(&self) -> Result<Report, SyncError> {
        let report = basic_test_report(self.clock.now());
        self.append_and_notify(report, "mobile app")
    }

    /// Appends the next catalog report and notifies about it.
    pub fn simulate_varied_mobile_report(&self) -> Result<Report, SyncError> {
        let report = self
            .generator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .generate(self.clock.now());
        self.append_and_notify(report, "varied")
    }

    fn append_and_notify(&self, report: Report, kind: &str) -> Result<Report, SyncError> {
        self.slot.append(report.clone())?;
        tracing::info!(
            id = %report.id,
            "Simulated {} {} report: {}",
            kind,
            self.config.variant.label(),
            report.title
        );
        self.notifier
            .handle_new_reports(Some(std::slice::from_ref(&report)));
        Ok(report)
    }
}

/// Running sync loops. Dropping the handle stops them without waiting.
pub struct SyncHandle {
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl SyncHandle {
    /// Signals all loops and waits for them to finish.
    pub async fn stop(mut self) {
        let _ = self.stop.send(true);
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::warn!("sync task ended abnormally: {}", e);
            }
        }
        tracing::info!("Dashboard sync stopped");
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        self.running.store(false, Ordering::SeqCst);
    }
}
