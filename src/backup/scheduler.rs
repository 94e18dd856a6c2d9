use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::{
        Arc,
        Mutex,
    },
};

use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{
        interval_at,
        Instant,
        MissedTickBehavior,
    },
};
use tracing::{
    error,
    info,
    warn,
};

use super::BackupFrequency;
use crate::{
    core::{
        EventSender,
        KanjiError,
        KanjiEvent,
    },
    progress::ProgressStore,
};

pub const AUTO_BACKUP_PREFIX: &str = "auto_backup_";
pub const LAST_BACKUP_KEY: &str = "last_local_backup";
pub const MAX_AUTO_BACKUPS: usize = 5;

/// Periodically stores snapshots next to the learner state.
///
/// Runs unattended: failures are logged and reported as `BackupFailed`
/// events, never returned.
pub struct BackupScheduler {
    store: Arc<ProgressStore>,
    events: EventSender,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl BackupScheduler {
    pub fn new(store: Arc<ProgressStore>, events: EventSender) -> Arc<Self> {
        Arc::new(Self { store, events, timer: Mutex::new(None) })
    }

    /// Replaces any running timer. `Never` only cancels. Must be called
    /// from within a tokio runtime for the timer to start.
    pub fn schedule(self: &Arc<Self>, frequency: BackupFrequency) {
        self.cancel();

        let Some(period) = frequency.interval() else {
            info!("automatic backups disabled");
            return;
        };

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "cannot schedule backups outside a runtime");
                return;
            }
        };

        let scheduler = Arc::clone(self);
        let task = handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                scheduler.create_auto_backup();
            }
        });

        if let Ok(mut timer) = self.timer.lock() {
            *timer = Some(task);
        }
        info!(?frequency, "automatic backups scheduled");

        self.check_backup_due(frequency);
    }

    pub fn cancel(&self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(task) = timer.take() {
                task.abort();
            }
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.timer
            .lock()
            .map(|timer| timer.as_ref().map(|task| !task.is_finished()).unwrap_or(false))
            .unwrap_or(false)
    }

    pub fn last_backup(&self) -> Option<i64> {
        self.store.storage().get(LAST_BACKUP_KEY).ok().flatten()?.trim().parse().ok()
    }

    /// Creates a backup now if none exists yet or the last one is older than
    /// the interval. Returns whether a backup was attempted.
    pub fn check_backup_due(&self, frequency: BackupFrequency) -> bool {
        let Some(interval) = frequency.interval_millis() else {
            return false;
        };

        let due = match self.last_backup() {
            None => true,
            Some(last) => self.store.clock().now_millis().saturating_sub(last) >= interval,
        };

        if due {
            self.create_auto_backup();
        }
        due
    }

    /// Returns the backup timestamp, or `None` when it failed.
    pub fn create_auto_backup(&self) -> Option<i64> {
        match self.try_create_auto_backup() {
            Ok(timestamp) => {
                info!(timestamp, "auto backup created");
                self.events.emit(KanjiEvent::BackupCreated { timestamp });
                Some(timestamp)
            }
            Err(e) => {
                error!(error = %e, "error creating auto backup");
                self.events.emit(KanjiEvent::BackupFailed { reason: e.to_string() });
                None
            }
        }
    }

    fn try_create_auto_backup(&self) -> Result<i64, KanjiError> {
        let storage = self.store.storage();
        let blob = self.store.export_snapshot()?;
        let timestamp = self.store.clock().now_millis();

        storage.set(&format!("{}{}", AUTO_BACKUP_PREFIX, timestamp), &blob)?;
        storage.set(LAST_BACKUP_KEY, &timestamp.to_string())?;

        self.prune_auto_backups()?;
        Ok(timestamp)
    }

    /// Auto backup timestamps, oldest first.
    pub fn auto_backups(&self) -> Result<Vec<i64>, KanjiError> {
        let mut timestamps: Vec<i64> = self
            .store
            .storage()
            .keys()?
            .iter()
            .filter_map(|key| key.strip_prefix(AUTO_BACKUP_PREFIX))
            .filter_map(|suffix| suffix.parse().ok())
            .collect();
        timestamps.sort_unstable();
        Ok(timestamps)
    }

    pub fn load_auto_backup(&self, timestamp: i64) -> Result<Option<String>, KanjiError> {
        self.store.storage().get(&format!("{}{}", AUTO_BACKUP_PREFIX, timestamp))
    }

    fn prune_auto_backups(&self) -> Result<(), KanjiError> {
        let timestamps = self.auto_backups()?;
        if timestamps.len() <= MAX_AUTO_BACKUPS {
            return Ok(());
        }

        let excess = timestamps.len() - MAX_AUTO_BACKUPS;
        for timestamp in &timestamps[..excess] {
            if let Err(e) = self.store.storage().remove(&format!("{}{}", AUTO_BACKUP_PREFIX, timestamp)) {
                warn!(timestamp, error = %e, "failed to remove old auto backup");
            }
        }
        Ok(())
    }
}

/// Writes `kanji-backup-YYYY-MM-DD.json` into `dir` and records the time.
pub fn write_backup_file(store: &ProgressStore, dir: &Path) -> Result<PathBuf, KanjiError> {
    let blob = store.export_snapshot()?;
    let clock = store.clock();
    let date = clock.now().with_timezone(&clock.offset()).format("%Y-%m-%d");

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("kanji-backup-{}.json", date));
    fs::write(&path, blob)?;

    store.storage().set(LAST_BACKUP_KEY, &clock.now_millis().to_string())?;
    info!(path = %path.display(), "local backup created");
    Ok(path)
}

pub fn restore_backup_file(store: &ProgressStore, path: &Path) -> Result<(), KanjiError> {
    let blob = fs::read_to_string(path)?;
    store.import_snapshot(&blob)?;
    info!(path = %path.display(), "backup restored");
    Ok(())
}
