//! Automatic and manual backups of the learner snapshot.

pub mod scheduler;

use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

pub use scheduler::{
    restore_backup_file,
    write_backup_file,
    BackupScheduler,
    AUTO_BACKUP_PREFIX,
    LAST_BACKUP_KEY,
    MAX_AUTO_BACKUPS,
};

const DAY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Never,
}

impl BackupFrequency {
    pub fn interval(self) -> Option<Duration> {
        match self {
            BackupFrequency::Daily => Some(Duration::from_secs(DAY_SECS)),
            BackupFrequency::Weekly => Some(Duration::from_secs(7 * DAY_SECS)),
            BackupFrequency::Monthly => Some(Duration::from_secs(30 * DAY_SECS)),
            BackupFrequency::Never => None,
        }
    }

    pub fn interval_millis(self) -> Option<i64> {
        self.interval().map(|interval| interval.as_millis() as i64)
    }
}
