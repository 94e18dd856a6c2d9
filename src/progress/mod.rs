//! Durable learner state: the progress record, the recent-activity list,
//! settings, and versioned snapshots of all three.

pub mod recent;
pub mod record;
pub mod settings;
pub mod snapshot;
pub mod store;

pub use recent::{
    RecentList,
    MAX_RECENT,
};
pub use record::ProgressRecord;
pub use settings::{
    Settings,
    SettingsMap,
};
pub use snapshot::Snapshot;
pub use store::{
    ProgressStore,
    Stats,
};
