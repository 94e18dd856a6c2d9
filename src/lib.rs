pub mod backup;
pub mod catalog;
pub mod core;
pub mod persistence;
pub mod progress;
pub mod session;
pub mod speech;

pub use crate::core::{
    KanjiEntry,
    KanjiError,
    KanjiEvent,
};
pub use crate::progress::ProgressStore;
pub use crate::session::SessionManager;
