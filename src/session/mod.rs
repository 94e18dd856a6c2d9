//! Deciding which kanji to present and applying mastery transitions.

pub mod manager;
pub mod selection;

pub use manager::{
    MasteryOutcome,
    Presented,
    SessionManager,
};
pub use selection::{
    select_next,
    Selection,
};
