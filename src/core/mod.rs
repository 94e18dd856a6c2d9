pub mod clock;
pub mod errors;
pub mod events;
pub mod models;

pub use clock::{
    Clock,
    ManualClock,
    SystemClock,
};
pub use errors::KanjiError;
pub use events::{
    EventBus,
    EventSender,
    KanjiEvent,
};
pub use models::{
    Example,
    KanjiEntry,
    RecentEntry,
    ALL_LEVELS,
    DEFAULT_LEVEL,
};
