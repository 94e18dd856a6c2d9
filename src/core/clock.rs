use std::sync::atomic::{
    AtomicI64,
    Ordering,
};

use chrono::{
    DateTime,
    FixedOffset,
    Local,
    NaiveDate,
    Offset,
    TimeZone,
    Utc,
};

/// Source of "now" and of the offset that decides which calendar day it is.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn offset(&self) -> FixedOffset;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }

    fn local_date(&self, millis: i64) -> Option<NaiveDate> {
        let instant = Utc.timestamp_millis_opt(millis).single()?;
        Some(instant.with_timezone(&self.offset()).date_naive())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        *Local::now().offset()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { millis: AtomicI64::new(start.timestamp_millis()), offset }
    }

    pub fn utc(start: DateTime<Utc>) -> Self {
        Self::new(start, Utc.fix())
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        self.millis.store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis).single().unwrap_or_else(Utc::now)
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}
