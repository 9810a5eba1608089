use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Source of "now". Audit timestamps use UTC; the future-slot checks compare
/// against the clinic's local wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn local_now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    utc_offset_minutes: i32,
}

impl SystemClock {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self { utc_offset_minutes }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_now(&self) -> NaiveDateTime {
        (Utc::now() + Duration::minutes(self.utc_offset_minutes as i64)).naive_utc()
    }
}

/// Clock pinned to one instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    local: NaiveDateTime,
}

impl FixedClock {
    pub fn at(local: NaiveDateTime) -> Self {
        Self { local }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.local.and_utc()
    }

    fn local_now(&self) -> NaiveDateTime {
        self.local
    }
}
