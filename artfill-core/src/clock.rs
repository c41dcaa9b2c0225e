use chrono::{DateTime, Local, NaiveDate, Utc};

/// Time source injected into the stores so cooldown and quota behavior is
/// testable without waiting for wall-clock boundaries.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;

    /// The current local calendar day; daily quotas reset when this rolls
    /// over (local midnight).
    fn local_date(&self) -> NaiveDate;

    /// The local calendar day a past instant falls on, under the same
    /// timezone notion as [`Clock::local_date`].
    fn local_date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&Local).date_naive()
    }
}

/// Wall-clock implementation used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_date(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
