use chrono::{DateTime, TimeDelta, Utc};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A source of monotonic readings for a [`Stopwatch`](crate::Stopwatch).
///
/// Readings are measured from an origin the clock picks when it is created,
/// which keeps every mark a signed offset and lets a start mark sit in the
/// future without underflowing an [`Instant`].
pub trait Clock {
    /// The current reading. Never decreases between calls.
    fn now(&self) -> TimeDelta;

    /// The wall-clock time at which the clock showed `reading`, or `None`
    /// when that falls outside the calendar range.
    fn wall_time(&self, reading: TimeDelta) -> Option<DateTime<Utc>>;
}

/// `lhs + rhs`, clamped to the range of [`TimeDelta`].
pub(crate) fn saturating_add(lhs: TimeDelta, rhs: TimeDelta) -> TimeDelta {
    lhs.checked_add(&rhs).unwrap_or(if rhs < TimeDelta::zero() {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

/// `lhs - rhs`, clamped to the range of [`TimeDelta`].
pub(crate) fn saturating_sub(lhs: TimeDelta, rhs: TimeDelta) -> TimeDelta {
    lhs.checked_sub(&rhs).unwrap_or(if rhs < TimeDelta::zero() {
        TimeDelta::MAX
    } else {
        TimeDelta::MIN
    })
}

/// The host monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> TimeDelta {
        TimeDelta::from_std(self.origin.elapsed()).unwrap_or(TimeDelta::MAX)
    }

    fn wall_time(&self, reading: TimeDelta) -> Option<DateTime<Utc>> {
        self.wall_origin.checked_add_signed(reading)
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so a caller can hold one handle and hand
/// another to a stopwatch.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    reading: Rc<Cell<TimeDelta>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: TimeDelta) {
        self.reading.set(saturating_add(self.reading.get(), by));
    }

    /// Moves the reading to `reading`, backwards included.
    pub fn set(&self, reading: TimeDelta) {
        self.reading.set(reading);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimeDelta {
        self.reading.get()
    }

    fn wall_time(&self, reading: TimeDelta) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::UNIX_EPOCH.checked_add_signed(reading)
    }
}
