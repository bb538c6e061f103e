//! A stopwatch that measures elapsed time across start, stop, resume and lap
//! operations, with a compact text encoding of the elapsed value.
//!
//! ```
//! use chrono::TimeDelta;
//! use stopwatch::Stopwatch;
//!
//! // Seeded with five seconds already on the clock.
//! let mut stopwatch = Stopwatch::start_new(TimeDelta::seconds(5));
//! stopwatch.lap();
//! stopwatch.stop();
//!
//! assert!(stopwatch.is_stopped());
//! assert!(stopwatch.elapsed() >= TimeDelta::seconds(5));
//! assert_eq!(stopwatch.laps().len(), 1);
//! ```

pub mod clock;
pub mod duration;
mod stopwatch;

pub use clock::{Clock, ManualClock, SystemClock};
pub use duration::{EncodeError, FormattedDuration, ParseError};
pub use stopwatch::Stopwatch;
