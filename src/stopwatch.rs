use crate::clock::{saturating_add, saturating_sub, Clock, SystemClock};
use crate::duration::{self, EncodeError, FormattedDuration, ParseError};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::io;
use std::str::FromStr;

// Matches the "Jan _2 15:04:05" layout used by syslog-style timestamps.
const STAMP: &str = "%b %e %H:%M:%S";

struct Stamp(Option<DateTime<Utc>>);

impl Display for Stamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(time) => write!(f, "{}", time.format(STAMP)),
            None => f.write_str("out of range"),
        }
    }
}

/// Measures elapsed time across start, stop, resume and lap operations.
///
/// All marks are readings of the stopwatch's [`Clock`]. A stopwatch is in one
/// of three states:
///
/// * reset: no start mark. Elapsed time is zero and laps are not recorded.
/// * running: elapsed time is the distance from the start mark to now. The
///   start mark may lie in the future, in which case elapsed time is negative
///   (a countdown).
/// * stopped: the stop mark lies strictly after the start mark and elapsed
///   time is frozen at the distance between the two.
///
/// Mark arithmetic saturates at the bounds of [`TimeDelta`], so extreme
/// offsets clamp instead of panicking.
///
/// A `Stopwatch` owns no lock. Callers that share one between threads must
/// guard it themselves, e.g. with a `Mutex` held across every call.
#[derive(Debug, Clone)]
pub struct Stopwatch<C = SystemClock> {
    clock: C,
    start: Option<TimeDelta>,
    stop: Option<TimeDelta>,
    last_lap: Option<TimeDelta>,
    laps: Vec<TimeDelta>,
}

impl Stopwatch {
    /// Creates a stopwatch in the reset state on the host clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }

    /// Creates a stopwatch on the host clock that is already running, with
    /// `offset` as its initial elapsed time.
    pub fn start_new(offset: TimeDelta) -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start(offset);
        stopwatch
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Stopwatch<C> {
    /// Creates a stopwatch in the reset state reading from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            start: None,
            stop: None,
            last_lap: None,
            laps: Vec::new(),
        }
    }

    /// Creates a running stopwatch whose elapsed time is currently `elapsed`.
    pub fn from_elapsed(clock: C, elapsed: TimeDelta) -> Self {
        let mut stopwatch = Self::with_clock(clock);
        stopwatch.start(elapsed);
        stopwatch
    }

    /// Decodes an elapsed time produced by [`Stopwatch::encode`] into a
    /// running stopwatch.
    pub fn from_encoded(clock: C, encoded: &str) -> Result<Self, ParseError> {
        let elapsed = duration::parse(encoded)?;
        Ok(Self::from_elapsed(clock, elapsed))
    }

    /// Starts or resumes timing.
    ///
    /// From the reset state this sets the start mark to `now - offset`, so a
    /// positive offset seeds already elapsed time and a negative one counts
    /// down towards zero. Laps are cleared.
    ///
    /// From the stopped state the offset is ignored: the paused interval is
    /// cut out of the timeline and recorded laps are kept. Calling this on a
    /// running stopwatch does nothing.
    pub fn start(&mut self, offset: TimeDelta) {
        let now = self.clock.now();

        if self.start.is_none() {
            let start = saturating_sub(now, offset);

            self.start = Some(start);
            self.stop = None;
            self.last_lap = Some(start);
            self.laps.clear();

            tracing::trace!(offset = %FormattedDuration(offset), "started stopwatch");
        } else if let Some(stop) = self.stopped_at() {
            let paused = saturating_sub(now, stop);

            self.start = self.start.map(|start| saturating_add(start, paused));
            self.last_lap = self.last_lap.map(|mark| saturating_add(mark, paused));
            self.stop = None;

            tracing::trace!(paused = %FormattedDuration(paused), "resumed stopwatch");
        }
    }

    /// Freezes the elapsed time at the current reading.
    ///
    /// Calling this again without an intervening [`Stopwatch::start`] moves
    /// the freeze point forward to the new reading, so the paused interval is
    /// then counted as elapsed time.
    pub fn stop(&mut self) {
        let now = self.clock.now();
        self.stop = Some(now);

        tracing::trace!(elapsed = %FormattedDuration(self.elapsed_at(now)), "stopped stopwatch");
    }

    /// Clears every mark and all laps.
    pub fn reset(&mut self) {
        self.start = None;
        self.stop = None;
        self.last_lap = None;
        self.laps.clear();

        tracing::trace!("reset stopwatch");
    }

    /// Records the time since the previous lap (or the start) and returns it.
    ///
    /// Returns zero without recording anything unless the stopwatch is
    /// running.
    pub fn lap(&mut self) -> TimeDelta {
        if !self.is_running() {
            return TimeDelta::zero();
        }

        let Some(last_lap) = self.last_lap else {
            return TimeDelta::zero();
        };

        let now = self.clock.now();
        let lap = saturating_sub(now, last_lap);

        self.laps.push(lap);
        self.last_lap = Some(now);

        tracing::trace!(lap = %FormattedDuration(lap), count = self.laps.len(), "recorded lap");

        lap
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped_at().is_some()
    }

    pub fn is_reset(&self) -> bool {
        self.start.is_none()
    }

    pub fn is_running(&self) -> bool {
        !self.is_reset() && !self.is_stopped()
    }

    /// The elapsed time, negative while counting down.
    pub fn elapsed(&self) -> TimeDelta {
        self.elapsed_at(self.clock.now())
    }

    /// Recorded laps, oldest first.
    pub fn laps(&self) -> &[TimeDelta] {
        &self.laps
    }

    /// Encodes the current elapsed time, e.g. `"1m30.25s"`.
    ///
    /// Fails when the elapsed time exceeds about 292 years, which decoding
    /// could not read back.
    pub fn encode(&self) -> Result<String, EncodeError> {
        duration::encode(self.elapsed())
    }

    /// Writes `"<label> - elapsed: <duration>"` as a line to `out`.
    pub fn write_report<W: io::Write>(&self, mut out: W, label: &str) -> io::Result<()> {
        writeln!(out, "{label} - elapsed: {}", FormattedDuration(self.elapsed()))
    }

    /// Prints the report line to standard output.
    pub fn print(&self, label: &str) {
        println!("{label} - elapsed: {}", FormattedDuration(self.elapsed()));
    }

    /// Emits the report line as an info event.
    pub fn log(&self, label: &str) {
        let elapsed = FormattedDuration(self.elapsed());
        tracing::info!(label, %elapsed, "{label} - elapsed: {elapsed}");
    }

    fn stopped_at(&self) -> Option<TimeDelta> {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) if stop > start => Some(stop),
            _ => None,
        }
    }

    fn elapsed_at(&self, now: TimeDelta) -> TimeDelta {
        match (self.start, self.stopped_at()) {
            (Some(start), Some(stop)) => saturating_sub(stop, start),
            (Some(start), None) => saturating_sub(now, start),
            (None, _) => TimeDelta::zero(),
        }
    }
}

impl<C: Clock> Display for Stopwatch<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let now = self.clock.now();
        let current = Stamp(self.clock.wall_time(now));
        let elapsed = FormattedDuration(self.elapsed_at(now));

        match self.start {
            Some(start) => {
                let start = Stamp(self.clock.wall_time(start));
                write!(f, "[start: {start} current: {current} elapsed: {elapsed}]")
            }
            None => write!(f, "[start: - current: {current} elapsed: {elapsed}]"),
        }
    }
}

impl<C: Clock + Default> FromStr for Stopwatch<C> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_encoded(C::default(), s)
    }
}

impl<C: Clock> Serialize for Stopwatch<C> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = self.encode().map_err(ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

impl<'de, C: Clock + Default> Deserialize<'de> for Stopwatch<C> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(de::Error::custom)
    }
}
