//! Text encoding for signed durations.
//!
//! Durations are written as a sequence of `<number><unit>` terms such as
//! `72h3m0.5s`, `1.5ms` or `-2m10s`. Values below one second use a single
//! unit out of `ns`, `µs` and `ms`; everything else is split into hours,
//! minutes and (fractional) seconds.

use chrono::TimeDelta;
use std::fmt::{Display, Formatter};
use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

// Largest magnitude a parsed duration may have, in nanoseconds.
const LIMIT: u128 = 1 << 63;

// Digits past this point are below nanosecond precision for every unit.
const MAX_FRACTION_DIGITS: usize = 18;

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", NANOS_PER_MICRO),
    ("µs", NANOS_PER_MICRO),
    ("μs", NANOS_PER_MICRO),
    ("ms", NANOS_PER_MILLI),
    ("s", NANOS_PER_SEC),
    ("m", NANOS_PER_MINUTE),
    ("h", NANOS_PER_HOUR),
];

/// An error from [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration {input:?}")]
    Invalid { input: String },
    #[error("missing unit in duration {input:?}")]
    MissingUnit { input: String },
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("duration {input:?} is out of range")]
    OutOfRange { input: String },
}

/// An error from [`encode`]: the value is too large for [`parse`] to read
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("duration {0} is outside the encodable range of ±2^63ns")]
pub struct EncodeError(pub FormattedDuration);

/// Displays a [`TimeDelta`] in the duration text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattedDuration(pub TimeDelta);

impl Display for FormattedDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let nanos = total_nanos(self.0);

        if nanos == 0 {
            return f.write_str("0s");
        }

        if nanos < 0 {
            f.write_str("-")?;
        }

        let nanos = nanos.unsigned_abs();

        if nanos < NANOS_PER_SEC {
            let (unit, scale) = if nanos < NANOS_PER_MICRO {
                ("ns", 1)
            } else if nanos < NANOS_PER_MILLI {
                ("µs", NANOS_PER_MICRO)
            } else {
                ("ms", NANOS_PER_MILLI)
            };

            write_decimal(f, nanos, scale)?;
            return f.write_str(unit);
        }

        let hours = nanos / NANOS_PER_HOUR;
        let minutes = nanos / NANOS_PER_MINUTE % 60;

        if hours > 0 {
            write!(f, "{hours}h")?;
        }

        if hours > 0 || minutes > 0 {
            write!(f, "{minutes}m")?;
        }

        write_decimal(f, nanos % NANOS_PER_MINUTE, NANOS_PER_SEC)?;
        f.write_str("s")
    }
}

/// Formats `duration` in the duration text format.
pub fn format(duration: TimeDelta) -> String {
    FormattedDuration(duration).to_string()
}

/// Formats `duration` only if [`parse`] accepts the result, i.e. its
/// magnitude fits in a signed 64-bit count of nanoseconds (about 292 years).
pub fn encode(duration: TimeDelta) -> Result<String, EncodeError> {
    match duration.num_nanoseconds() {
        Some(_) => Ok(format(duration)),
        None => Err(EncodeError(FormattedDuration(duration))),
    }
}

/// Parses a duration such as `"1h15m"`, `"-1.5s"` or `"300ms"`.
///
/// A leading sign applies to the whole value and terms are summed. The bare
/// token `"0"` needs no unit.
pub fn parse(input: &str) -> Result<TimeDelta, ParseError> {
    let invalid = || ParseError::Invalid {
        input: input.to_string(),
    };
    let out_of_range = || ParseError::OutOfRange {
        input: input.to_string(),
    };

    let (negative, mut rest) = match input.as_bytes().first() {
        None => return Err(ParseError::Empty),
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        Some(_) => (false, input),
    };

    if rest == "0" {
        return Ok(TimeDelta::zero());
    }

    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;

    while !rest.is_empty() {
        let (whole, after) = split_digits(rest);
        let (fraction, after) = match after.strip_prefix('.') {
            Some(after) => split_digits(after),
            None => ("", after),
        };

        // A lone "." carries no digits at all.
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }

        let unit_end = after
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_end);

        if unit.is_empty() {
            return Err(ParseError::MissingUnit {
                input: input.to_string(),
            });
        }

        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| ParseError::UnknownUnit {
                unit: unit.to_string(),
                input: input.to_string(),
            })?;

        total = term_nanos(whole, fraction, scale)
            .and_then(|term| total.checked_add(term))
            .filter(|total| *total <= LIMIT)
            .ok_or_else(out_of_range)?;
        rest = after;
    }

    let signed = if negative {
        -(total as i128)
    } else {
        total as i128
    };
    let nanos = i64::try_from(signed).map_err(|_| out_of_range())?;

    Ok(TimeDelta::nanoseconds(nanos))
}

fn total_nanos(duration: TimeDelta) -> i128 {
    i128::from(duration.num_seconds()) * NANOS_PER_SEC as i128
        + i128::from(duration.subsec_nanos())
}

fn write_decimal(f: &mut Formatter<'_>, value: u128, scale: u128) -> std::fmt::Result {
    write!(f, "{}", value / scale)?;

    let fraction = value % scale;
    if fraction > 0 {
        let width = scale.ilog10() as usize;
        let digits = format!("{fraction:0width$}");
        write!(f, ".{}", digits.trim_end_matches('0'))?;
    }

    Ok(())
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn term_nanos(whole: &str, fraction: &str, scale: u128) -> Option<u128> {
    let mut nanos = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().ok()?.checked_mul(scale)?
    };

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let value = fraction.parse::<u128>().ok()?;
        let divisor = 10u128.pow(fraction.len() as u32);
        nanos = nanos.checked_add(value * scale / divisor)?;
    }

    Some(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ms(millis: i64) -> TimeDelta {
        TimeDelta::milliseconds(millis)
    }

    #[test_case(TimeDelta::zero(), "0s" ; "zero")]
    #[test_case(TimeDelta::nanoseconds(1), "1ns" ; "one nanosecond")]
    #[test_case(TimeDelta::nanoseconds(1_500), "1.5µs" ; "micros with fraction")]
    #[test_case(TimeDelta::microseconds(1_500), "1.5ms" ; "millis with fraction")]
    #[test_case(ms(100), "100ms" ; "whole millis")]
    #[test_case(ms(2_250), "2.25s" ; "seconds with fraction")]
    #[test_case(TimeDelta::seconds(60), "1m0s" ; "one minute")]
    #[test_case(TimeDelta::seconds(90), "1m30s" ; "minute and a half")]
    #[test_case(TimeDelta::hours(1), "1h0m0s" ; "one hour")]
    #[test_case(TimeDelta::hours(72) + TimeDelta::minutes(3) + ms(500), "72h3m0.5s" ; "mixed units")]
    #[test_case(ms(-1_500), "-1.5s" ; "negative")]
    #[test_case(TimeDelta::nanoseconds(-20), "-20ns" ; "negative nanos")]
    fn formats(duration: TimeDelta, expected: &str) {
        assert_eq!(format(duration), expected);
    }

    #[test_case("0", TimeDelta::zero() ; "bare zero")]
    #[test_case("-0", TimeDelta::zero() ; "negative bare zero")]
    #[test_case("0s", TimeDelta::zero() ; "zero seconds")]
    #[test_case("300ms", ms(300) ; "millis")]
    #[test_case("1.5h", TimeDelta::minutes(90) ; "fractional hours")]
    #[test_case(".5s", ms(500) ; "leading dot")]
    #[test_case("5.s", TimeDelta::seconds(5) ; "trailing dot")]
    #[test_case("+2s", TimeDelta::seconds(2) ; "explicit plus")]
    #[test_case("-1m30s", TimeDelta::seconds(-90) ; "negative mixed")]
    #[test_case("1h15m30.918273645s", TimeDelta::seconds(4530) + TimeDelta::nanoseconds(918_273_645) ; "nanosecond precision")]
    #[test_case("1us", TimeDelta::microseconds(1) ; "ascii micros")]
    #[test_case("1µs", TimeDelta::microseconds(1) ; "micro sign")]
    #[test_case("1μs", TimeDelta::microseconds(1) ; "greek mu")]
    #[test_case("1s1s", TimeDelta::seconds(2) ; "repeated unit")]
    #[test_case("0.0000000000000000001s", TimeDelta::zero() ; "excess fraction digits")]
    fn parses(input: &str, expected: TimeDelta) {
        assert_eq!(parse(input), Ok(expected));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert!(matches!(parse("not-a-duration"), Err(ParseError::Invalid { .. })));
        assert!(matches!(parse("-"), Err(ParseError::Invalid { .. })));
        assert!(matches!(parse(".s"), Err(ParseError::Invalid { .. })));
        assert!(matches!(parse("10"), Err(ParseError::MissingUnit { .. })));
        assert!(matches!(parse("1.5"), Err(ParseError::MissingUnit { .. })));
        assert!(matches!(parse("3000000h"), Err(ParseError::OutOfRange { .. })));
    }

    #[test]
    fn reports_unknown_unit() {
        let err = parse("10x").unwrap_err();

        assert_eq!(
            err,
            ParseError::UnknownUnit {
                unit: "x".to_string(),
                input: "10x".to_string(),
            }
        );
        assert_eq!(err.to_string(), r#"unknown unit "x" in duration "10x""#);
    }

    #[test]
    fn accepts_limits_of_range() {
        assert_eq!(
            parse("-9223372036854775808ns"),
            Ok(TimeDelta::nanoseconds(i64::MIN))
        );
        assert!(matches!(
            parse("9223372036854775808ns"),
            Err(ParseError::OutOfRange { .. })
        ));
    }

    #[test]
    fn encode_refuses_unreadable_values() {
        let limit = TimeDelta::nanoseconds(i64::MAX);

        assert_eq!(encode(ms(1_500)), Ok("1.5s".to_string()));
        assert_eq!(parse(&encode(limit).unwrap()), Ok(limit));
        assert_eq!(
            parse(&encode(TimeDelta::nanoseconds(i64::MIN)).unwrap()),
            Ok(TimeDelta::nanoseconds(i64::MIN))
        );

        let too_far = TimeDelta::days(365 * 300);
        assert_eq!(encode(too_far), Err(EncodeError(FormattedDuration(too_far))));
        assert!(encode(-too_far).is_err());
        assert!(parse(&format(too_far)).is_err());
    }

    #[test]
    fn formatted_values_parse_back() {
        for duration in [
            TimeDelta::nanoseconds(7),
            TimeDelta::nanoseconds(-123_456),
            ms(42),
            TimeDelta::seconds(3_725) + TimeDelta::nanoseconds(1),
            TimeDelta::hours(-200),
        ] {
            assert_eq!(parse(&format(duration)), Ok(duration));
        }
    }
}
