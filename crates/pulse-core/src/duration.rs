//! Human-readable durations.
//!
//! Formatting follows the canonical Go duration string (`150ms`, `1m30s`,
//! `1h0m0s`) so that JSON snapshots read the same as every other service in
//! the fleet. Parsing accepts the same grammar for config values.

use std::fmt::Write;
use std::time::Duration;

use serde::Serializer;

use crate::error::{PulseError, Result};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

/// Fraction digits beyond this scale cannot change a nanosecond result.
const MAX_FRACTION_SCALE: u128 = 100_000_000_000_000_000_000;

/// Render a duration, e.g. `0s`, `750ns`, `1.5µs`, `150ms`, `2.25s`, `1m30s`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return fractional(nanos, NANOS_PER_MICRO, 3, "µs");
    }
    if nanos < NANOS_PER_SEC {
        return fractional(nanos, NANOS_PER_MILLI, 6, "ms");
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
    let rest = nanos % NANOS_PER_MIN;

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    out.push_str(&fractional(rest, NANOS_PER_SEC, 9, "s"));
    out
}

fn fractional(value: u128, unit: u128, width: usize, suffix: &str) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return format!("{whole}{suffix}");
    }
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}{suffix}", digits.trim_end_matches('0'))
}

/// serde adapter: serialize a `Duration` as its human-readable string.
pub fn serialize_human<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format_duration(*d))
}

/// Parse a duration string such as `5s`, `250ms`, `1m30s`, or `1.5h`.
///
/// A bare `0` is accepted. Signs other than a leading `+` are rejected:
/// `Duration` has no negative values.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = || PulseError::InvalidDuration(input.to_string());

    let mut s = input.trim();
    if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !s.is_empty() {
        let (int_part, rest) = split_digits(s);
        let (frac_part, rest) = match rest.strip_prefix('.') {
            Some(after) => split_digits(after),
            None => ("", rest),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let (unit, rest) = rest.split_at(unit_end);
        let unit = unit_nanos(unit).ok_or_else(invalid)?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };

        let mut frac: u128 = 0;
        let mut scale: u128 = 1;
        for b in frac_part.bytes() {
            if scale >= MAX_FRACTION_SCALE {
                break;
            }
            frac = frac * 10 + u128::from(b - b'0');
            scale *= 10;
        }

        total = whole
            .checked_mul(unit)
            .and_then(|v| v.checked_add(frac * unit / scale))
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
        s = rest;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| invalid())
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        // U+00B5 micro sign and U+03BC greek mu
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(NANOS_PER_MIN),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}
