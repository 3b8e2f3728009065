//! Recurrence rule parsing.
//!
//! Rules arrive as compact `KEY=VALUE;KEY=VALUE` strings, e.g.
//! `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR;UNTIL=20250630`. Parsing is
//! best-effort: unknown keys, parts without `=`, and values that do not make
//! sense are skipped (with a warning) rather than rejected, so a rule written
//! by a newer client still expands as far as this parser understands it.

use chrono::{NaiveDate, Weekday};
use tracing::warn;

/// How often a rule repeats, with the selectors that only apply to that frequency.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Frequency {
    /// No `FREQ` key: the base occurrence happens exactly once.
    #[default]
    Once,
    Daily,
    Weekly {
        /// `None` means "the base occurrence's weekday".
        by_day: Option<Vec<Weekday>>,
    },
    Monthly {
        /// `None` means "the base occurrence's day of month".
        by_month_day: Option<Vec<u32>>,
        /// `None` means every month.
        by_month: Option<Vec<u32>>,
    },
    /// A `FREQ` value this engine does not expand (e.g. `YEARLY`). Produces nothing.
    Unsupported(String),
}

/// Structured form of a recurrence rule string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Repeat every `interval` days/weeks/months. Always >= 1.
    pub interval: u32,
    /// Last date (inclusive) on which an occurrence may start.
    pub until: Option<NaiveDate>,
    /// Parsed for completeness; expansion does not enforce it.
    pub count: Option<u32>,
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        Self {
            frequency: Frequency::Once,
            interval: 1,
            until: None,
            count: None,
        }
    }
}

impl RecurrenceRule {
    /// True when the rule describes a single, non-repeating occurrence.
    pub fn is_single(&self) -> bool {
        self.frequency == Frequency::Once
    }
}

/// Map a two-letter weekday code (`MO` .. `SU`) to a `Weekday`.
///
/// Unlike a lookup with a default, unknown codes return `None` so the caller
/// can drop them instead of silently treating them as Monday.
pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code.trim().to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parse a rule string. Empty or whitespace-only input yields a single-occurrence rule.
pub fn parse_rule(rule: &str) -> RecurrenceRule {
    let mut freq: Option<String> = None;
    let mut interval = 1;
    let mut until = None;
    let mut count = None;
    let mut by_day: Option<Vec<Weekday>> = None;
    let mut by_month_day: Option<Vec<u32>> = None;
    let mut by_month: Option<Vec<u32>> = None;

    for part in rule.split(';') {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let value = value.trim();

        match key.trim().to_ascii_uppercase().as_str() {
            "FREQ" => freq = Some(value.to_ascii_uppercase()),
            "INTERVAL" => match value.parse::<u32>() {
                Ok(n) if n > 0 => interval = n,
                _ => warn!(value, "ignoring INTERVAL that is not a positive integer"),
            },
            "UNTIL" => {
                until = parse_until(value);
                if until.is_none() {
                    warn!(value, "ignoring UNTIL that is not a YYYYMMDD date");
                }
            }
            "COUNT" => count = value.parse().ok(),
            // A blank list means "not given": the base weekday applies.
            "BYDAY" if value.is_empty() => by_day = None,
            "BYDAY" => {
                by_day = Some(
                    split_list(value)
                        .filter_map(|code| {
                            let day = weekday_from_code(code);
                            if day.is_none() {
                                warn!(code, "dropping unrecognized BYDAY code");
                            }
                            day
                        })
                        .collect(),
                )
            }
            "BYMONTHDAY" => by_month_day = Some(parse_numbers(value, "BYMONTHDAY", 1..=31)),
            "BYMONTH" => by_month = Some(parse_numbers(value, "BYMONTH", 1..=12)),
            _ => {}
        }
    }

    let frequency = match freq.as_deref() {
        None | Some("") => Frequency::Once,
        Some("DAILY") => Frequency::Daily,
        Some("WEEKLY") => Frequency::Weekly { by_day },
        Some("MONTHLY") => Frequency::Monthly {
            by_month_day,
            by_month,
        },
        Some(other) => Frequency::Unsupported(other.to_string()),
    };

    RecurrenceRule {
        frequency,
        interval,
        until,
        count,
    }
}

/// Only the first eight characters (`YYYYMMDD`) are significant, so
/// `20250315T000000Z` is read as 2025-03-15.
fn parse_until(value: &str) -> Option<NaiveDate> {
    let digits = value.get(..8)?;
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_numbers(value: &str, key: &str, range: std::ops::RangeInclusive<u32>) -> Vec<u32> {
    let mut out: Vec<u32> = split_list(value)
        .filter_map(|item| match item.parse::<u32>() {
            Ok(n) if range.contains(&n) => Some(n),
            _ => {
                warn!(key, item, "dropping out-of-range value");
                None
            }
        })
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}
