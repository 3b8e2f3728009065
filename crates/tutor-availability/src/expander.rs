//! Occurrence expansion -- turns one base time range plus a recurrence rule into
//! the concrete occurrences that touch a query window.
//!
//! Every occurrence keeps the base range's duration and time of day (in UTC).
//! Occurrences are returned whole: one may start before the window or end after
//! it, and callers clip before treating the result as free time.
//!
//! Generation jumps straight to the period containing the window start rather
//! than walking forward from the base date, so a rule created years ago costs
//! the same as one created yesterday.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use tracing::debug;

use crate::interval::TimeBlock;
use crate::rule::{parse_rule, Frequency, RecurrenceRule};
use crate::time::{days_in_month, end_of_day, normalize_naive, until_instant};

/// Expand a base occurrence using an already parsed rule.
///
/// An occurrence is returned when it starts no later than the generation bound
/// (the end of `query_end`'s day, tightened by the rule's `UNTIL`) and ends no
/// earlier than `query_start`. No occurrence starts before `base.start`.
pub fn expand(
    base: &TimeBlock,
    rule: &RecurrenceRule,
    query_start: DateTime<Utc>,
    query_end: DateTime<Utc>,
) -> Vec<TimeBlock> {
    let mut bound = end_of_day(query_end);
    if let Some(until) = rule.until {
        bound = bound.min(until_instant(until));
    }
    let window = Window {
        start: query_start,
        bound,
    };

    match &rule.frequency {
        Frequency::Once => expand_once(base, query_start, query_end),
        Frequency::Daily => expand_daily(base, rule.interval, &window),
        Frequency::Weekly { by_day } => {
            let days = match by_day {
                Some(days) => days.clone(),
                None => vec![base.start.weekday()],
            };
            expand_weekly(base, rule.interval, &days, &window)
        }
        Frequency::Monthly {
            by_month_day,
            by_month,
        } => {
            let days = match by_month_day {
                Some(days) => days.clone(),
                None => vec![base.start.day()],
            };
            expand_monthly(base, rule.interval, &days, by_month.as_deref(), &window)
        }
        Frequency::Unsupported(freq) => {
            debug!(freq = %freq, "frequency not supported, no occurrences generated");
            Vec::new()
        }
    }
}

/// Parse `rule` and expand. `None` or an empty string is a single occurrence.
pub fn expand_rule_str(
    base: &TimeBlock,
    rule: Option<&str>,
    query_start: DateTime<Utc>,
    query_end: DateTime<Utc>,
) -> Vec<TimeBlock> {
    let rule = rule.map(parse_rule).unwrap_or_default();
    expand(base, &rule, query_start, query_end)
}

/// Bounds shared by the repeating expansions.
struct Window {
    /// Occurrences ending before this are dropped.
    start: DateTime<Utc>,
    /// Occurrences starting after this are dropped; generation stops here.
    bound: DateTime<Utc>,
}

impl Window {
    /// Earliest start whose occurrence could still end inside the window.
    fn earliest_start(&self, duration: Duration) -> DateTime<Utc> {
        self.start
            .checked_sub_signed(duration)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn admits(&self, occurrence: &TimeBlock) -> bool {
        occurrence.start <= self.bound && occurrence.end >= self.start
    }
}

fn expand_once(
    base: &TimeBlock,
    query_start: DateTime<Utc>,
    query_end: DateTime<Utc>,
) -> Vec<TimeBlock> {
    if base.start <= query_end && base.end >= query_start {
        vec![*base]
    } else {
        Vec::new()
    }
}

/// Round `elapsed_periods` down to a multiple of `interval`, never below zero.
fn skip_periods(elapsed_periods: i64, interval: u32) -> i64 {
    let interval = i64::from(interval);
    (elapsed_periods.max(0) / interval) * interval
}

fn expand_daily(base: &TimeBlock, interval: u32, window: &Window) -> Vec<TimeBlock> {
    let duration = base.duration();
    let step = Duration::days(i64::from(interval));

    let earliest = window.earliest_start(duration);
    let skipped = skip_periods((earliest - base.start).num_days(), interval);
    let Some(mut current) =
        Duration::try_days(skipped).and_then(|d| base.start.checked_add_signed(d))
    else {
        return Vec::new();
    };

    let mut out = Vec::new();
    while current <= window.bound {
        let Some(occurrence) = occurrence_at(current, duration) else {
            break;
        };
        if window.admits(&occurrence) {
            out.push(occurrence);
        }
        match current.checked_add_signed(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    out
}

fn expand_weekly(
    base: &TimeBlock,
    interval: u32,
    days: &[Weekday],
    window: &Window,
) -> Vec<TimeBlock> {
    let mut offsets: Vec<u32> = days.iter().map(|d| d.num_days_from_monday()).collect();
    offsets.sort_unstable();
    offsets.dedup();
    if offsets.is_empty() {
        return Vec::new();
    }

    let duration = base.duration();
    let time_of_day = base.start.time();
    let base_date = base.start.date_naive();
    let back = u64::from(base_date.weekday().num_days_from_monday());
    let Some(first_monday) = base_date.checked_sub_days(Days::new(back)) else {
        return Vec::new();
    };

    let earliest = window.earliest_start(duration);
    let reach = earliest - at(first_monday, NaiveTime::default());
    let mut week = skip_periods(reach.num_days().div_euclid(7), interval);

    let mut out = Vec::new();
    'weeks: loop {
        let Some(monday) =
            Duration::try_weeks(week).and_then(|d| first_monday.checked_add_signed(d))
        else {
            break;
        };
        if at(monday, NaiveTime::default()) > window.bound {
            break;
        }
        for &offset in &offsets {
            let Some(date) = monday.checked_add_days(Days::new(u64::from(offset))) else {
                break 'weeks;
            };
            let start = at(date, time_of_day);
            if start < base.start {
                continue;
            }
            let Some(occurrence) = occurrence_at(start, duration) else {
                break 'weeks;
            };
            if window.admits(&occurrence) {
                out.push(occurrence);
            }
        }
        week += i64::from(interval);
    }
    out
}

fn expand_monthly(
    base: &TimeBlock,
    interval: u32,
    days: &[u32],
    months: Option<&[u32]>,
    window: &Window,
) -> Vec<TimeBlock> {
    let duration = base.duration();
    let time_of_day = base.start.time();
    let base_month = month_index(base.start.date_naive());

    let earliest = window.earliest_start(duration);
    let mut offset = skip_periods(month_index(earliest.date_naive()) - base_month, interval);

    let mut out = Vec::new();
    loop {
        let index = base_month + offset;
        let year = index.div_euclid(12) as i32;
        let month = index.rem_euclid(12) as u32 + 1;
        offset += i64::from(interval);

        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            break;
        };
        if at(first, NaiveTime::default()) > window.bound {
            break;
        }
        if months.is_some_and(|months| !months.contains(&month)) {
            continue;
        }

        // Short months pull late days back to their last day; clamping can
        // map several requested days onto the same date.
        let last_day = days_in_month(year, month);
        let mut clamped: Vec<u32> = days.iter().map(|&d| d.min(last_day)).collect();
        clamped.sort_unstable();
        clamped.dedup();

        for day in clamped {
            let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                continue;
            };
            let start = at(date, time_of_day);
            if start < base.start {
                continue;
            }
            let Some(occurrence) = occurrence_at(start, duration) else {
                break;
            };
            if window.admits(&occurrence) {
                out.push(occurrence);
            }
        }
    }
    out
}

/// `None` when the end falls past the last representable instant.
fn occurrence_at(start: DateTime<Utc>, duration: Duration) -> Option<TimeBlock> {
    let end = start.checked_add_signed(duration)?;
    Some(TimeBlock { start, end })
}

fn at(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    normalize_naive(date.and_time(time))
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}
