//! Tests for recurrence rule parsing.

use chrono::{NaiveDate, Weekday};
use tutor_availability::rule::{parse_rule, weekday_from_code, Frequency, RecurrenceRule};

#[test]
fn full_weekly_rule() {
    let rule = parse_rule("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE,FR;UNTIL=20250630");

    assert_eq!(
        rule.frequency,
        Frequency::Weekly {
            by_day: Some(vec![Weekday::Mon, Weekday::Wed, Weekday::Fri])
        }
    );
    assert_eq!(rule.interval, 2);
    assert_eq!(rule.until, NaiveDate::from_ymd_opt(2025, 6, 30));
    assert_eq!(rule.count, None);
}

#[test]
fn empty_string_is_single_occurrence() {
    let rule = parse_rule("");
    assert_eq!(rule, RecurrenceRule::default());
    assert!(rule.is_single());
    assert_eq!(rule.interval, 1);
}

#[test]
fn missing_freq_is_single_occurrence() {
    let rule = parse_rule("INTERVAL=2;UNTIL=20250101");
    assert_eq!(rule.frequency, Frequency::Once);
    assert_eq!(rule.interval, 2);
}

#[test]
fn unknown_keys_and_bare_parts_are_ignored() {
    let rule = parse_rule("FREQ=DAILY;X-COLOR=blue;garbage;WKST=MO;INTERVAL=3");
    assert_eq!(rule.frequency, Frequency::Daily);
    assert_eq!(rule.interval, 3);
}

#[test]
fn bad_interval_falls_back_to_one() {
    assert_eq!(parse_rule("FREQ=DAILY;INTERVAL=abc").interval, 1);
    assert_eq!(parse_rule("FREQ=DAILY;INTERVAL=0").interval, 1);
    assert_eq!(parse_rule("FREQ=DAILY;INTERVAL=-2").interval, 1);
}

#[test]
fn keys_and_codes_are_case_insensitive() {
    let rule = parse_rule("freq=weekly;byday=tu,th");
    assert_eq!(
        rule.frequency,
        Frequency::Weekly {
            by_day: Some(vec![Weekday::Tue, Weekday::Thu])
        }
    );
}

#[test]
fn unrecognized_weekday_codes_are_dropped_not_mapped_to_monday() {
    let rule = parse_rule("FREQ=WEEKLY;BYDAY=XX,FR");
    assert_eq!(
        rule.frequency,
        Frequency::Weekly {
            by_day: Some(vec![Weekday::Fri])
        }
    );

    let rule = parse_rule("FREQ=WEEKLY;BYDAY=XX");
    assert_eq!(rule.frequency, Frequency::Weekly { by_day: Some(vec![]) });
}

#[test]
fn weekly_without_byday_uses_base_weekday() {
    assert_eq!(
        parse_rule("FREQ=WEEKLY").frequency,
        Frequency::Weekly { by_day: None }
    );
}

#[test]
fn blank_byday_counts_as_absent() {
    assert_eq!(
        parse_rule("FREQ=WEEKLY;BYDAY=").frequency,
        Frequency::Weekly { by_day: None }
    );
    assert_eq!(
        parse_rule("FREQ=WEEKLY;BYDAY=  ").frequency,
        Frequency::Weekly { by_day: None }
    );
}

#[test]
fn until_uses_first_eight_characters() {
    let rule = parse_rule("FREQ=DAILY;UNTIL=20250315T120000Z");
    assert_eq!(rule.until, NaiveDate::from_ymd_opt(2025, 3, 15));
}

#[test]
fn malformed_until_is_ignored() {
    assert_eq!(parse_rule("FREQ=DAILY;UNTIL=2025").until, None);
    assert_eq!(parse_rule("FREQ=DAILY;UNTIL=20251340").until, None);
}

#[test]
fn count_is_parsed() {
    assert_eq!(parse_rule("FREQ=DAILY;COUNT=10").count, Some(10));
    assert_eq!(parse_rule("FREQ=DAILY;COUNT=many").count, None);
}

#[test]
fn monthly_selectors_are_sorted_deduplicated_and_range_checked() {
    let rule = parse_rule("FREQ=MONTHLY;BYMONTHDAY=31,15,15,40,0;BYMONTH=13,2,7");
    assert_eq!(
        rule.frequency,
        Frequency::Monthly {
            by_month_day: Some(vec![15, 31]),
            by_month: Some(vec![2, 7]),
        }
    );
}

#[test]
fn monthly_selectors_only_attach_to_monthly() {
    let rule = parse_rule("FREQ=DAILY;BYMONTHDAY=1;BYDAY=MO");
    assert_eq!(rule.frequency, Frequency::Daily);
}

#[test]
fn other_frequencies_are_unsupported() {
    assert_eq!(
        parse_rule("FREQ=YEARLY").frequency,
        Frequency::Unsupported("YEARLY".to_string())
    );
}

#[test]
fn weekday_codes() {
    assert_eq!(weekday_from_code("MO"), Some(Weekday::Mon));
    assert_eq!(weekday_from_code("su"), Some(Weekday::Sun));
    assert_eq!(weekday_from_code(" we "), Some(Weekday::Wed));
    assert_eq!(weekday_from_code("MON"), None);
    assert_eq!(weekday_from_code(""), None);
}
