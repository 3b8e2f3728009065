//! Tutor availability -- the free time left once blackouts and bookings are
//! taken out of a tutor's declared availability.
//!
//! Pipeline for one query window:
//!
//! 1. expand every availability record into occurrences, clip them to the
//!    window and merge overlaps between records;
//! 2. subtract unavailability blocks, then confirmed bookings;
//! 3. merge again, drop blocks shorter than the configured minimum, drop
//!    duplicate slots and sort by start.
//!
//! [`compute_available_blocks`] is the pure core. [`AvailabilityEngine`] wraps
//! it with the record fetches and the degrade-to-empty error policy.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::AvailabilityConfig;
use crate::error::{AvailabilityError, Result};
use crate::expander::expand;
use crate::interval::{clip_to_window, merge_blocks, subtract_blocks, TimeBlock};
use crate::rule::{parse_rule, RecurrenceRule};
use crate::store::{AvailabilityRecord, BookingRecord, RecordStore, UnavailabilityRecord};
use crate::time::end_of_month;

/// Which tutor, and over which window. Missing bounds take defaults at resolve time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub tutor_id: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl AvailabilityQuery {
    pub fn new(tutor_id: impl Into<String>) -> Self {
        Self {
            tutor_id: tutor_id.into(),
            start: None,
            end: None,
        }
    }

    pub fn starting(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn ending(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Resolve the window. Start defaults to `now`, end to the last second of
    /// the start's month.
    ///
    /// # Errors
    /// Returns `AvailabilityError::InvalidRange` if the start is after the end.
    pub fn window(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.start.unwrap_or(now);
        let end = self.end.unwrap_or_else(|| end_of_month(start));
        validate_window(start, end)?;
        Ok((start, end))
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start > end {
        return Err(AvailabilityError::InvalidRange { start, end });
    }
    Ok(())
}

/// One free block in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableBlock {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<TimeBlock> for AvailableBlock {
    fn from(block: TimeBlock) -> Self {
        Self {
            start_date: block.start,
            end_date: block.end,
        }
    }
}

/// What callers receive: free blocks in ascending order, or no blocks and a
/// message explaining why.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub available_blocks: Vec<AvailableBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AvailabilityResponse {
    pub fn from_blocks(blocks: Vec<TimeBlock>) -> Self {
        Self {
            available_blocks: blocks.into_iter().map(AvailableBlock::from).collect(),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            available_blocks: Vec::new(),
            message: Some(message.into()),
        }
    }
}

/// Fetches a tutor's records and turns them into free time.
#[derive(Debug, Clone)]
pub struct AvailabilityEngine<S> {
    store: S,
    config: AvailabilityConfig,
}

impl<S: RecordStore> AvailabilityEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, AvailabilityConfig::default())
    }

    pub fn with_config(store: S, config: AvailabilityConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AvailabilityConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Answer a query, defaulting the window relative to the current time.
    ///
    /// Never fails: an invalid window comes back as an empty response with a
    /// message.
    pub async fn available_hours(&self, query: &AvailabilityQuery) -> AvailabilityResponse {
        self.available_hours_at(query, Utc::now()).await
    }

    /// [`AvailabilityEngine::available_hours`] with an explicit "now".
    #[instrument(skip(self, query), fields(tutor_id = %query.tutor_id))]
    pub async fn available_hours_at(
        &self,
        query: &AvailabilityQuery,
        now: DateTime<Utc>,
    ) -> AvailabilityResponse {
        let result = match query.window(now) {
            Ok((start, end)) => self.compute(&query.tutor_id, start, end).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(blocks) => AvailabilityResponse::from_blocks(blocks),
            Err(e) => {
                warn!(error = %e, "availability query rejected");
                AvailabilityResponse::rejected(e.to_string())
            }
        }
    }

    /// Free blocks for `tutor_id` within `[window_start, window_end]`.
    ///
    /// The three record reads run concurrently. A failed availability read
    /// yields no free time; failed blackout or booking reads are treated as
    /// "none".
    ///
    /// # Errors
    /// Returns `AvailabilityError::InvalidRange` if `window_start > window_end`.
    pub async fn compute(
        &self,
        tutor_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>> {
        validate_window(window_start, window_end)?;

        let (availabilities, unavailabilities, bookings) = tokio::join!(
            self.store.availabilities(tutor_id),
            self.store
                .unavailabilities(tutor_id, window_start, window_end),
            self.store
                .confirmed_bookings(tutor_id, window_start, window_end),
        );

        let availabilities = match availabilities {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "could not load availabilities, no free time");
                return Ok(Vec::new());
            }
        };
        let unavailabilities = unavailabilities.unwrap_or_else(|e| {
            warn!(error = %e, "could not load unavailabilities, assuming none");
            Vec::new()
        });
        let bookings = bookings.unwrap_or_else(|e| {
            warn!(error = %e, "could not load bookings, assuming none");
            Vec::new()
        });

        Ok(compute_available_blocks(
            &availabilities,
            &unavailabilities,
            &bookings,
            window_start,
            window_end,
            &self.config,
        ))
    }
}

/// The full pipeline over already fetched records.
///
/// Records whose timestamps do not parse, or whose end is not after their
/// start, are logged and skipped. Bookings not in a busy status are ignored
/// even if the store returned them.
pub fn compute_available_blocks(
    availabilities: &[AvailabilityRecord],
    unavailabilities: &[UnavailabilityRecord],
    bookings: &[BookingRecord],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    config: &AvailabilityConfig,
) -> Vec<TimeBlock> {
    let mut rules = RuleCache::default();
    let mut occurrences = Vec::new();
    for record in availabilities {
        let base = match record.block() {
            Ok(base) => base,
            Err(e) => {
                warn!(error = %e, tutor_id = %record.tutor_id, "skipping availability record");
                continue;
            }
        };
        let rule = rules.get(record.rule());
        let expanded = expand(&base, rule, window_start, window_end);
        occurrences.extend(clip_to_window(&expanded, window_start, window_end));
    }
    let available = merge_blocks(&occurrences);

    let blackouts = window_blocks(
        unavailabilities.iter().map(UnavailabilityRecord::block),
        window_start,
        window_end,
        "unavailability",
    );
    let booked = window_blocks(
        bookings
            .iter()
            .filter(|b| b.status.is_busy())
            .map(BookingRecord::block),
        window_start,
        window_end,
        "booking",
    );
    debug!(
        available = available.len(),
        blackouts = blackouts.len(),
        booked = booked.len(),
        "subtracting busy time"
    );

    let free = subtract_blocks(&available, &blackouts);
    let free = subtract_blocks(&free, &booked);
    let free = merge_blocks(&free);

    let min_block = config.min_block();
    let mut seen: HashSet<(NaiveDate, NaiveTime, NaiveTime)> = HashSet::new();
    let mut result: Vec<TimeBlock> = free
        .into_iter()
        .filter(|b| b.duration() >= min_block)
        .filter(|b| seen.insert(slot_key(b)))
        .collect();
    result.sort();

    debug!(blocks = result.len(), "availability computed");
    result
}

/// Parse results for the rule strings seen during one computation.
#[derive(Default)]
struct RuleCache {
    parsed: HashMap<String, RecurrenceRule>,
    single: RecurrenceRule,
}

impl RuleCache {
    fn get(&mut self, rule: Option<&str>) -> &RecurrenceRule {
        match rule {
            None => &self.single,
            Some(rule) => self
                .parsed
                .entry(rule.to_string())
                .or_insert_with(|| parse_rule(rule)),
        }
    }
}

/// Parse busy records, skip bad ones, and clip the rest to the window.
fn window_blocks(
    blocks: impl Iterator<Item = Result<TimeBlock>>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    kind: &str,
) -> Vec<TimeBlock> {
    blocks
        .filter_map(|block| match block {
            Ok(block) => block.clip(window_start, window_end),
            Err(e) => {
                warn!(error = %e, kind, "skipping busy record");
                None
            }
        })
        .collect()
}

/// Slot identity used for de-duplication: calendar date plus start and end time of day.
fn slot_key(block: &TimeBlock) -> (NaiveDate, NaiveTime, NaiveTime) {
    (block.start.date_naive(), block.start.time(), block.end.time())
}
