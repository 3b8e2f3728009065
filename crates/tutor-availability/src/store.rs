//! Read-only access to the raw calendar records the engine consumes.
//!
//! Records keep their timestamps as the strings the backing store returned.
//! Parsing happens in the engine so one malformed row can be skipped without
//! losing the rest of a tutor's calendar.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};
use crate::interval::TimeBlock;
use crate::time::parse_timestamp;

/// A declared availability: one canonical occurrence plus an optional rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub tutor_id: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
}

impl AvailabilityRecord {
    pub fn block(&self) -> Result<TimeBlock> {
        parse_block(&self.start_time, &self.end_time)
    }

    /// The rule string, or `None` when absent or blank.
    pub fn rule(&self) -> Option<&str> {
        self.recurrence_rule
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

/// A one-off blackout. Never recurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnavailabilityRecord {
    pub tutor_id: String,
    pub start_time: String,
    pub end_time: String,
}

impl UnavailabilityRecord {
    pub fn block(&self) -> Result<TimeBlock> {
        parse_block(&self.start_time, &self.end_time)
    }
}

/// Lifecycle state of a booking. Only [`BookingStatus::is_busy`] states block time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Accepted,
    Completed,
    Cancelled,
    Rejected,
    Other(String),
}

impl BookingStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Accepted)
    }

    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
            BookingStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for BookingStatus {
    fn from(s: String) -> Self {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "pending" => BookingStatus::Pending,
            "confirmed" => BookingStatus::Confirmed,
            "accepted" => BookingStatus::Accepted,
            "completed" => BookingStatus::Completed,
            "cancelled" | "canceled" => BookingStatus::Cancelled,
            "rejected" => BookingStatus::Rejected,
            _ => BookingStatus::Other(s),
        }
    }
}

impl From<BookingStatus> for String {
    fn from(status: BookingStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking against one of a tutor's offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: i64,
    pub offer_id: i64,
    #[serde(alias = "start_date")]
    pub start_time: String,
    #[serde(alias = "end_date")]
    pub end_time: String,
    pub status: BookingStatus,
}

impl BookingRecord {
    pub fn block(&self) -> Result<TimeBlock> {
        parse_block(&self.start_time, &self.end_time)
    }
}

/// The owning side of a booking: which tutor an offer belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferRecord {
    pub id: i64,
    pub tutor_id: String,
}

fn parse_block(start: &str, end: &str) -> Result<TimeBlock> {
    TimeBlock::try_new(parse_timestamp(start)?, parse_timestamp(end)?)
}

/// The three reads the availability engine needs.
///
/// Implementations may hit a database or remote API; the engine issues the
/// calls concurrently and tolerates failures of the last two.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every availability record the tutor has declared, regardless of date.
    async fn availabilities(&self, tutor_id: &str) -> Result<Vec<AvailabilityRecord>>;

    /// Blackouts overlapping `[window_start, window_end]`.
    async fn unavailabilities(
        &self,
        tutor_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<UnavailabilityRecord>>;

    /// Confirmed or accepted bookings on the tutor's offers overlapping the window.
    async fn confirmed_bookings(
        &self,
        tutor_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BookingRecord>>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn availabilities(&self, tutor_id: &str) -> Result<Vec<AvailabilityRecord>> {
        (**self).availabilities(tutor_id).await
    }

    async fn unavailabilities(
        &self,
        tutor_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<UnavailabilityRecord>> {
        (**self)
            .unavailabilities(tutor_id, window_start, window_end)
            .await
    }

    async fn confirmed_bookings(
        &self,
        tutor_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BookingRecord>> {
        (**self)
            .confirmed_bookings(tutor_id, window_start, window_end)
            .await
    }
}

/// A snapshot of all record tables, as loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub availabilities: Vec<AvailabilityRecord>,
    #[serde(default)]
    pub unavailabilities: Vec<UnavailabilityRecord>,
    #[serde(default)]
    pub bookings: Vec<BookingRecord>,
    #[serde(default)]
    pub offers: Vec<OfferRecord>,
}

/// In-memory [`RecordStore`] over a [`Dataset`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Dataset,
}

impl MemoryStore {
    pub fn new(data: Dataset) -> Self {
        Self { data }
    }

    /// # Errors
    /// Returns `AvailabilityError::Store` if `json` is not a valid dataset.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map(Self::new)
            .map_err(|e| AvailabilityError::Store(format!("invalid dataset: {}", e)))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }
}

/// Window filter used by the store. Rows whose timestamps do not parse are
/// passed through so the engine can report them.
fn in_window(
    start: &str,
    end: &str,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    match (parse_timestamp(start), parse_timestamp(end)) {
        (Ok(start), Ok(end)) => end > window_start && start < window_end,
        _ => true,
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn availabilities(&self, tutor_id: &str) -> Result<Vec<AvailabilityRecord>> {
        Ok(self
            .data
            .availabilities
            .iter()
            .filter(|a| a.tutor_id == tutor_id)
            .cloned()
            .collect())
    }

    async fn unavailabilities(
        &self,
        tutor_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<UnavailabilityRecord>> {
        Ok(self
            .data
            .unavailabilities
            .iter()
            .filter(|u| u.tutor_id == tutor_id)
            .filter(|u| in_window(&u.start_time, &u.end_time, window_start, window_end))
            .cloned()
            .collect())
    }

    async fn confirmed_bookings(
        &self,
        tutor_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<BookingRecord>> {
        let offers: HashSet<i64> = self
            .data
            .offers
            .iter()
            .filter(|o| o.tutor_id == tutor_id)
            .map(|o| o.id)
            .collect();

        Ok(self
            .data
            .bookings
            .iter()
            .filter(|b| b.status.is_busy() && offers.contains(&b.offer_id))
            .filter(|b| in_window(&b.start_time, &b.end_time, window_start, window_end))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(BookingStatus::from("CONFIRMED".to_string()), BookingStatus::Confirmed);
        assert_eq!(BookingStatus::from("canceled".to_string()), BookingStatus::Cancelled);
        assert!(BookingStatus::from("Accepted".to_string()).is_busy());
        assert!(!BookingStatus::from("pending".to_string()).is_busy());
        assert_eq!(
            BookingStatus::from("on_hold".to_string()),
            BookingStatus::Other("on_hold".to_string())
        );
    }

    #[test]
    fn blank_rule_is_none() {
        let record = AvailabilityRecord {
            tutor_id: "t".to_string(),
            start_time: "2025-03-01T10:00:00Z".to_string(),
            end_time: "2025-03-01T12:00:00Z".to_string(),
            recurrence_rule: Some("  ".to_string()),
        };
        assert_eq!(record.rule(), None);
        assert!(record.block().is_ok());
    }

    #[test]
    fn inverted_record_is_an_error() {
        let record = UnavailabilityRecord {
            tutor_id: "t".to_string(),
            start_time: "2025-03-01T12:00:00Z".to_string(),
            end_time: "2025-03-01T10:00:00Z".to_string(),
        };
        assert!(matches!(
            record.block(),
            Err(AvailabilityError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn booking_accepts_date_field_aliases() {
        let json = r#"{"id":1,"offer_id":2,"start_date":"2025-03-01T10:00:00Z","end_date":"2025-03-01T11:00:00Z","status":"confirmed"}"#;
        let booking: BookingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(booking.start_time, "2025-03-01T10:00:00Z");
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }
}
