//! # tutor-availability
//!
//! Computes when a tutor is actually free.
//!
//! A tutor declares availability as time ranges with optional recurrence rules
//! (`FREQ=WEEKLY;BYDAY=MO,WE`), blocks out one-off unavailability, and
//! accumulates confirmed bookings. This crate expands the rules over a query
//! window, subtracts the blackouts and bookings, and returns the remaining
//! free blocks, merged, sorted and no shorter than a configurable minimum.
//!
//! ## Modules
//!
//! - [`time`]: UTC normalization and timestamp parsing
//! - [`rule`]: recurrence rule string → [`RecurrenceRule`]
//! - [`expander`]: base range + rule → concrete occurrences in a window
//! - [`interval`]: [`TimeBlock`] subtraction, merging and clipping
//! - [`store`]: record types and the [`RecordStore`] read contract
//! - [`availability`]: the engine tying it together
//! - [`config`]: engine settings
//! - [`error`]: error types

pub mod availability;
pub mod config;
pub mod error;
pub mod expander;
pub mod interval;
pub mod rule;
pub mod store;
pub mod time;

pub use availability::{
    compute_available_blocks, AvailabilityEngine, AvailabilityQuery, AvailabilityResponse,
    AvailableBlock,
};
pub use config::AvailabilityConfig;
pub use error::AvailabilityError;
pub use expander::{expand, expand_rule_str};
pub use interval::{clip_to_window, merge_blocks, subtract_blocks, TimeBlock};
pub use rule::{parse_rule, Frequency, RecurrenceRule};
pub use store::{
    AvailabilityRecord, BookingRecord, BookingStatus, Dataset, MemoryStore, OfferRecord,
    RecordStore, UnavailabilityRecord,
};
