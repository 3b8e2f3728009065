//! `tutor-availability` CLI -- compute a tutor's free time blocks from a JSON
//! record dataset.
//!
//! ## Usage
//!
//! ```sh
//! # Free time for the rest of the current month
//! tutor-availability --tutor 7f3c... --data records.json
//!
//! # Explicit window, dataset on stdin, pretty output
//! cat records.json | tutor-availability -t 7f3c... \
//!     --start 2025-05-01T00:00:00Z --end 2025-05-07T23:59:59Z --pretty
//!
//! # Only offer blocks of at least 90 minutes
//! TUTOR_AVAILABILITY_MIN_BLOCK_MINUTES=90 tutor-availability -t 7f3c... -d records.json
//! ```
//!
//! The dataset is a JSON object with `availabilities`, `unavailabilities`,
//! `bookings` and `offers` arrays. Output is the availability response as
//! JSON on stdout; logs go to stderr (`RUST_LOG`, default `warn`).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;
use tutor_availability::config::DEFAULT_MIN_BLOCK_MINUTES;
use tutor_availability::time::parse_timestamp;
use tutor_availability::{AvailabilityConfig, AvailabilityEngine, AvailabilityQuery, MemoryStore};

#[derive(Parser)]
#[command(
    name = "tutor-availability",
    version,
    about = "Compute a tutor's free time blocks"
)]
struct Cli {
    /// Tutor whose availability to compute
    #[arg(short, long)]
    tutor: String,

    /// JSON dataset file (reads from stdin if omitted)
    #[arg(short, long)]
    data: Option<String>,

    /// Window start; defaults to now (UTC). Timestamps without an offset are UTC.
    #[arg(long, value_parser = parse_datetime)]
    start: Option<DateTime<Utc>>,

    /// Window end; defaults to the last second of the start's month
    #[arg(long, value_parser = parse_datetime)]
    end: Option<DateTime<Utc>>,

    /// Drop free blocks shorter than this many minutes
    #[arg(
        long,
        env = "TUTOR_AVAILABILITY_MIN_BLOCK_MINUTES",
        default_value_t = DEFAULT_MIN_BLOCK_MINUTES
    )]
    min_block_minutes: i64,

    /// Pretty-print the JSON response
    #[arg(long)]
    pretty: bool,
}

fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_timestamp(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let json = read_input(cli.data.as_deref())?;
    let store = MemoryStore::from_json(&json).context("Failed to load record dataset")?;
    let config = AvailabilityConfig {
        min_block_minutes: cli.min_block_minutes,
    };
    let engine = AvailabilityEngine::with_config(store, config);

    let query = AvailabilityQuery {
        tutor_id: cli.tutor,
        start: cli.start,
        end: cli.end,
    };
    let response = engine.available_hours(&query).await;

    let out = if cli.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", out);

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
