//! Command-line interface parsing for gospelway
//!
//! This module handles parsing of CLI arguments using clap. Connection
//! settings can come from flags or from the environment (including a `.env`
//! file loaded before parsing).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;

use crate::highlights::HIGHLIGHTS_KEY;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The date argument is not an ISO calendar date
    #[error("Invalid date: '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The key does not name a cache entry
    #[error("'{0}' holds saved highlights, not cached content; use `highlights remove`")]
    NotACacheKey(String),
}

/// gospelway - the daily Gospel and its commentary, online or offline
#[derive(Parser, Debug)]
#[command(name = "gospelway")]
#[command(about = "Daily Gospel readings and commentary, cached for offline use")]
#[command(version)]
pub struct Cli {
    /// Base URL of the content project (e.g. https://xyz.supabase.co)
    #[arg(long, env = "GOSPELWAY_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// API key sent as `apikey` and bearer token
    #[arg(long, env = "GOSPELWAY_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory for cached content and highlights
    #[arg(long, env = "GOSPELWAY_CACHE_DIR", global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep everything in memory for this run only
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Print raw JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the day summary (saints, liturgical season)
    Info {
        /// Day to show (defaults to today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Ignore the cached copy and fetch again
        #[arg(long)]
        refresh: bool,
    },
    /// Show the Gospel of the day with its commentary
    Gospel {
        /// Day to show (defaults to today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Ignore the cached copy and fetch again
        #[arg(long)]
        refresh: bool,
    },
    /// Show the day summary and the Gospel together
    Today {
        /// Day to show (defaults to today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Ignore the cached copies and fetch again
        #[arg(long)]
        refresh: bool,
    },
    /// List the dates with a published reading
    Dates,
    /// Drop one cached entry (e.g. gospel_way_2026-10-19)
    Invalidate {
        key: String,
    },
    /// Manage saved highlights
    #[command(subcommand)]
    Highlights(HighlightsCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum HighlightsCommand {
    /// List saved highlights, newest first
    List {
        /// Only highlights from this day's reading
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
    /// Save a highlighted passage
    Add {
        /// Day of the reading (defaults to today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Section the passage comes from
        #[arg(long, default_value = "gospel")]
        section: String,
        /// The highlighted text
        text: String,
    },
    /// Delete a highlight by id
    Remove {
        id: String,
    },
    /// Print how many highlights are saved
    Count,
}

/// Checks that `key` may be dropped by `invalidate`
///
/// Highlights share the store with the cache but are user data.
pub fn check_invalidate_key(key: &str) -> Result<(), CliError> {
    if key == HIGHLIGHTS_KEY {
        return Err(CliError::NotACacheKey(key.to_string()));
    }
    Ok(())
}

/// Parses an ISO `YYYY-MM-DD` date argument.
///
/// # Arguments
/// * `s` - The date string from CLI
///
/// # Returns
/// * `Ok(NaiveDate)` if the string is a valid calendar date
/// * `Err(CliError::InvalidDate)` otherwise
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| CliError::InvalidDate(s.to_string()))
}
