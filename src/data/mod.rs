//! Content data models
//!
//! The cache and the client move raw JSON around so that fields this crate
//! does not know about survive a round trip. The types here are lenient,
//! read-only views over that JSON: every field is optional or defaulted, and
//! a missing field never makes a whole record unreadable.

pub mod client;

pub use client::{AttemptError, ClientError, ContentClient, RetryPolicy};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Day summary shown on the home page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomeInfo {
    /// Saints of the day
    #[serde(default)]
    pub saints: Option<String>,
    /// Older payloads use the singular form
    #[serde(default)]
    pub saint: Option<String>,
    /// Liturgical season
    #[serde(default)]
    pub season: Option<String>,
    /// Note about the printed booklet
    #[serde(default, rename = "bookletNote")]
    pub booklet_note: Option<String>,
}

impl HomeInfo {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Saints of the day, whichever field the payload used
    pub fn saints(&self) -> Option<&str> {
        self.saints
            .as_deref()
            .or(self.saint.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// The Gospel passage of the day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gospel {
    #[serde(default)]
    pub evangelist: Option<String>,
    /// Chapter and verse reference, e.g. "Lc 12,13-21"
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Community commentary on the passage (HTML)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comments {
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub reflection: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub videos: Vec<Video>,
}

/// A commentary from an earlier year on the same passage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedItem {
    /// ISO date of the related commentary
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub saints: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// Full daily reading record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GospelDay {
    #[serde(default)]
    pub saints: Option<String>,
    #[serde(default)]
    pub liturgical_season: Option<String>,
    /// References to the other readings of the day
    #[serde(default)]
    pub sacred_texts: Option<String>,
    #[serde(default)]
    pub gospel: Gospel,
    #[serde(default)]
    pub comments: Comments,
    #[serde(default)]
    pub media: Media,
    #[serde(default)]
    pub related: Vec<RelatedItem>,
}

impl GospelDay {
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// Either shape the dates endpoint answers with
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DatesPayload {
    List(Vec<String>),
    Wrapped {
        #[serde(default)]
        dates: Vec<String>,
    },
}

/// Dates for which a daily record is published, in payload order
///
/// Accepts a bare array of ISO dates or an object with a `dates` array.
/// Entries that are not `YYYY-MM-DD` dates are skipped; any other shape
/// yields an empty list.
pub fn parse_allowed_dates(value: &Value) -> Vec<NaiveDate> {
    let raw = match DatesPayload::deserialize(value) {
        Ok(DatesPayload::List(dates)) | Ok(DatesPayload::Wrapped { dates }) => dates,
        Err(_) => return Vec::new(),
    };

    raw.iter()
        .filter_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .collect()
}
