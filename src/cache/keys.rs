//! Cache keys and their freshness windows

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;

/// Freshness window for the day summary and the daily reading record
pub const TTL_DAILY: Duration = Duration::from_secs(24 * 60 * 60);

/// Freshness window for the set of dates with a published reading
pub const TTL_DATES: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A cacheable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Day summary (`home_info_<date>`)
    HomeInfo(NaiveDate),
    /// Full daily reading record (`gospel_way_<date>`)
    GospelWay(NaiveDate),
    /// Dates with a published reading (`allowed_dates`)
    AllowedDates,
}

impl CacheKey {
    /// How long an entry for this resource stays fresh
    pub fn ttl(&self) -> Duration {
        match self {
            CacheKey::HomeInfo(_) | CacheKey::GospelWay(_) => TTL_DAILY,
            CacheKey::AllowedDates => TTL_DATES,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::HomeInfo(date) => write!(f, "home_info_{}", date.format("%Y-%m-%d")),
            CacheKey::GospelWay(date) => write!(f, "gospel_way_{}", date.format("%Y-%m-%d")),
            CacheKey::AllowedDates => f.write_str("allowed_dates"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_key_strings() {
        assert_eq!(
            CacheKey::HomeInfo(date(2026, 3, 5)).to_string(),
            "home_info_2026-03-05"
        );
        assert_eq!(
            CacheKey::GospelWay(date(2026, 12, 25)).to_string(),
            "gospel_way_2026-12-25"
        );
        assert_eq!(CacheKey::AllowedDates.to_string(), "allowed_dates");
    }

    #[test]
    fn test_ttl_policy() {
        assert_eq!(CacheKey::HomeInfo(date(2026, 1, 1)).ttl(), Duration::from_secs(86_400));
        assert_eq!(CacheKey::GospelWay(date(2026, 1, 1)).ttl(), Duration::from_secs(86_400));
        assert_eq!(CacheKey::AllowedDates.ttl(), Duration::from_secs(604_800));
    }
}
