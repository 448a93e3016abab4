//! Application state: what the reader is looking at and whether it is current
//!
//! `GospelApp` sits on top of the cache and the client. It remembers the last
//! content that loaded successfully, so a failed refresh degrades to
//! "showing what we had" plus a banner instead of an empty screen.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::warn;

use crate::cache::{CacheKey, TtlCache};
use crate::data::{parse_allowed_dates, ClientError, ContentClient, GospelDay};

/// Connectivity notice shown above content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    /// The latest load failed; older content is still on screen
    CachedContent,
    /// The latest load failed and there is nothing to show
    NoConnection,
}

impl Banner {
    pub fn message(&self) -> &'static str {
        match self {
            Banner::CachedContent => "Offline: showing previously loaded content",
            Banner::NoConnection => "No connection",
        }
    }
}

/// Last good content for one screen, plus its connectivity banner
#[derive(Debug, Clone, PartialEq)]
pub struct View<T> {
    pub content: Option<T>,
    pub banner: Option<Banner>,
}

impl<T> Default for View<T> {
    fn default() -> Self {
        Self {
            content: None,
            banner: None,
        }
    }
}

impl<T> View<T> {
    /// Applies the outcome of a load
    ///
    /// Success replaces the content and clears the banner. Failure keeps
    /// whatever content was there and raises the matching banner.
    pub fn apply(&mut self, result: Result<T, ClientError>, what: &str) {
        match result {
            Ok(content) => {
                self.content = Some(content);
                self.banner = None;
            }
            Err(e) => {
                warn!(error = %e, "failed to load {}", what);
                self.banner = Some(if self.content.is_some() {
                    Banner::CachedContent
                } else {
                    Banner::NoConnection
                });
            }
        }
    }
}

/// Main application state
pub struct GospelApp {
    client: ContentClient,
    cache: TtlCache,
    /// Day summary for the home page
    pub home: View<Value>,
    /// Daily reading record for the selected date
    pub gospel: View<Value>,
    /// Dates the reader can pick from
    pub dates: Vec<NaiveDate>,
}

impl GospelApp {
    pub fn new(client: ContentClient, cache: TtlCache) -> Self {
        Self {
            client,
            cache,
            home: View::default(),
            gospel: View::default(),
            dates: Vec::new(),
        }
    }

    /// Loads the day summary for `date`
    ///
    /// With `skip_cache`, the cached entry is dropped first (pull to refresh).
    pub async fn load_home(&mut self, date: NaiveDate, skip_cache: bool) {
        if skip_cache {
            self.invalidate(CacheKey::HomeInfo(date)).await;
        }
        let client = &self.client;
        let result = self
            .cache
            .get_cached_home_info(date, || client.fetch_home_info(date))
            .await;
        self.home.apply(result, "home info");
    }

    /// Loads the daily reading record for `date`
    pub async fn load_gospel(&mut self, date: NaiveDate, skip_cache: bool) {
        if skip_cache {
            self.invalidate(CacheKey::GospelWay(date)).await;
        }
        let client = &self.client;
        let result = self
            .cache
            .get_cached_gospel_way(date, || client.fetch_gospel_way(date))
            .await;
        self.gospel.apply(result, "gospel");
    }

    /// Loads the selectable dates
    ///
    /// If they cannot be loaded, `selected` becomes the only choice.
    pub async fn load_dates(&mut self, selected: NaiveDate) {
        let client = &self.client;
        let result = self
            .cache
            .get_cached_dates(|| client.fetch_allowed_dates())
            .await;
        self.apply_dates(result, selected);
    }

    /// Loads summary, reading and dates for `date` concurrently
    pub async fn load_all(&mut self, date: NaiveDate, skip_cache: bool) {
        if skip_cache {
            self.invalidate(CacheKey::HomeInfo(date)).await;
            self.invalidate(CacheKey::GospelWay(date)).await;
        }
        let client = &self.client;
        let cache = &self.cache;

        let (home, gospel, dates) = futures::join!(
            cache.get_cached_home_info(date, || client.fetch_home_info(date)),
            cache.get_cached_gospel_way(date, || client.fetch_gospel_way(date)),
            cache.get_cached_dates(|| client.fetch_allowed_dates()),
        );

        self.home.apply(home, "home info");
        self.gospel.apply(gospel, "gospel");
        self.apply_dates(dates, date);
    }

    /// Fetches an earlier commentary straight from the network
    ///
    /// Related days are opened on demand and are not cached.
    pub async fn load_related(&self, date: NaiveDate) -> Result<GospelDay, ClientError> {
        let value = self.client.fetch_gospel_way(date).await?;
        Ok(GospelDay::from_value(&value).unwrap_or_default())
    }

    /// Drops a cached entry by its raw key
    pub async fn invalidate_key(&self, key: &str) -> bool {
        match self.cache.invalidate_key(key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "failed to invalidate cache entry");
                false
            }
        }
    }

    async fn invalidate(&self, key: CacheKey) {
        self.invalidate_key(&key.to_string()).await;
    }

    fn apply_dates(&mut self, result: Result<Value, ClientError>, selected: NaiveDate) {
        match result {
            Ok(value) => self.dates = parse_allowed_dates(&value),
            Err(e) => {
                warn!(error = %e, "failed to load dates");
                self.dates = vec![selected];
            }
        }
    }
}
