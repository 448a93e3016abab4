//! Saved text highlights
//!
//! Highlights are passages the reader marked while reading a day's record.
//! They live as one JSON array under the `highlights` key of the same
//! key-value store the cache uses, newest first.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::cache::{KeyValueStore, StoreError};
use crate::clock::{Clock, SystemClock};

/// Store key holding the highlight list
pub const HIGHLIGHTS_KEY: &str = "highlights";

/// Errors that can occur when changing the highlight list
#[derive(Debug, Error)]
pub enum HighlightError {
    /// The store could not be read or written
    #[error("Highlight storage failed: {0}")]
    Store(#[from] StoreError),

    /// The stored list is not valid JSON; it is left untouched
    #[error("Stored highlights are unreadable: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// The list could not be serialized
    #[error("Failed to serialize highlights: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A highlighted passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    /// Creation time in epoch milliseconds, as a string
    pub id: String,
    pub text: String,
    /// ISO date of the reading the passage comes from
    pub date: String,
    /// Section of the reading (gospel, comment, reflection)
    pub section: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// Highlight list persisted in a key-value store
#[derive(Clone)]
pub struct HighlightStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl HighlightStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// All highlights, newest first
    ///
    /// For display only: an absent or unreadable list reads as empty.
    pub async fn list(&self) -> Vec<Highlight> {
        self.load().await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to read highlights");
            Vec::new()
        })
    }

    /// Prepends a new highlight and returns the updated list
    pub async fn add(
        &self,
        text: impl Into<String>,
        date: NaiveDate,
        section: impl Into<String>,
    ) -> Result<Vec<Highlight>, HighlightError> {
        let now = self.clock.now_millis();
        let created_at = DateTime::<Utc>::from_timestamp_millis(now)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut highlights = self.load().await?;
        highlights.insert(
            0,
            Highlight {
                id: now.to_string(),
                text: text.into(),
                date: date.format("%Y-%m-%d").to_string(),
                section: section.into(),
                created_at,
            },
        );

        self.save(&highlights).await?;
        Ok(highlights)
    }

    /// Removes the highlight with `id` and returns the remaining list
    pub async fn remove(&self, id: &str) -> Result<Vec<Highlight>, HighlightError> {
        let mut highlights = self.load().await?;
        highlights.retain(|h| h.id != id);
        self.save(&highlights).await?;
        Ok(highlights)
    }

    pub async fn count(&self) -> usize {
        self.list().await.len()
    }

    /// Highlights taken from the reading of `date`
    pub async fn by_date(&self, date: NaiveDate) -> Vec<Highlight> {
        let date = date.format("%Y-%m-%d").to_string();
        self.list()
            .await
            .into_iter()
            .filter(|h| h.date == date)
            .collect()
    }

    /// Reads the stored list, surfacing every failure
    ///
    /// Writers start from this so a failed read never overwrites saved
    /// highlights with a shorter list.
    async fn load(&self) -> Result<Vec<Highlight>, HighlightError> {
        match self.store.get(HIGHLIGHTS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(HighlightError::Corrupt),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, highlights: &[Highlight]) -> Result<(), HighlightError> {
        let json = serde_json::to_string(highlights)?;
        self.store.set(HIGHLIGHTS_KEY, &json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::clock::ManualClock;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_highlights() -> (HighlightStore, Arc<MemoryStore>, ManualClock) {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(1_760_000_000_000);
        let highlights = HighlightStore::with_clock(store.clone(), Arc::new(clock.clone()));
        (highlights, store, clock)
    }

    #[tokio::test]
    async fn test_list_is_empty_initially() {
        let (highlights, _store, _clock) = create_test_highlights();
        assert!(highlights.list().await.is_empty());
        assert_eq!(highlights.count().await, 0);
    }

    #[tokio::test]
    async fn test_add_prepends_with_id_and_timestamp() {
        let (highlights, _store, clock) = create_test_highlights();

        highlights.add("Beati i poveri", date(2026, 10, 19), "gospel").await.unwrap();
        clock.advance(Duration::from_millis(5));
        let list = highlights.add("Rallegratevi", date(2026, 10, 19), "comment").await.unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].text, "Rallegratevi");
        assert_eq!(list[0].id, "1760000000005");
        assert_eq!(list[1].id, "1760000000000");
        assert_eq!(list[1].created_at, "2025-10-09T08:53:20.000Z");
        assert_eq!(list[1].date, "2026-10-19");
    }

    #[tokio::test]
    async fn test_persisted_format_uses_camel_case() {
        let (highlights, store, _clock) = create_test_highlights();

        highlights.add("testo", date(2026, 10, 19), "gospel").await.unwrap();

        let raw = store.get(HIGHLIGHTS_KEY).await.unwrap().unwrap();
        assert!(raw.contains("\"createdAt\""));
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let (highlights, _store, clock) = create_test_highlights();
        highlights.add("a", date(2026, 10, 19), "gospel").await.unwrap();
        clock.advance(Duration::from_millis(1));
        highlights.add("b", date(2026, 10, 19), "gospel").await.unwrap();

        let remaining = highlights.remove("1760000000000").await.unwrap();

        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "b");
        assert_eq!(highlights.count().await, 1);
    }

    #[tokio::test]
    async fn test_by_date_filters() {
        let (highlights, _store, clock) = create_test_highlights();
        highlights.add("a", date(2026, 10, 18), "gospel").await.unwrap();
        clock.advance(Duration::from_millis(1));
        highlights.add("b", date(2026, 10, 19), "reflection").await.unwrap();

        let found = highlights.by_date(date(2026, 10, 19)).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].section, "reflection");
    }

    #[tokio::test]
    async fn test_malformed_list_reads_as_empty() {
        let (highlights, store, _clock) = create_test_highlights();
        store.set(HIGHLIGHTS_KEY, "{oops").await.unwrap();

        assert!(highlights.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_to_malformed_list_keeps_stored_value() {
        let (highlights, store, _clock) = create_test_highlights();
        store.set(HIGHLIGHTS_KEY, "{oops").await.unwrap();

        let err = highlights.add("nuovo", date(2026, 10, 19), "gospel").await.unwrap_err();

        assert!(matches!(err, HighlightError::Corrupt(_)));
        assert_eq!(store.get(HIGHLIGHTS_KEY).await.unwrap().as_deref(), Some("{oops"));
    }

    /// Memory store whose next read fails once
    #[derive(Default)]
    struct FlakyReads {
        inner: MemoryStore,
        fail_next_get: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyReads {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail_next_get.swap(false, Ordering::SeqCst) {
                return Err(StoreError::Unavailable("transient read failure".to_string()));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_read_failure_does_not_drop_saved_highlights() {
        let store = Arc::new(FlakyReads::default());
        let clock = ManualClock::new(1_760_000_000_000);
        let highlights = HighlightStore::with_clock(store.clone(), Arc::new(clock.clone()));
        highlights.add("uno", date(2026, 10, 19), "gospel").await.unwrap();
        clock.advance(Duration::from_millis(1));
        highlights.add("due", date(2026, 10, 19), "gospel").await.unwrap();

        store.fail_next_get.store(true, Ordering::SeqCst);
        clock.advance(Duration::from_millis(1));
        let added = highlights.add("tre", date(2026, 10, 19), "gospel").await;
        assert!(matches!(added, Err(HighlightError::Store(_))));
        assert_eq!(highlights.count().await, 2);

        store.fail_next_get.store(true, Ordering::SeqCst);
        assert!(highlights.remove("1760000000000").await.is_err());
        assert_eq!(highlights.count().await, 2);
    }
}
