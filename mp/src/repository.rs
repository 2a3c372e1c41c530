//! Progress repository
//!
//! Maps progress operations onto a [`WideColumnStore`]. Every call runs
//! under its own deadline; idempotent calls are retried on transient errors.

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span, debug, error, info, warn};
use widecolumn::{ConditionalMutation, Mutation, RowSet, StoreError, WideColumnStore};

use crate::codec::{self, decode_row, encode_mutation};
use crate::config::{Config, ConditionalGuard};
use crate::domain::{MediaProgress, ProgressKey, TitleKey};
use crate::error::ProgressError;
use crate::retry::{RetryPolicy, with_deadline, with_retry};

/// Default table name
pub const DEFAULT_TABLE: &str = "media_progress";

/// Default deadline for a single store call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Lazily decoded progress records, in row key order
pub type ProgressStream = BoxStream<'static, Result<MediaProgress, ProgressError>>;

/// Outcome of one row in a batch insert
#[derive(Debug)]
pub struct BatchRowResult {
    pub row_key: String,
    pub result: Result<(), StoreError>,
}

/// Per-row outcomes of a batch insert, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rows: Vec<BatchRowResult>,
}

impl BatchReport {
    /// Rows the store rejected
    pub fn failures(&self) -> impl Iterator<Item = &BatchRowResult> {
        self.rows.iter().filter(|r| r.result.is_err())
    }

    pub fn applied_count(&self) -> usize {
        self.rows.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Reads and writes progress records
pub struct ProgressRepository {
    store: Arc<dyn WideColumnStore>,
    table: String,
    read_timeout: Duration,
    write_timeout: Duration,
    retry: RetryPolicy,
    guard: ConditionalGuard,
    span: Span,
}

impl ProgressRepository {
    /// Create a repository with default table, deadlines and retry policy
    pub fn new(store: Arc<dyn WideColumnStore>) -> Self {
        Self {
            store,
            table: DEFAULT_TABLE.to_string(),
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            guard: ConditionalGuard::default(),
            span: Span::none(),
        }
    }

    /// Create a repository from configuration
    pub fn from_config(store: Arc<dyn WideColumnStore>, config: &Config) -> Self {
        Self::new(store)
            .with_table(&config.store.table)
            .with_timeouts(config.timeouts.read(), config.timeouts.write())
            .with_retry(RetryPolicy::from(&config.retry))
            .with_guard(config.conditional.guard)
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeouts(mut self, read: Duration, write: Duration) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_guard(mut self, guard: ConditionalGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Span that every operation's log events are recorded under
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run a store call under a deadline, retrying transient failures
    async fn call<T, F, Fut>(&self, op: &str, timeout: Duration, retry: bool, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let policy = if retry { self.retry } else { RetryPolicy::none() };
        with_retry(&policy, op, || with_deadline(timeout, call())).await
    }

    /// Write a record, overwriting any stored values
    pub async fn insert(&self, progress: &MediaProgress) -> Result<(), ProgressError> {
        let row_key = progress.key()?.row_key();
        debug!(%row_key, table = %self.table, "insert: called");
        let mutation = encode_mutation(progress);

        async {
            self.call("insert", self.write_timeout, true, || {
                self.store.apply(&self.table, &row_key, mutation.clone())
            })
            .await
            .inspect_err(|e| error!(%row_key, table = %self.table, error = %e, "insert failed"))?;

            info!(%row_key, table = %self.table, "successfully wrote row");
            Ok::<(), ProgressError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Write a record unless the stored `event_at` passes the guard
    ///
    /// Returns whether the write took effect.
    pub async fn insert_conditional(&self, progress: &MediaProgress) -> Result<bool, ProgressError> {
        let row_key = progress.key()?.row_key();
        let start = match self.guard {
            ConditionalGuard::Now => chrono::Utc::now().timestamp(),
            ConditionalGuard::Record => progress.event_at,
        };
        debug!(%row_key, start, guard = ?self.guard, "insert_conditional: called");

        let conditional = ConditionalMutation::new(codec::event_at_since(start), None, Some(encode_mutation(progress)));

        async {
            // A retry could observe this call's own write, so one attempt only
            let matched = self
                .call("insert_conditional", self.write_timeout, false, || {
                    self.store.apply_conditional(&self.table, &row_key, conditional.clone())
                })
                .await
                .inspect_err(|e| error!(%row_key, table = %self.table, error = %e, "conditional insert failed"))?;

            if matched {
                info!(%row_key, table = %self.table, "mutation not applied");
            } else {
                info!(%row_key, table = %self.table, "mutation applied");
            }
            Ok::<bool, ProgressError>(!matched)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Write many records in one bulk call
    ///
    /// Row-level failures are reported in the returned [`BatchReport`];
    /// only a failure of the whole call is an `Err`.
    pub async fn insert_batch(&self, records: &[MediaProgress]) -> Result<BatchReport, ProgressError> {
        let entries = records
            .iter()
            .map(|progress| Ok((progress.key()?.row_key(), encode_mutation(progress))))
            .collect::<Result<Vec<(String, Mutation)>, ProgressError>>()?;
        debug!(row_count = entries.len(), "insert_batch: called");

        if entries.is_empty() {
            return Ok(BatchReport::default());
        }

        async {
            let results = self
                .call("insert_batch", self.write_timeout, true, || {
                    self.store.apply_bulk(&self.table, entries.clone())
                })
                .await
                .inspect_err(|e| error!(table = %self.table, error = %e, "batch insert failed"))?;

            if results.len() != entries.len() {
                return Err(ProgressError::Transport(StoreError::Backend(format!(
                    "bulk write returned {} results for {} rows",
                    results.len(),
                    entries.len()
                ))));
            }

            let report = BatchReport {
                rows: entries
                    .iter()
                    .map(|(row_key, _)| row_key.clone())
                    .zip(results)
                    .map(|(row_key, result)| BatchRowResult { row_key, result })
                    .collect(),
            };

            for failed in report.failures() {
                if let Err(e) = &failed.result {
                    warn!(row_key = %failed.row_key, error = %e, "batch row failed");
                }
            }
            info!(
                applied = report.applied_count(),
                failed = report.rows.len() - report.applied_count(),
                table = %self.table,
                "batch write finished"
            );
            Ok::<BatchReport, ProgressError>(report)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Remove a record entirely
    pub async fn delete(&self, key: &ProgressKey) -> Result<(), ProgressError> {
        let row_key = key.row_key();
        debug!(%row_key, "delete: called");

        async {
            self.call("delete", self.write_timeout, true, || {
                self.store.delete_row(&self.table, &row_key)
            })
            .await
            .inspect_err(|e| error!(%row_key, table = %self.table, error = %e, "delete failed"))?;

            info!(%row_key, table = %self.table, "successfully deleted row");
            Ok::<(), ProgressError>(())
        }
        .instrument(self.span.clone())
        .await
    }

    /// Read a single record
    ///
    /// A not-found status and an empty result are both reported as
    /// [`ProgressError::NotFound`].
    pub async fn read_one(&self, key: &ProgressKey) -> Result<MediaProgress, ProgressError> {
        let row_key = key.row_key();
        debug!(%row_key, "read_one: called");

        async {
            let row = match self
                .call("read_one", self.read_timeout, true, || {
                    self.store.read_row(&self.table, &row_key)
                })
                .await
            {
                Ok(row) => row,
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(ProgressError::from(e)),
            };

            match row {
                Some(row) if !row.is_empty() => decode_row(&row).map_err(ProgressError::from),
                _ => {
                    debug!(%row_key, "read_one: not found");
                    Err(ProgressError::NotFound { row_key })
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    /// Stream the records of several media items of one title
    pub async fn stream_multiple<S: AsRef<str>>(
        &self,
        title: &TitleKey,
        media_ids: &[S],
    ) -> Result<ProgressStream, ProgressError> {
        let keys = media_ids
            .iter()
            .map(|media_id| Ok(title.media(media_id.as_ref())?.row_key()))
            .collect::<Result<Vec<_>, ProgressError>>()?;
        debug!(key_count = keys.len(), "stream_multiple: called");
        self.stream(RowSet::Keys(keys)).await
    }

    /// Stream every record of one title
    pub async fn stream_partial_key(&self, title: &TitleKey) -> Result<ProgressStream, ProgressError> {
        let prefix = title.row_prefix();
        debug!(%prefix, "stream_partial_key: called");
        self.stream(RowSet::Prefix(prefix)).await
    }

    /// Read several media items of one title
    ///
    /// Missing items are skipped. Stops at the first row that fails to
    /// decode and returns that error.
    pub async fn read_multiple<S: AsRef<str>>(
        &self,
        title: &TitleKey,
        media_ids: &[S],
    ) -> Result<Vec<MediaProgress>, ProgressError> {
        self.stream_multiple(title, media_ids).await?.try_collect().await
    }

    /// Read every record of one title via a prefix scan
    ///
    /// Stops at the first row that fails to decode and returns that error.
    pub async fn read_by_partial_key(&self, title: &TitleKey) -> Result<Vec<MediaProgress>, ProgressError> {
        self.stream_partial_key(title).await?.try_collect().await
    }

    async fn stream(&self, row_set: RowSet) -> Result<ProgressStream, ProgressError> {
        let rows = async {
            self.call("read_rows", self.read_timeout, true, || {
                self.store.read_rows(&self.table, row_set.clone())
            })
            .await
            .inspect_err(|e| error!(table = %self.table, error = %e, "read failed"))
        }
        .instrument(self.span.clone())
        .await?;

        let span = self.span.clone();
        Ok(rows
            .map(move |row| -> Result<MediaProgress, ProgressError> {
                let row = row?;
                decode_row(&row).map_err(|e| {
                    span.in_scope(|| warn!(row_key = %row.key, error = %e, "row failed to decode"));
                    ProgressError::from(e)
                })
            })
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::data_type;
    use widecolumn::MemoryStore;

    fn repo(store: &MemoryStore) -> ProgressRepository {
        ProgressRepository::new(Arc::new(store.clone())).with_retry(RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
        })
    }

    fn video(media_id: &str, milliseconds: i64, event_at: i64) -> MediaProgress {
        MediaProgress::new("user_1", data_type::VIDEO, "title_1", media_id, milliseconds, event_at)
    }

    #[tokio::test]
    async fn test_insert_then_read_one() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let progress = video("media_1", 1000, 1_700_000_000);

        repo.insert(&progress).await.unwrap();
        let read = repo.read_one(&progress.key().unwrap()).await.unwrap();
        assert_eq!(read, progress);
    }

    #[tokio::test]
    async fn test_read_one_not_found_from_status() {
        let store = MemoryStore::new();
        store.inject_faults([StoreError::NotFound]);
        let key = ProgressKey::new("user_1", "VIDEO", "title_1", "media_1").unwrap();

        let err = repo(&store).read_one(&key).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_one_retries_transient_error() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let progress = video("media_1", 5, 6);
        repo.insert(&progress).await.unwrap();

        store.inject_faults([StoreError::Unavailable("reset".to_string())]);
        assert_eq!(repo.read_one(&progress.key().unwrap()).await.unwrap(), progress);
    }

    #[tokio::test]
    async fn test_permanent_error_propagates() {
        let store = MemoryStore::new();
        store.inject_faults([StoreError::Backend("permission denied".to_string())]);

        let err = repo(&store).insert(&video("media_1", 1, 2)).await.unwrap_err();
        assert!(matches!(err, ProgressError::Transport(StoreError::Backend(_))));
        assert_eq!(store.row_count(DEFAULT_TABLE), 0);
    }

    #[tokio::test]
    async fn test_conditional_is_not_retried() {
        let store = MemoryStore::new();
        store.inject_faults([StoreError::Unavailable("reset".to_string())]);

        let err = repo(&store)
            .insert_conditional(&video("media_1", 1, 2))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.row_count(DEFAULT_TABLE), 0);
    }

    #[tokio::test]
    async fn test_conditional_record_guard() {
        let store = MemoryStore::new();
        let repo = repo(&store).with_guard(ConditionalGuard::Record);

        assert!(repo.insert_conditional(&video("media_1", 100, 1_700_000_100)).await.unwrap());
        // Older event is rejected
        assert!(!repo.insert_conditional(&video("media_1", 50, 1_700_000_050)).await.unwrap());
        // Newer event is applied
        assert!(repo.insert_conditional(&video("media_1", 200, 1_700_000_200)).await.unwrap());

        let stored = repo.read_one(&video("media_1", 0, 0).key().unwrap()).await.unwrap();
        assert_eq!(stored.milliseconds_played, 200);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_store_call() {
        let store = MemoryStore::new();
        let repo = repo(&store);

        let err = repo.insert(&video("media#1", 1, 2)).await.unwrap_err();
        assert!(matches!(err, ProgressError::InvalidKeyField { field: "media_id", .. }));

        let err = repo
            .insert_batch(&[video("media_1", 1, 2), video("media#2", 1, 2)])
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::InvalidKeyField { .. }));
        assert_eq!(store.row_count(DEFAULT_TABLE), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let store = MemoryStore::new();
        store.inject_faults([StoreError::Backend("should not be called".to_string())]);

        let report = repo(&store).insert_batch(&[]).await.unwrap();
        assert!(report.rows.is_empty());
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_deadline_applies_per_call() {
        let store = MemoryStore::with_latency(Duration::from_millis(200));
        let repo = ProgressRepository::new(Arc::new(store))
            .with_timeouts(Duration::from_millis(10), Duration::from_millis(10))
            .with_retry(RetryPolicy::none());

        let err = repo.insert(&video("media_1", 1, 2)).await.unwrap_err();
        assert!(matches!(err, ProgressError::Transport(StoreError::DeadlineExceeded(_))));
    }

    #[tokio::test]
    async fn test_stream_can_stop_early() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        for i in 0..5 {
            repo.insert(&video(&format!("media_{}", i), i, i)).await.unwrap();
        }

        let title = TitleKey::new("user_1", "VIDEO", "title_1").unwrap();
        let first_two: Vec<_> = repo
            .stream_partial_key(&title)
            .await
            .unwrap()
            .take(2)
            .try_collect()
            .await
            .unwrap();
        assert_eq!(first_two.len(), 2);
        assert_eq!(first_two[0].media_id, "media_0");
    }

    #[tokio::test]
    async fn test_with_span_and_table() {
        let store = MemoryStore::new();
        let repo = repo(&store)
            .with_table("custom")
            .with_span(tracing::info_span!("repo", test = true));
        assert_eq!(repo.table(), "custom");

        repo.insert(&video("media_1", 1, 2)).await.unwrap();
        assert_eq!(store.row_count("custom"), 1);
        assert_eq!(store.row_count(DEFAULT_TABLE), 0);
    }
}
