//! In-process store backend
//!
//! Rows live in a sorted map per table. Faults can be injected to exercise
//! error paths in callers.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{RowStream, WideColumnStore};
use crate::types::{ConditionalMutation, Mutation, Row, RowKey, RowSet};

type Table = BTreeMap<RowKey, Row>;

#[derive(Default)]
struct Inner {
    tables: RwLock<HashMap<String, Table>>,
    faults: Mutex<VecDeque<StoreError>>,
    failing_rows: Mutex<HashSet<RowKey>>,
    latency: Option<Duration>,
}

/// Thread-safe in-memory store; clones share the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that sleeps before serving each call
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                latency: Some(latency),
                ..Default::default()
            }),
        }
    }

    /// Queue errors returned by the next calls, one per call
    pub fn inject_faults(&self, faults: impl IntoIterator<Item = StoreError>) {
        let mut queue = self.inner.faults.lock().unwrap_or_else(|e| e.into_inner());
        queue.extend(faults);
    }

    /// Make bulk writes fail for these rows
    pub fn fail_rows(&self, keys: impl IntoIterator<Item = impl Into<RowKey>>) {
        let mut rows = self.inner.failing_rows.lock().unwrap_or_else(|e| e.into_inner());
        rows.extend(keys.into_iter().map(Into::into));
    }

    /// Number of rows stored in a table
    pub fn row_count(&self, table: &str) -> usize {
        let tables = self.inner.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.get(table).map(|t| t.len()).unwrap_or(0)
    }

    async fn enter(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.inner.latency {
            tokio::time::sleep(latency).await;
        }
        let mut faults = self.inner.faults.lock().unwrap_or_else(|e| e.into_inner());
        match faults.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply_locked(table: &mut Table, row_key: &str, mutation: &Mutation) {
        let row = table.entry(row_key.to_string()).or_insert_with(|| Row::new(row_key));
        row.apply(mutation);
        if row.is_empty() {
            table.remove(row_key);
        }
    }
}

#[async_trait]
impl WideColumnStore for MemoryStore {
    async fn apply(&self, table: &str, row_key: &str, mutation: Mutation) -> Result<(), StoreError> {
        self.enter().await?;
        let mut tables = self.inner.tables.write().unwrap_or_else(|e| e.into_inner());
        Self::apply_locked(tables.entry(table.to_string()).or_default(), row_key, &mutation);
        debug!(table, row_key, "apply: done");
        Ok(())
    }

    async fn apply_conditional(
        &self,
        table: &str,
        row_key: &str,
        mutation: ConditionalMutation,
    ) -> Result<bool, StoreError> {
        self.enter().await?;
        let mut tables = self.inner.tables.write().unwrap_or_else(|e| e.into_inner());
        let rows = tables.entry(table.to_string()).or_default();

        let matched = rows
            .get(row_key)
            .map(|row| mutation.predicate.matches_row(row))
            .unwrap_or(false);

        if let Some(branch) = mutation.branch(matched) {
            Self::apply_locked(rows, row_key, branch);
        }
        debug!(table, row_key, matched, "apply_conditional: done");
        Ok(matched)
    }

    async fn apply_bulk(
        &self,
        table: &str,
        entries: Vec<(RowKey, Mutation)>,
    ) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        self.enter().await?;
        let failing = self.inner.failing_rows.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let mut tables = self.inner.tables.write().unwrap_or_else(|e| e.into_inner());
        let rows = tables.entry(table.to_string()).or_default();

        let results = entries
            .iter()
            .map(|(row_key, mutation)| {
                if failing.contains(row_key) {
                    return Err(StoreError::Backend(format!("write rejected for row {}", row_key)));
                }
                Self::apply_locked(rows, row_key, mutation);
                Ok(())
            })
            .collect::<Vec<_>>();

        debug!(table, entry_count = entries.len(), "apply_bulk: done");
        Ok(results)
    }

    async fn read_row(&self, table: &str, row_key: &str) -> Result<Option<Row>, StoreError> {
        self.enter().await?;
        let tables = self.inner.tables.read().unwrap_or_else(|e| e.into_inner());
        Ok(tables.get(table).and_then(|rows| rows.get(row_key)).cloned())
    }

    async fn read_rows(&self, table: &str, row_set: RowSet) -> Result<RowStream, StoreError> {
        self.enter().await?;
        let tables = self.inner.tables.read().unwrap_or_else(|e| e.into_inner());
        let Some(rows) = tables.get(table) else {
            return Ok(futures::stream::empty().boxed());
        };

        let found: Vec<Row> = match &row_set {
            RowSet::Keys(keys) => keys
                .iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter_map(|key| rows.get(key).cloned())
                .collect(),
            RowSet::Prefix(prefix) => rows
                .range(prefix.clone()..)
                .take_while(|(key, _)| key.starts_with(prefix.as_str()))
                .map(|(_, row)| row.clone())
                .collect(),
        };

        debug!(table, row_count = found.len(), "read_rows: done");
        Ok(futures::stream::iter(found.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn set(value: &str) -> Mutation {
        let mut mutation = Mutation::new();
        mutation.set("data", "v", 0, value.as_bytes().to_vec());
        mutation
    }

    #[tokio::test]
    async fn test_apply_and_read() {
        let store = MemoryStore::new();
        store.apply("t", "a", set("1")).await.unwrap();

        let row = store.read_row("t", "a").await.unwrap().unwrap();
        assert_eq!(row.latest("data", "v").unwrap().value, b"1");
        assert!(store.read_row("t", "missing").await.unwrap().is_none());
        assert!(store.read_row("other", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let store = MemoryStore::new();
        store.apply("t", "a", set("1")).await.unwrap();
        store.delete_row("t", "a").await.unwrap();

        assert!(store.read_row("t", "a").await.unwrap().is_none());
        assert_eq!(store.row_count("t"), 0);
    }

    #[tokio::test]
    async fn test_read_rows_prefix_sorted() {
        let store = MemoryStore::new();
        for key in ["p#2", "q#1", "p#1", "o#9"] {
            store.apply("t", key, set(key)).await.unwrap();
        }

        let rows: Vec<Row> = store
            .read_rows("t", RowSet::Prefix("p#".to_string()))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["p#1", "p#2"]);
    }

    #[tokio::test]
    async fn test_read_rows_keys_skips_missing_and_dedupes() {
        let store = MemoryStore::new();
        store.apply("t", "b", set("b")).await.unwrap();
        store.apply("t", "a", set("a")).await.unwrap();

        let keys = vec!["b".to_string(), "zz".to_string(), "a".to_string(), "b".to_string()];
        let rows: Vec<Row> = store
            .read_rows("t", RowSet::Keys(keys))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_conditional_branches() {
        let store = MemoryStore::new();
        let predicate = crate::RowFilter::Column("v".to_string());

        // Empty row: predicate cannot match, no-match branch applies
        let matched = store
            .apply_conditional("t", "a", ConditionalMutation::new(predicate.clone(), None, Some(set("1"))))
            .await
            .unwrap();
        assert!(!matched);
        assert!(store.read_row("t", "a").await.unwrap().is_some());

        // Now the column exists, so the match branch (none) is chosen
        let matched = store
            .apply_conditional("t", "a", ConditionalMutation::new(predicate, None, Some(set("2"))))
            .await
            .unwrap();
        assert!(matched);
        let row = store.read_row("t", "a").await.unwrap().unwrap();
        assert_eq!(row.latest("data", "v").unwrap().value, b"1");
    }

    #[tokio::test]
    async fn test_bulk_reports_row_failures() {
        let store = MemoryStore::new();
        store.fail_rows(["b"]);

        let results = store
            .apply_bulk("t", vec![("a".to_string(), set("1")), ("b".to_string(), set("2"))])
            .await
            .unwrap();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(store.row_count("t"), 1);
    }

    #[tokio::test]
    async fn test_injected_faults_are_consumed_in_order() {
        let store = MemoryStore::new();
        store.inject_faults([StoreError::Unavailable("down".to_string()), StoreError::NotFound]);

        assert!(matches!(
            store.read_row("t", "a").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.read_row("t", "a").await, Err(StoreError::NotFound)));
        assert!(store.read_row("t", "a").await.unwrap().is_none());
    }
}
