//! SQLite-backed store
//!
//! Persists cells in a single `cells` table so that separate processes can
//! share the same data. Blocking SQLite calls run on the tokio blocking pool.
//!
//! ```text
//! cells(tbl, row_key, family, qualifier, ts, value)
//!       └──────── primary key ─────────┘
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use rusqlite::{Connection, Transaction, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{RowStream, WideColumnStore};
use crate::types::{Cell, ConditionalMutation, Mutation, MutationOp, Row, RowKey, RowSet};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cells (
    tbl       TEXT    NOT NULL,
    row_key   TEXT    NOT NULL,
    family    TEXT    NOT NULL,
    qualifier TEXT    NOT NULL,
    ts        INTEGER NOT NULL,
    value     BLOB    NOT NULL,
    PRIMARY KEY (tbl, row_key, family, qualifier, ts)
) WITHOUT ROWID;
";

const SELECT_CELLS: &str = "SELECT row_key, family, qualifier, ts, value FROM cells";

/// Store persisted in a SQLite database file
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %path.display(), "Opened SQLite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        debug!("Opened in-memory SQLite store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        // Blocking threads do not inherit the caller's scoped subscriber or span
        let dispatch = tracing::dispatcher::get_default(|d| d.clone());
        let span = tracing::Span::current();
        tokio::task::spawn_blocking(move || {
            tracing::dispatcher::with_default(&dispatch, || {
                span.in_scope(|| {
                    let mut guard = conn
                        .lock()
                        .map_err(|_| StoreError::Backend("SQLite connection lock poisoned".to_string()))?;
                    f(&mut guard)
                })
            })
        })
        .await?
    }
}

fn apply_in_tx(tx: &Transaction<'_>, table: &str, row_key: &str, mutation: &Mutation) -> Result<(), StoreError> {
    for op in mutation.ops() {
        match op {
            MutationOp::SetCell {
                family,
                qualifier,
                timestamp,
                value,
            } => {
                tx.execute(
                    "INSERT INTO cells (tbl, row_key, family, qualifier, ts, value)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT (tbl, row_key, family, qualifier, ts) DO UPDATE SET value = excluded.value",
                    params![table, row_key, family, qualifier, timestamp, value],
                )?;
            }
            MutationOp::DeleteRow => {
                tx.execute(
                    "DELETE FROM cells WHERE tbl = ?1 AND row_key = ?2",
                    params![table, row_key],
                )?;
            }
        }
    }
    Ok(())
}

/// Group `(row_key, cell)` pairs sorted by key into rows
fn group_rows(cells: impl IntoIterator<Item = (RowKey, Cell)>) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();
    for (key, cell) in cells {
        match rows.last_mut() {
            Some(row) if row.key == key => row.cells.push(cell),
            _ => {
                let mut row = Row::new(key);
                row.cells.push(cell);
                rows.push(row);
            }
        }
    }
    for row in &mut rows {
        row.sort_cells();
    }
    rows
}

fn query_cells(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<(RowKey, Cell)>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let cells = stmt
        .query_map(params, |r| {
            Ok((
                r.get::<_, String>(0)?,
                Cell {
                    family: r.get(1)?,
                    qualifier: r.get(2)?,
                    timestamp: r.get(3)?,
                    value: r.get(4)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cells)
}

fn load_row(conn: &Connection, table: &str, row_key: &str) -> Result<Option<Row>, StoreError> {
    let sql = format!("{} WHERE tbl = ?1 AND row_key = ?2", SELECT_CELLS);
    let cells = query_cells(conn, &sql, params![table, row_key])?;
    Ok(group_rows(cells).into_iter().next())
}

#[async_trait]
impl WideColumnStore for SqliteStore {
    async fn apply(&self, table: &str, row_key: &str, mutation: Mutation) -> Result<(), StoreError> {
        let (table, row_key) = (table.to_string(), row_key.to_string());
        self.run(move |conn| {
            let tx = conn.transaction()?;
            apply_in_tx(&tx, &table, &row_key, &mutation)?;
            tx.commit()?;
            debug!(%table, %row_key, "apply: committed");
            Ok(())
        })
        .await
    }

    async fn apply_conditional(
        &self,
        table: &str,
        row_key: &str,
        mutation: ConditionalMutation,
    ) -> Result<bool, StoreError> {
        let (table, row_key) = (table.to_string(), row_key.to_string());
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let matched = load_row(&tx, &table, &row_key)?
                .map(|row| mutation.predicate.matches_row(&row))
                .unwrap_or(false);
            if let Some(branch) = mutation.branch(matched) {
                apply_in_tx(&tx, &table, &row_key, branch)?;
            }
            tx.commit()?;
            debug!(%table, %row_key, matched, "apply_conditional: committed");
            Ok(matched)
        })
        .await
    }

    async fn apply_bulk(
        &self,
        table: &str,
        entries: Vec<(RowKey, Mutation)>,
    ) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        let table = table.to_string();
        self.run(move |conn| {
            let mut results = Vec::with_capacity(entries.len());
            for (row_key, mutation) in &entries {
                let outcome = conn
                    .transaction()
                    .map_err(StoreError::from)
                    .and_then(|tx| {
                        apply_in_tx(&tx, &table, row_key, mutation)?;
                        tx.commit().map_err(StoreError::from)
                    });
                results.push(outcome);
            }
            debug!(%table, entry_count = entries.len(), "apply_bulk: committed");
            Ok(results)
        })
        .await
    }

    async fn read_row(&self, table: &str, row_key: &str) -> Result<Option<Row>, StoreError> {
        let (table, row_key) = (table.to_string(), row_key.to_string());
        self.run(move |conn| load_row(conn, &table, &row_key)).await
    }

    async fn read_rows(&self, table: &str, row_set: RowSet) -> Result<RowStream, StoreError> {
        let table = table.to_string();
        let rows = self
            .run(move |conn| match row_set {
                RowSet::Keys(mut keys) => {
                    keys.sort();
                    keys.dedup();
                    let mut rows = Vec::new();
                    for key in keys {
                        if let Some(row) = load_row(conn, &table, &key)? {
                            rows.push(row);
                        }
                    }
                    Ok(rows)
                }
                RowSet::Prefix(prefix) => {
                    let sql = format!(
                        "{} WHERE tbl = ?1 AND substr(row_key, 1, length(?2)) = ?2 \
                         ORDER BY row_key, family, qualifier, ts DESC",
                        SELECT_CELLS
                    );
                    Ok(group_rows(query_cells(conn, &sql, params![table, prefix])?))
                }
            })
            .await?;

        debug!(row_count = rows.len(), "read_rows: loaded");
        Ok(futures::stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}
