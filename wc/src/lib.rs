//! WideColumn - client contract for a wide-column store
//!
//! A store holds tables; a table maps row keys to cells addressed by
//! column family, column qualifier and version. Callers talk to it through
//! the [`WideColumnStore`] trait:
//!
//! - single-row mutations and conditional mutations
//! - bulk mutations with per-row results
//! - point reads, multi-row reads and prefix scans as a lazy [`RowStream`]
//!
//! # Backends
//!
//! - [`MemoryStore`] - in-process, with fault injection for tests
//! - [`SqliteStore`] - persisted to a single SQLite file
//!
//! # Example
//!
//! ```ignore
//! use widecolumn::{MemoryStore, Mutation, WideColumnStore};
//!
//! let store = MemoryStore::new();
//! let mut mutation = Mutation::new();
//! mutation.set("data", "milliseconds", 0, b"1000".to_vec());
//! store.apply("media_progress", "user_1#VIDEO#title_1#media_1", mutation).await?;
//! ```

mod error;
mod memory;
mod sqlite;
mod store;
mod types;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{RowStream, WideColumnStore};
pub use types::{Cell, ConditionalMutation, Mutation, MutationOp, Row, RowFilter, RowKey, RowSet};
