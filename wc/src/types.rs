//! Cells, rows, mutations and filters
//!
//! A table maps a row key to a set of cells addressed by
//! `(family, qualifier, timestamp)`. Cells within a row are kept sorted by
//! family, then qualifier, then timestamp descending, so the newest version
//! of a column always comes first.

use std::cmp::Reverse;

/// Row key within a table
pub type RowKey = String;

/// A single versioned value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Column family name
    pub family: String,
    /// Column name within the family
    pub qualifier: String,
    /// Cell version
    pub timestamp: i64,
    /// Raw value bytes
    pub value: Vec<u8>,
}

impl Cell {
    /// Column in `family:qualifier` form
    pub fn column(&self) -> String {
        format!("{}:{}", self.family, self.qualifier)
    }
}

/// All cells stored under one row key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: RowKey,
    pub cells: Vec<Cell>,
}

impl Row {
    /// Create an empty row
    pub fn new(key: impl Into<RowKey>) -> Self {
        Self {
            key: key.into(),
            cells: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells of one column family, newest version first per column
    pub fn family<'a>(&'a self, family: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells.iter().filter(move |c| c.family == family)
    }

    /// Newest version of a column
    pub fn latest(&self, family: &str, qualifier: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|c| c.family == family && c.qualifier == qualifier)
    }

    /// Write a cell, overwriting any value at the same version
    pub fn set_cell(&mut self, family: &str, qualifier: &str, timestamp: i64, value: Vec<u8>) {
        match self
            .cells
            .iter_mut()
            .find(|c| c.family == family && c.qualifier == qualifier && c.timestamp == timestamp)
        {
            Some(cell) => cell.value = value,
            None => {
                self.cells.push(Cell {
                    family: family.to_string(),
                    qualifier: qualifier.to_string(),
                    timestamp,
                    value,
                });
                self.sort_cells();
            }
        }
    }

    /// Apply every operation of a mutation in order
    pub fn apply(&mut self, mutation: &Mutation) {
        for op in mutation.ops() {
            match op {
                MutationOp::SetCell {
                    family,
                    qualifier,
                    timestamp,
                    value,
                } => self.set_cell(family, qualifier, *timestamp, value.clone()),
                MutationOp::DeleteRow => self.cells.clear(),
            }
        }
    }

    pub(crate) fn sort_cells(&mut self) {
        self.cells.sort_by(|a, b| {
            (&a.family, &a.qualifier, Reverse(a.timestamp)).cmp(&(&b.family, &b.qualifier, Reverse(b.timestamp)))
        });
    }
}

/// One operation within a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOp {
    SetCell {
        family: String,
        qualifier: String,
        timestamp: i64,
        value: Vec<u8>,
    },
    DeleteRow,
}

/// An ordered set of operations applied atomically to one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mutation {
    ops: Vec<MutationOp>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutation removing every cell of the row
    pub fn delete_row() -> Self {
        Self {
            ops: vec![MutationOp::DeleteRow],
        }
    }

    /// Set a cell value at the given version
    pub fn set(&mut self, family: impl Into<String>, qualifier: impl Into<String>, timestamp: i64, value: Vec<u8>) {
        self.ops.push(MutationOp::SetCell {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            value,
        });
    }

    pub fn ops(&self) -> &[MutationOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Predicate evaluated by the store against the cells of a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// Cell family equals the name
    Family(String),
    /// Cell qualifier equals the name
    Column(String),
    /// Cell value within `[start, end)`, compared as bytes; an empty `end` is unbounded
    ValueRange { start: Vec<u8>, end: Vec<u8> },
    /// Every filter must pass
    Chain(Vec<RowFilter>),
}

impl RowFilter {
    pub fn chain(filters: impl IntoIterator<Item = RowFilter>) -> Self {
        RowFilter::Chain(filters.into_iter().collect())
    }

    /// Check whether a single cell passes the filter
    pub fn matches_cell(&self, cell: &Cell) -> bool {
        match self {
            RowFilter::Family(family) => &cell.family == family,
            RowFilter::Column(qualifier) => &cell.qualifier == qualifier,
            RowFilter::ValueRange { start, end } => {
                cell.value.as_slice() >= start.as_slice() && (end.is_empty() || cell.value.as_slice() < end.as_slice())
            }
            RowFilter::Chain(filters) => filters.iter().all(|f| f.matches_cell(cell)),
        }
    }

    /// A row matches when at least one of its cells passes the filter
    pub fn matches_row(&self, row: &Row) -> bool {
        row.cells.iter().any(|cell| self.matches_cell(cell))
    }
}

/// Mutation whose branch is chosen by a predicate over the existing row
#[derive(Debug, Clone)]
pub struct ConditionalMutation {
    pub predicate: RowFilter,
    /// Applied when the predicate matches
    pub on_match: Option<Mutation>,
    /// Applied when the predicate does not match
    pub on_no_match: Option<Mutation>,
}

impl ConditionalMutation {
    pub fn new(predicate: RowFilter, on_match: Option<Mutation>, on_no_match: Option<Mutation>) -> Self {
        Self {
            predicate,
            on_match,
            on_no_match,
        }
    }

    /// Mutation selected by the predicate outcome
    pub fn branch(&self, matched: bool) -> Option<&Mutation> {
        if matched {
            self.on_match.as_ref()
        } else {
            self.on_no_match.as_ref()
        }
    }
}

/// Rows selected by a multi-row read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSet {
    /// Point reads of specific keys
    Keys(Vec<RowKey>),
    /// Every row whose key starts with the prefix
    Prefix(String),
}

impl RowSet {
    pub fn contains(&self, key: &str) -> bool {
        match self {
            RowSet::Keys(keys) => keys.iter().any(|k| k == key),
            RowSet::Prefix(prefix) => key.starts_with(prefix.as_str()),
        }
    }
}
