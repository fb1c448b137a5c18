//! Read-only SQLite access for the catalog and query engine.
//!
//! Every engine operation opens its own connection and drops it when the
//! operation returns, so requests never share connection state. The store
//! itself is just a path plus the layout describing which relation holds the
//! global entity rows.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::error::{Result, ScorecardError};

/// Names the fixed parts of the store schema: the global relation, its key
/// column, and its display-name column. Every other user relation is treated
/// as a period relation.
///
/// Deserializable so a hosting process can load it from JSON alongside the
/// rest of its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreLayout {
    /// Relation holding one row per entity.
    pub global_table: String,
    /// Integer key column shared by the global relation and every period
    /// relation.
    pub id_column: String,
    /// Display-name column of the global relation.
    pub name_column: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            global_table: "entity".to_string(),
            id_column: "entity_id".to_string(),
            name_column: "name".to_string(),
        }
    }
}

impl StoreLayout {
    /// Bookkeeping relations that are never period relations.
    pub(crate) fn is_excluded_table(&self, name: &str) -> bool {
        name == "sqlite_sequence" || name.starts_with("sqlite_")
    }
}

/// Handle to the backing SQLite file. Cheap to clone; connections are opened
/// per operation, read-only.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    layout: StoreLayout,
}

impl Store {
    /// Creates a store handle for `path` with the default layout.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_layout(path, StoreLayout::default())
    }

    /// Creates a store handle with an explicit layout.
    pub fn with_layout(path: impl AsRef<Path>, layout: StoreLayout) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            layout,
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a fresh read-only connection.
    pub fn connect(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(ScorecardError::from)
    }

    /// Same as [`connect`](Self::connect), but failures are startup-fatal.
    /// Used only during catalog construction.
    pub(crate) fn connect_for_startup(&self) -> Result<Connection> {
        self.connect().map_err(|e| {
            ScorecardError::startup(format!("cannot open store at {}: {e}", self.path.display()))
        })
    }
}

/// Quotes an identifier for interpolation into SQL text.
///
/// Callers must only pass identifiers that came out of the catalog (or the
/// trusted [`StoreLayout`]); quoting here is belt to the catalog's suspenders,
/// not a substitute for membership validation.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Maps a SQLite value to JSON. `None` means the value is absent from the
/// response: NULLs, non-finite reals, and blobs (the intended datasets have
/// no blob columns).
pub(crate) fn value_to_json(value: ValueRef<'_>) -> Option<Value> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(Value::Number(Number::from(i))),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number),
        ValueRef::Text(t) => Some(Value::String(String::from_utf8_lossy(t).into_owned())),
        ValueRef::Blob(_) => None,
    }
}
