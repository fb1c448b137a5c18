//! Startup-built schema catalog.
//!
//! The catalog is the whitelist that makes identifier interpolation safe:
//! period and attribute names cannot be passed as bound parameters, so every
//! name spliced into query text must first prove membership here. It is built
//! exactly once, before the hosting process accepts traffic, and is read-only
//! afterwards; membership tests are plain hash-set lookups safe for
//! concurrent readers.
//!
//! Documented precondition: period relations are column-homogeneous. The
//! attribute set is derived from the global relation plus one representative
//! period relation (the minimum period), not the union across all periods.

use std::fmt;

use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::error::{Result, ScorecardError};
use crate::store::{quote_ident, Store};

/// Immutable whitelist of valid periods, entity ids, entity names, and
/// attribute names.
#[derive(Debug)]
pub struct Catalog {
    periods: FxHashSet<String>,
    entity_ids: FxHashSet<i64>,
    entity_names: FxHashSet<String>,
    attributes: FxHashSet<String>,
    /// Numeric (min, max) over `periods`; `None` when the store has no
    /// period relations.
    period_bounds: Option<(i64, i64)>,
}

/// A period name proven valid by catalog membership.
///
/// The only way to obtain one is [`Catalog::period`], so any `Period` reaching
/// query-construction code is safe to interpolate as a relation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period<'c>(&'c str);

impl<'c> Period<'c> {
    pub fn as_str(&self) -> &'c str {
        self.0
    }

    /// Numeric value of the period. Infallible: non-numeric relation names
    /// are rejected during catalog construction.
    pub fn value(&self) -> i64 {
        self.0.parse().unwrap_or_default()
    }
}

impl fmt::Display for Period<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An attribute name proven valid by catalog membership, safe to interpolate
/// as a column name. Obtainable only via [`Catalog::attribute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'c>(&'c str);

impl<'c> Attribute<'c> {
    pub fn as_str(&self) -> &'c str {
        self.0
    }

    /// The attribute quoted for use in SQL text.
    pub(crate) fn quoted(&self) -> String {
        quote_ident(self.0)
    }
}

impl fmt::Display for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Catalog {
    /// Introspects the store and builds the catalog.
    ///
    /// Reads the relation list, partitions it into the global relation and
    /// period relations (system relations excluded by name), loads all entity
    /// ids and display names, and derives the attribute set from the global
    /// relation's columns plus the representative period relation's columns.
    ///
    /// # Errors
    ///
    /// Returns [`ScorecardError::Startup`] if the store cannot be opened or
    /// the global relation is absent. Both are fatal: the hosting process
    /// must not begin serving.
    pub fn build(store: &Store) -> Result<Self> {
        let conn = store.connect_for_startup()?;
        let layout = store.layout();

        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let table_names: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<_, _>>()?;
        drop(stmt);

        let mut periods = FxHashSet::default();
        let mut saw_global = false;
        for name in table_names {
            if name == layout.global_table {
                saw_global = true;
            } else if layout.is_excluded_table(&name) {
                continue;
            } else if name.parse::<i64>().is_ok_and(|v| v.to_string() == name) {
                periods.insert(name);
            } else {
                // Range scans regenerate period names via i64::to_string(),
                // so a name that does not round-trip through i64 could never
                // be reached again; leave it out of the whitelist entirely.
                warn!("ignoring non-period relation {name:?} during catalog build");
            }
        }

        if !saw_global {
            return Err(ScorecardError::startup(format!(
                "global relation {:?} is missing from the store",
                layout.global_table
            )));
        }

        let period_bounds = periods
            .iter()
            .filter_map(|p| p.parse::<i64>().ok())
            .fold(None, |acc: Option<(i64, i64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            });

        let mut entity_ids = FxHashSet::default();
        let mut entity_names = FxHashSet::default();
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {} FROM {}",
            quote_ident(&layout.id_column),
            quote_ident(&layout.name_column),
            quote_ident(&layout.global_table),
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (id, name) = row?;
            entity_ids.insert(id);
            entity_names.insert(name);
        }
        drop(stmt);

        let mut attributes: FxHashSet<String> =
            table_columns(&conn, &layout.global_table)?.into_iter().collect();
        if let Some((min, _)) = period_bounds {
            attributes.extend(table_columns(&conn, &min.to_string())?);
        }

        debug!(
            "catalog built: {} periods, {} entities, {} attributes",
            periods.len(),
            entity_ids.len(),
            attributes.len()
        );

        Ok(Self {
            periods,
            entity_ids,
            entity_names,
            attributes,
            period_bounds,
        })
    }

    pub fn is_valid_period(&self, period: &str) -> bool {
        self.periods.contains(period)
    }

    pub fn is_valid_entity_id(&self, id: i64) -> bool {
        self.entity_ids.contains(&id)
    }

    pub fn is_valid_entity_name(&self, name: &str) -> bool {
        self.entity_names.contains(name)
    }

    pub fn is_valid_attribute(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    /// Proves `period` valid, returning a token safe to splice into SQL.
    pub fn period(&self, period: &str) -> Option<Period<'_>> {
        self.periods.get(period).map(|p| Period(p.as_str()))
    }

    /// Proves `attribute` valid, returning a token safe to splice into SQL.
    pub fn attribute(&self, attribute: &str) -> Option<Attribute<'_>> {
        self.attributes.get(attribute).map(|a| Attribute(a.as_str()))
    }

    /// Numeric (min, max) over all known periods, `None` if the store has no
    /// period relations.
    pub fn period_bounds(&self) -> Option<(i64, i64)> {
        self.period_bounds
    }

    /// The representative period whose columns define the period-scoped half
    /// of the attribute set.
    pub fn representative_period(&self) -> Option<Period<'_>> {
        let (min, _) = self.period_bounds?;
        self.period(&min.to_string())
    }
}

/// Column names of `table`, in declaration order.
fn table_columns(conn: &rusqlite::Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<_, _>>()?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreLayout;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn fixture_store(dir: &TempDir) -> Store {
        let path = dir.path().join("catalog.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE entity (
                entity_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT,
                city TEXT
            );
            CREATE TABLE "2010" (entity_id INTEGER, enrollment INTEGER);
            CREATE TABLE "2011" (entity_id INTEGER, enrollment INTEGER);
            CREATE TABLE notes (entity_id INTEGER, body TEXT);
            INSERT INTO entity (entity_id, name, city)
                VALUES (7, 'Acme College', 'Springfield');
            "#,
        )
        .unwrap();
        Store::with_layout(path, StoreLayout::default())
    }

    #[test]
    fn build_partitions_tables_and_loads_sets() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::build(&fixture_store(&dir)).unwrap();

        assert!(catalog.is_valid_period("2010"));
        assert!(catalog.is_valid_period("2011"));
        // AUTOINCREMENT creates sqlite_sequence; excluded by name.
        assert!(!catalog.is_valid_period("sqlite_sequence"));
        // Non-numeric user table is not a period.
        assert!(!catalog.is_valid_period("notes"));
        assert!(!catalog.is_valid_period("entity"));

        assert!(catalog.is_valid_entity_id(7));
        assert!(!catalog.is_valid_entity_id(8));
        assert!(catalog.is_valid_entity_name("Acme College"));
        assert!(!catalog.is_valid_entity_name("Nowhere U"));

        assert_eq!(catalog.period_bounds(), Some((2010, 2011)));
    }

    #[test]
    fn attribute_set_unions_global_and_representative_period() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::build(&fixture_store(&dir)).unwrap();

        assert!(catalog.is_valid_attribute("city"));
        assert!(catalog.is_valid_attribute("enrollment"));
        assert!(catalog.is_valid_attribute("entity_id"));
        assert!(!catalog.is_valid_attribute("city; DROP TABLE entity"));
    }

    #[test]
    fn non_canonical_numeric_relations_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("padded.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE entity (entity_id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE "2010" (entity_id INTEGER, enrollment INTEGER);
            CREATE TABLE "02010" (entity_id INTEGER, enrollment INTEGER);
            CREATE TABLE "+10" (entity_id INTEGER, enrollment INTEGER);
            "#,
        )
        .unwrap();
        let catalog = Catalog::build(&Store::open(&path)).unwrap();

        // Range scans regenerate names through i64::to_string(), so only
        // names that round-trip exactly may enter the whitelist.
        assert!(catalog.is_valid_period("2010"));
        assert!(!catalog.is_valid_period("02010"));
        assert!(!catalog.is_valid_period("+10"));
        assert_eq!(catalog.period_bounds(), Some((2010, 2010)));
    }

    #[test]
    fn validated_tokens_only_exist_for_members() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::build(&fixture_store(&dir)).unwrap();

        assert_eq!(catalog.period("2010").unwrap().as_str(), "2010");
        assert_eq!(catalog.period("2010").unwrap().value(), 2010);
        assert!(catalog.period("2012").is_none());
        assert!(catalog.attribute("enrollment").is_some());
        assert!(catalog.attribute("\"; --").is_none());
    }

    #[test]
    fn missing_global_relation_is_startup_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(r#"CREATE TABLE "2010" (entity_id INTEGER);"#)
            .unwrap();
        let store = Store::open(&path);

        match Catalog::build(&store) {
            Err(ScorecardError::Startup { .. }) => {}
            other => panic!("expected startup error, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_store_is_startup_fatal() {
        let store = Store::open("/nonexistent/dir/missing.sqlite");
        match Catalog::build(&store) {
            Err(ScorecardError::Startup { .. }) => {}
            other => panic!("expected startup error, got {other:?}"),
        }
    }
}
