//! Dynamic query construction over the period-partitioned store.
//!
//! The engine owns the only code path that splices identifiers into SQL
//! text, and that path accepts nothing but [`Period`]/[`Attribute`] tokens
//! handed out by the catalog plus the trusted [`StoreLayout`] names. Entity
//! ids are always bound parameters. Validation happens in full before the
//! first query of a request is issued.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use rusqlite::Connection;

use crate::catalog::{Attribute, Catalog};
use crate::error::{Result, ScorecardError};
use crate::store::{quote_ident, value_to_json, Store};
use crate::types::{AttrMap, AttrScope, AttributeDef, AttributeValue, EntityRef, MergedEntity};

/// Read-only query engine. Cheap to clone; each operation opens its own
/// connection and releases it on every exit path.
#[derive(Clone)]
pub struct QueryEngine {
    store: Store,
    catalog: Arc<Catalog>,
}

impl QueryEngine {
    pub fn new(store: Store, catalog: Arc<Catalog>) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All entities, ordered by display name ascending. An empty store
    /// yields an empty listing, not an error.
    pub fn list_entities(&self) -> Result<Vec<EntityRef>> {
        let layout = self.store.layout();
        let conn = self.store.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {} FROM {} ORDER BY {}",
            quote_ident(&layout.id_column),
            quote_ident(&layout.name_column),
            quote_ident(&layout.global_table),
            quote_ident(&layout.name_column),
        ))?;
        let entities = stmt
            .query_map([], |row| {
                Ok(EntityRef {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(entities)
    }

    /// The union of the entity's global record and its record in every known
    /// period. Period data nests under the period key; global data lives
    /// under the reserved `global` key, so the two namespaces cannot collide.
    pub fn entity_merged(&self, id: i64) -> Result<MergedEntity> {
        if !self.catalog.is_valid_entity_id(id) {
            return Err(ScorecardError::NotFound);
        }
        let conn = self.store.connect()?;
        let global = self
            .fetch_global_record(&conn, id)?
            .ok_or(ScorecardError::NotFound)?;
        let periods = match self.catalog.period_bounds() {
            Some((lo, hi)) => self.fetch_period_records(&conn, id, lo, hi)?,
            None => BTreeMap::new(),
        };
        Ok(MergedEntity { periods, global })
    }

    /// Global-only projection of an entity, null-valued attributes omitted.
    pub fn entity_global(&self, id: i64) -> Result<AttrMap> {
        if !self.catalog.is_valid_entity_id(id) {
            return Err(ScorecardError::NotFound);
        }
        let conn = self.store.connect()?;
        self.fetch_global_record(&conn, id)?
            .ok_or(ScorecardError::NotFound)
    }

    /// Per-period records for an entity over an inclusive range. `max`
    /// defaults to `min`. Periods where the entity has no row are omitted
    /// from the result, except that a single-period request for an absent
    /// row fails outright: the sole thing asked for does not exist.
    pub fn entity_periods(
        &self,
        id: i64,
        min: &str,
        max: Option<&str>,
    ) -> Result<BTreeMap<String, AttrMap>> {
        if !self.catalog.is_valid_entity_id(id) {
            return Err(ScorecardError::NotFound);
        }
        let single = max.map_or(true, |m| m == min);
        let (lo, hi) = self.validated_range(min, max)?;
        let conn = self.store.connect()?;
        let records = self.fetch_period_records(&conn, id, lo, hi)?;
        if single && records.is_empty() {
            return Err(ScorecardError::NotFound);
        }
        Ok(records)
    }

    /// Every attribute the store declares: the representative period's
    /// columns tagged `period`, then the global relation's columns tagged
    /// `global`. No cross-scope dedup; scope is part of identity.
    pub fn attribute_definitions(&self) -> Result<Vec<AttributeDef>> {
        let conn = self.store.connect()?;
        let mut defs = Vec::new();
        if let Some(period) = self.catalog.representative_period() {
            collect_column_defs(&conn, period.as_str(), AttrScope::Period, &mut defs)?;
        }
        collect_column_defs(
            &conn,
            &self.store.layout().global_table,
            AttrScope::Global,
            &mut defs,
        )?;
        Ok(defs)
    }

    /// For each period in the inclusive range, all `(entity_id, value)` pairs
    /// where `attribute` is non-null. Periods with no matching entities still
    /// appear, with an empty list.
    pub fn attribute_over_periods(
        &self,
        attribute: &str,
        min: &str,
        max: Option<&str>,
    ) -> Result<BTreeMap<String, Vec<AttributeValue>>> {
        let attr = self
            .catalog
            .attribute(attribute)
            .ok_or(ScorecardError::NotFound)?;
        let (lo, hi) = self.validated_range(min, max)?;
        let conn = self.store.connect()?;
        let mut all = BTreeMap::new();
        for year in lo..=hi {
            let Some(period) = self.catalog.period(&year.to_string()) else {
                continue;
            };
            all.insert(
                period.as_str().to_string(),
                self.fetch_attribute_values(&conn, attr, period.as_str())?,
            );
        }
        Ok(all)
    }

    /// All non-null global values of `attribute`, paired with entity ids.
    pub fn attribute_global(&self, attribute: &str) -> Result<Vec<AttributeValue>> {
        let attr = self
            .catalog
            .attribute(attribute)
            .ok_or(ScorecardError::NotFound)?;
        let conn = self.store.connect()?;
        self.fetch_attribute_values(&conn, attr, &self.store.layout().global_table)
    }

    /// Resolves and validates an inclusive period range. Both bounds must be
    /// catalog members and `min <= max`; any failure is NotFound, matching
    /// the deliberate validation/not-found conflation.
    fn validated_range(&self, min: &str, max: Option<&str>) -> Result<(i64, i64)> {
        let max = max.unwrap_or(min);
        let lo = self
            .catalog
            .period(min)
            .ok_or(ScorecardError::NotFound)?
            .value();
        let hi = self
            .catalog
            .period(max)
            .ok_or(ScorecardError::NotFound)?
            .value();
        if lo > hi {
            return Err(ScorecardError::NotFound);
        }
        Ok((lo, hi))
    }

    fn fetch_global_record(&self, conn: &Connection, id: i64) -> Result<Option<AttrMap>> {
        let layout = self.store.layout();
        self.fetch_entity_row(
            conn,
            &quote_ident(&layout.global_table),
            &layout.id_column,
            id,
        )
    }

    fn fetch_period_records(
        &self,
        conn: &Connection,
        id: i64,
        lo: i64,
        hi: i64,
    ) -> Result<BTreeMap<String, AttrMap>> {
        let id_column = &self.store.layout().id_column;
        let mut records = BTreeMap::new();
        for year in lo..=hi {
            let Some(period) = self.catalog.period(&year.to_string()) else {
                continue;
            };
            let table = quote_ident(period.as_str());
            if let Some(record) = self.fetch_entity_row(conn, &table, id_column, id)? {
                records.insert(period.as_str().to_string(), record);
            }
        }
        debug!("entity {id}: {} of {} periods present", records.len(), hi - lo + 1);
        Ok(records)
    }

    /// Fetches one entity row from `table` as an attribute map, skipping
    /// null values. `table` is pre-quoted and must come from the layout or a
    /// catalog [`Period`] token.
    fn fetch_entity_row(
        &self,
        conn: &Connection,
        table: &str,
        id_column: &str,
        id: i64,
    ) -> Result<Option<AttrMap>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {table} WHERE {} = ?1",
            quote_ident(id_column)
        ))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query([id])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut record = AttrMap::new();
        for (i, column) in columns.iter().enumerate() {
            if let Some(value) = value_to_json(row.get_ref(i)?) {
                record.insert(column.clone(), value);
            }
        }
        Ok(Some(record))
    }

    /// Selects all non-null `attr` values from `table` (a layout name or a
    /// catalog-validated period name).
    fn fetch_attribute_values(
        &self,
        conn: &Connection,
        attr: Attribute<'_>,
        table: &str,
    ) -> Result<Vec<AttributeValue>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {} FROM {} WHERE {} IS NOT NULL",
            quote_ident(&self.store.layout().id_column),
            attr.quoted(),
            quote_ident(table),
            attr.quoted(),
        ))?;
        let mut values = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let entity_id: i64 = row.get(0)?;
            if let Some(value) = value_to_json(row.get_ref(1)?) {
                values.push(AttributeValue { entity_id, value });
            }
        }
        Ok(values)
    }
}

/// Appends one [`AttributeDef`] per column of `table`, as declared by the
/// store's table metadata.
fn collect_column_defs(
    conn: &Connection,
    table: &str,
    scope: AttrScope,
    defs: &mut Vec<AttributeDef>,
) -> Result<()> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        defs.push(AttributeDef {
            name: row.get(1)?,
            declared_type: row.get(2)?,
            scope,
        });
    }
    Ok(())
}
