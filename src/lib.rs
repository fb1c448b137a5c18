//! Schema-driven validation and query engine for period-partitioned tabular
//! datasets backed by SQLite.
//!
//! The store holds one global relation keyed by an integer entity id plus one
//! relation per reporting period, each keyed by the same id. Because relation
//! and column names cannot travel as bound parameters, the crate introspects
//! the store once at startup into an immutable [`Catalog`] whitelist and lets
//! query text reference only names that have proven membership in it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use scorecard::{Catalog, QueryEngine, Store};
//!
//! let store = Store::open("data/scorecard.sqlite");
//! let catalog = Arc::new(Catalog::build(&store)?);
//! let engine = QueryEngine::new(store, catalog);
//!
//! for entity in engine.list_entities()? {
//!     println!("{}: {}", entity.id, entity.name);
//! }
//! # Ok::<(), scorecard::ScorecardError>(())
//! ```

pub mod catalog;
pub mod engine;
pub mod error;
pub mod store;
pub mod types;

pub use catalog::{Attribute, Catalog, Period};
pub use engine::QueryEngine;
pub use error::{Result, ScorecardError};
pub use store::{Store, StoreLayout};
pub use types::{AttrMap, AttrScope, AttributeDef, AttributeValue, EntityRef, MergedEntity};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
