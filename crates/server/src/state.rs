//! Shared request-handler state.

use scorecard::QueryEngine;

/// State shared by every handler: just the engine, which carries the
/// immutable catalog and the store path. Built once before the listener
/// starts accepting, read-only afterwards.
pub struct AppState {
    pub engine: QueryEngine,
}

impl AppState {
    pub fn new(engine: QueryEngine) -> Self {
        Self { engine }
    }
}
