//! Transactional repository layer over SQLite.
//!
//! Each call opens its own `rusqlite::Connection` against the configured
//! path rather than holding one open across awaits — the same pattern
//! `UserStore` uses for its users/api_keys tables. WAL mode lets these
//! short-lived connections interleave reads with the rare writer without
//! blocking. Capabilities are grouped into narrow traits per consumer
//! (e.g. the lifecycle engine only needs `DocumentRepository`, a signal
//! generator only needs `FactRepository` + `MetricRepository` +
//! `SignalRepository`) so a test double only has to implement what it
//! actually exercises.

mod backfill;
mod candles;
mod documents;
mod events;
mod facts;
mod instruments;
mod markets;
mod metrics;
mod relationships;
pub mod schema;
mod signals;

pub use backfill::*;
pub use candles::*;
pub use documents::*;
pub use events::*;
pub use facts::*;
pub use instruments::*;
pub use markets::*;
pub use metrics::*;
pub use relationships::*;
pub use signals::*;

use rusqlite::Connection;

#[derive(Clone)]
pub struct Store {
    db_path: String,
}

impl Store {
    pub fn new(db_path: impl Into<String>) -> anyhow::Result<Self> {
        let db_path = db_path.into();
        let store = Self { db_path };
        let conn = store.conn()?;
        schema::initialize(&conn)?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.db_path)
    }
}
