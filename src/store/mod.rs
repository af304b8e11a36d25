//! Persistent plot storage.
//!
//! The store owns all persisted plot state. Geometry crosses this boundary as
//! GeoJSON text only; decoding into structured geometry happens in the
//! catalog through the geometry codec.
//!
//! # Backends
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       PlotStore (trait)                  │
//! │  - query_all / insert / update / close   │
//! └─────────────────────────────────────────┘
//!          ↓                    ↓
//! ┌──────────────────┐  ┌──────────────────────┐
//! │ PostgisPlotStore │  │ SqlitePlotStore       │
//! │ - sqlx PgPool    │  │ - rusqlite connection │
//! │ - ST_AsGeoJSON   │  │ - GeoJSON TEXT column │
//! └──────────────────┘  └──────────────────────┘
//! ```
//!
//! Both backends use the `gis_data` table layout of existing deployments.
//! Every write is a single-row statement; updates check for the row's
//! existence in the same statement (PostGIS) or transaction (SQLite).

use crate::config::{StoreBackend, StoreConfig};
use crate::plot::PlotId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::info;

mod postgis;
mod sqlite;

pub use postgis::PostgisPlotStore;
pub use sqlite::SqlitePlotStore;

/// Table holding one row per plot
pub const PLOTS_TABLE: &str = "gis_data";

/// A plot row as read from the store, geometry still encoded
#[derive(Clone, Debug, PartialEq)]
pub struct PlotRow {
    pub id: PlotId,
    pub name: String,
    pub area: f64,
    pub plot_type: String,
    pub status: String,
    pub disroad: f64,
    pub diswater: f64,
    pub elephase: f64,
    /// GeoJSON geometry text
    pub geom: String,
}

/// Column values for a write, geometry already encoded as GeoJSON text
#[derive(Clone, Debug, PartialEq)]
pub struct PlotRecord {
    pub name: String,
    pub area: f64,
    pub plot_type: String,
    pub status: String,
    pub disroad: f64,
    pub diswater: f64,
    pub elephase: f64,
    pub geom: String,
}

/// Result of [`PlotStore::upsert`]
#[derive(Clone, Debug, PartialEq)]
pub enum UpsertOutcome {
    /// A new row was inserted with this id
    Created(PlotId),
    /// An existing row was replaced; carries the `type` it had before
    Updated { id: PlotId, previous_type: String },
    /// No row with this id exists; nothing was written
    Missing(PlotId),
}

/// Store failures
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    QueryFailed(String),
    WriteFailed(String),
    /// The store has been closed (shutdown in progress)
    Closed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::QueryFailed(msg) => write!(f, "query failed: {}", msg),
            StoreError::WriteFailed(msg) => write!(f, "write failed: {}", msg),
            StoreError::Closed => write!(f, "store is closed"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Relational store of plots.
///
/// Implementations are shared across all request tasks; each call checks a
/// connection out and returns it on both success and failure.
#[async_trait]
pub trait PlotStore: Send + Sync {
    /// Backend name for logging
    fn backend(&self) -> &'static str;

    /// All rows, or only rows whose `type` equals `plot_type` exactly
    async fn query_all(&self, plot_type: Option<&str>) -> Result<Vec<PlotRow>, StoreError>;

    /// Inserts a row and returns the id the store assigned
    async fn insert(&self, record: &PlotRecord) -> Result<PlotId, StoreError>;

    /// Replaces every column of row `id`.
    ///
    /// Returns the row's previous `type`, or `None` when no row has that id
    /// (in which case nothing is written).
    async fn update(&self, id: PlotId, record: &PlotRecord) -> Result<Option<String>, StoreError>;

    /// Releases every connection. Later calls fail with [`StoreError::Closed`].
    async fn close(&self);

    /// Insert when `id` is `None`, full-record replace otherwise
    async fn upsert(
        &self,
        id: Option<PlotId>,
        record: &PlotRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        match id {
            None => self.insert(record).await.map(UpsertOutcome::Created),
            Some(id) => Ok(match self.update(id, record).await? {
                Some(previous_type) => UpsertOutcome::Updated { id, previous_type },
                None => UpsertOutcome::Missing(id),
            }),
        }
    }
}

/// Opens the configured backend (pool init on startup)
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn PlotStore>> {
    let store: Arc<dyn PlotStore> = match config.backend {
        StoreBackend::Sqlite => {
            let store = SqlitePlotStore::open(&config.sqlite_path)
                .with_context(|| format!("Failed to open SQLite store at {}", config.sqlite_path))?;
            Arc::new(store)
        }
        StoreBackend::Postgis => {
            let store =
                PostgisPlotStore::connect(&config.database_url, config.max_connections).await?;
            if config.ensure_schema {
                store.ensure_schema().await?;
            }
            Arc::new(store)
        }
    };

    info!(backend = store.backend(), "Plot store ready");
    Ok(store)
}
