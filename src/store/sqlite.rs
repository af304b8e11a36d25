//! SQLite plot store for local runs and tests.
//!
//! SQLite has no geometry type, so the `geom` column holds the GeoJSON text
//! that PostGIS would produce with `ST_AsGeoJSON`.

use super::{PlotRecord, PlotRow, PlotStore, StoreError, PLOTS_TABLE};
use crate::plot::PlotId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Plot store backed by a single SQLite connection.
///
/// # Schema
/// ```sql
/// CREATE TABLE gis_data (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     name TEXT NOT NULL,
///     area REAL NOT NULL,
///     type TEXT NOT NULL,
///     status TEXT NOT NULL,
///     disroad REAL NOT NULL,
///     diswater REAL NOT NULL,
///     elephase REAL NOT NULL,
///     geom TEXT NOT NULL          -- GeoJSON geometry
/// );
/// ```
///
/// # Thread Safety
/// - Connection is wrapped in Mutex; each call holds it for one statement
///   (or one transaction for updates)
/// - `close` drops the connection; the slot stays `None` afterwards
pub struct SqlitePlotStore {
    conn: Mutex<Option<Connection>>,
}

impl SqlitePlotStore {
    /// Creates or opens a plot store.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (`:memory:` for tests)
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open database")?;

        conn.execute(
            &format!(
                r#"
                CREATE TABLE IF NOT EXISTS {PLOTS_TABLE} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    area REAL NOT NULL,
                    type TEXT NOT NULL,
                    status TEXT NOT NULL,
                    disroad REAL NOT NULL,
                    diswater REAL NOT NULL,
                    elephase REAL NOT NULL,
                    geom TEXT NOT NULL
                )
                "#
            ),
            [],
        )
        .context("Failed to create plots table")?;

        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS idx_{PLOTS_TABLE}_type ON {PLOTS_TABLE}(type)"),
            [],
        )
        .context("Failed to create index")?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Run a read against the open connection
    fn read<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T, StoreError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::QueryFailed("connection lock poisoned".to_string()))?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        op(conn).map_err(|e| StoreError::QueryFailed(format!("{:#}", e)))
    }

    /// Run a write against the open connection
    fn write<T>(&self, op: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T, StoreError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("connection lock poisoned".to_string()))?;
        let conn = guard.as_mut().ok_or(StoreError::Closed)?;
        op(conn).map_err(|e| StoreError::WriteFailed(format!("{:#}", e)))
    }
}

fn row_to_plot(row: &Row<'_>) -> rusqlite::Result<PlotRow> {
    Ok(PlotRow {
        id: row.get(0)?,
        name: row.get(1)?,
        area: row.get(2)?,
        plot_type: row.get(3)?,
        status: row.get(4)?,
        disroad: row.get(5)?,
        diswater: row.get(6)?,
        elephase: row.get(7)?,
        geom: row.get(8)?,
    })
}

const SELECT_COLUMNS: &str = "id, name, area, type, status, disroad, diswater, elephase, geom";

#[async_trait]
impl PlotStore for SqlitePlotStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn query_all(&self, plot_type: Option<&str>) -> Result<Vec<PlotRow>, StoreError> {
        self.read(|conn| {
            let rows = match plot_type {
                Some(plot_type) => {
                    let mut stmt = conn
                        .prepare(&format!(
                            "SELECT {SELECT_COLUMNS} FROM {PLOTS_TABLE} WHERE type = ?1 ORDER BY id"
                        ))
                        .context("Failed to prepare query")?;
                    let rows = stmt
                        .query_map(params![plot_type], row_to_plot)
                        .context("Failed to execute query")?
                        .collect::<rusqlite::Result<Vec<_>>>()
                        .context("Failed to read results")?;
                    rows
                }
                None => {
                    let mut stmt = conn
                        .prepare(&format!("SELECT {SELECT_COLUMNS} FROM {PLOTS_TABLE} ORDER BY id"))
                        .context("Failed to prepare query")?;
                    let rows = stmt
                        .query_map([], row_to_plot)
                        .context("Failed to execute query")?
                        .collect::<rusqlite::Result<Vec<_>>>()
                        .context("Failed to read results")?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    async fn insert(&self, record: &PlotRecord) -> Result<PlotId, StoreError> {
        self.write(|conn| {
            conn.execute(
                &format!(
                    r#"
                    INSERT INTO {PLOTS_TABLE} (name, area, type, status, disroad, diswater, elephase, geom)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#
                ),
                params![
                    record.name,
                    record.area,
                    record.plot_type,
                    record.status,
                    record.disroad,
                    record.diswater,
                    record.elephase,
                    record.geom,
                ],
            )
            .context("Failed to insert plot")?;

            Ok(conn.last_insert_rowid())
        })
    }

    async fn update(&self, id: PlotId, record: &PlotRecord) -> Result<Option<String>, StoreError> {
        self.write(|conn| {
            let tx = conn.transaction().context("Failed to begin transaction")?;

            let previous_type: Option<String> = tx
                .query_row(
                    &format!("SELECT type FROM {PLOTS_TABLE} WHERE id = ?1"),
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to look up plot")?;

            if previous_type.is_none() {
                return Ok(None);
            }

            tx.execute(
                &format!(
                    r#"
                    UPDATE {PLOTS_TABLE}
                    SET name = ?1, area = ?2, type = ?3, status = ?4,
                        disroad = ?5, diswater = ?6, elephase = ?7, geom = ?8
                    WHERE id = ?9
                    "#
                ),
                params![
                    record.name,
                    record.area,
                    record.plot_type,
                    record.status,
                    record.disroad,
                    record.diswater,
                    record.elephase,
                    record.geom,
                    id,
                ],
            )
            .context("Failed to update plot")?;

            tx.commit().context("Failed to commit update")?;
            Ok(previous_type)
        })
    }

    async fn close(&self) {
        if let Ok(mut guard) = self.conn.lock() {
            if guard.take().is_some() {
                info!("SQLite plot store closed");
            }
        }
    }
}
