//! PostGIS plot store.
//!
//! Geometry leaves the database through `ST_AsGeoJSON(geom)` and enters it
//! through `ST_GeomFromGeoJSON($n)`, so the codec only ever sees GeoJSON
//! text. Scalar columns are coalesced and cast so that legacy rows with
//! NULLs or NUMERIC columns still decode.

use super::{PlotRecord, PlotRow, PlotStore, StoreError, PLOTS_TABLE};
use crate::plot::PlotId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

/// Plot store backed by a PostGIS connection pool
pub struct PostgisPlotStore {
    pool: PgPool,
}

impl PostgisPlotStore {
    /// Create the connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        info!(max_connections = max_connections, "Connecting to PostGIS");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to connect to PostGIS")?;

        Ok(Self { pool })
    }

    /// Create the PostGIS extension and plots table if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(&self.pool)
            .await
            .context("Failed to enable PostGIS extension")?;

        sqlx::query(&create_table_sql())
            .execute(&self.pool)
            .await
            .context("Failed to create plots table")?;

        info!(table = PLOTS_TABLE, "PostGIS schema ready");
        Ok(())
    }
}

pub(crate) fn create_table_sql() -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {PLOTS_TABLE} (
            id SERIAL PRIMARY KEY,
            name TEXT,
            area DOUBLE PRECISION,
            type TEXT,
            status TEXT,
            disroad DOUBLE PRECISION,
            diswater DOUBLE PRECISION,
            elephase DOUBLE PRECISION,
            geom geometry(Geometry, 4326)
        )
        "#
    )
}

pub(crate) fn select_sql(filtered: bool) -> String {
    let filter = if filtered { "AND type = $1" } else { "" };
    format!(
        r#"
        SELECT id::bigint AS id,
               COALESCE(name, '') AS name,
               COALESCE(area, 0)::float8 AS area,
               COALESCE(type, '') AS type,
               COALESCE(status, '') AS status,
               COALESCE(disroad, 0)::float8 AS disroad,
               COALESCE(diswater, 0)::float8 AS diswater,
               COALESCE(elephase, 0)::float8 AS elephase,
               ST_AsGeoJSON(geom) AS geom
        FROM {PLOTS_TABLE}
        WHERE geom IS NOT NULL {filter}
        ORDER BY id
        "#
    )
}

pub(crate) fn insert_sql() -> String {
    format!(
        r#"
        INSERT INTO {PLOTS_TABLE} (name, area, type, status, disroad, diswater, elephase, geom)
        VALUES ($1, $2, $3, $4, $5, $6, $7, ST_GeomFromGeoJSON($8))
        RETURNING id::bigint
        "#
    )
}

/// Locks the existing row, replaces it, and returns its previous type.
/// Yields no row when the id does not exist.
pub(crate) fn update_sql() -> String {
    format!(
        r#"
        UPDATE {PLOTS_TABLE} AS plot
        SET name = $1, area = $2, type = $3, status = $4,
            disroad = $5, diswater = $6, elephase = $7,
            geom = ST_GeomFromGeoJSON($8)
        FROM (SELECT id, type FROM {PLOTS_TABLE} WHERE id = $9 FOR UPDATE) AS previous
        WHERE plot.id = previous.id
        RETURNING COALESCE(previous.type, '')
        "#
    )
}

fn row_to_plot(row: &PgRow) -> Result<PlotRow, sqlx::Error> {
    Ok(PlotRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        area: row.try_get("area")?,
        plot_type: row.try_get("type")?,
        status: row.try_get("status")?,
        disroad: row.try_get("disroad")?,
        diswater: row.try_get("diswater")?,
        elephase: row.try_get("elephase")?,
        geom: row.try_get("geom")?,
    })
}

#[async_trait]
impl PlotStore for PostgisPlotStore {
    fn backend(&self) -> &'static str {
        "postgis"
    }

    async fn query_all(&self, plot_type: Option<&str>) -> Result<Vec<PlotRow>, StoreError> {
        let sql = select_sql(plot_type.is_some());
        let mut query = sqlx::query(&sql);
        if let Some(plot_type) = plot_type {
            query = query.bind(plot_type);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(map_query_error)?;

        rows.iter()
            .map(row_to_plot)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_query_error)
    }

    async fn insert(&self, record: &PlotRecord) -> Result<PlotId, StoreError> {
        let sql = insert_sql();
        let row = sqlx::query(&sql)
            .bind(&record.name)
            .bind(record.area)
            .bind(&record.plot_type)
            .bind(&record.status)
            .bind(record.disroad)
            .bind(record.diswater)
            .bind(record.elephase)
            .bind(&record.geom)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        row.try_get::<i64, _>(0).map_err(map_write_error)
    }

    async fn update(&self, id: PlotId, record: &PlotRecord) -> Result<Option<String>, StoreError> {
        let sql = update_sql();
        let row = sqlx::query(&sql)
            .bind(&record.name)
            .bind(record.area)
            .bind(&record.plot_type)
            .bind(&record.status)
            .bind(record.disroad)
            .bind(record.diswater)
            .bind(record.elephase)
            .bind(&record.geom)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;

        row.map(|row| row.try_get::<String, _>(0))
            .transpose()
            .map_err(map_write_error)
    }

    async fn close(&self) {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("PostGIS connection pool drained");
        }
    }
}

fn map_query_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolClosed => StoreError::Closed,
        other => StoreError::QueryFailed(other.to_string()),
    }
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolClosed => StoreError::Closed,
        other => StoreError::WriteFailed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_reads_geometry_as_geojson() {
        let sql = select_sql(false);
        assert!(sql.contains("ST_AsGeoJSON(geom) AS geom"));
        assert!(sql.contains("FROM gis_data"));
        assert!(!sql.contains("$1"));
    }

    #[test]
    fn test_filtered_select_binds_type() {
        let sql = select_sql(true);
        assert!(sql.contains("AND type = $1"));
    }

    #[test]
    fn test_writes_build_geometry_from_geojson() {
        assert!(insert_sql().contains("ST_GeomFromGeoJSON($8)"));
        assert!(insert_sql().contains("RETURNING id"));

        let update = update_sql();
        assert!(update.contains("ST_GeomFromGeoJSON($8)"));
        assert!(update.contains("WHERE id = $9 FOR UPDATE"));
        assert!(update.contains("RETURNING COALESCE(previous.type, '')"));
    }

    #[test]
    fn test_pool_closed_maps_to_closed() {
        assert_eq!(map_query_error(sqlx::Error::PoolClosed), StoreError::Closed);
        assert_eq!(map_write_error(sqlx::Error::PoolClosed), StoreError::Closed);
        assert!(matches!(
            map_write_error(sqlx::Error::RowNotFound),
            StoreError::WriteFailed(_)
        ));
    }
}
