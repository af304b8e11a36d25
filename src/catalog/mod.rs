//! Plot queries and writes.
//!
//! The catalog is the only path between callers (HTTP handlers, viewer
//! sessions) and the store. Reads decode stored geometry through the
//! geometry codec; writes validate and encode before any store I/O, and
//! every successful write is published to the sync broadcaster.

use crate::geometry;
use crate::plot::{self, FeatureCollection, IndustryType, Plot, PlotInput, PlotType};
use crate::store::{PlotRecord, PlotRow, PlotStore, UpsertOutcome};
use crate::sync::{ClientMessage, PlotChanged, ServerMessage, SessionId, SyncBroadcaster};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

mod error;

pub use error::PlotError;

/// Plot query/upsert service shared by every request task
pub struct PlotCatalog {
    store: Arc<dyn PlotStore>,
    broadcaster: Arc<SyncBroadcaster>,
}

impl PlotCatalog {
    pub fn new(store: Arc<dyn PlotStore>, broadcaster: Arc<SyncBroadcaster>) -> Self {
        Self { store, broadcaster }
    }

    pub fn broadcaster(&self) -> &Arc<SyncBroadcaster> {
        &self.broadcaster
    }

    /// Every persisted plot. Callers must not rely on the order.
    pub async fn list_all(&self) -> Result<Vec<Plot>, PlotError> {
        let rows = self
            .store
            .query_all(None)
            .await
            .map_err(PlotError::from_read)?;
        Ok(decode_rows(rows))
    }

    /// Plots whose stored type equals `plot_type` exactly (case-sensitive).
    ///
    /// No match yields an empty list.
    pub async fn list_by_type(&self, plot_type: &str) -> Result<Vec<Plot>, PlotError> {
        let rows = self
            .store
            .query_all(Some(plot_type))
            .await
            .map_err(PlotError::from_read)?;
        Ok(decode_rows(rows))
    }

    /// Create (no `id`) or fully replace (existing `id`) a plot.
    ///
    /// The record is validated and its geometry encoded before the store is
    /// touched, so a rejected write leaves no partial row. On success the
    /// change is published to matching viewer sessions.
    pub async fn upsert(&self, input: PlotInput) -> Result<Plot, PlotError> {
        let plot_type = plot::validate(&input).map_err(PlotError::InvalidPlot)?;

        let PlotInput {
            id,
            name,
            area,
            status,
            disroad,
            diswater,
            elephase,
            geom,
            ..
        } = input;

        let geometry = geometry::from_value(geom).map_err(PlotError::MalformedGeometry)?;
        let record = PlotRecord {
            name,
            area,
            plot_type: plot_type.as_str().to_string(),
            status,
            disroad,
            diswater,
            elephase,
            geom: geometry::encode(&geometry).map_err(PlotError::MalformedGeometry)?,
        };

        let outcome = self
            .store
            .upsert(id, &record)
            .await
            .map_err(PlotError::from_write)?;

        let (plot_id, previous_type) = match outcome {
            UpsertOutcome::Created(plot_id) => (plot_id, None),
            UpsertOutcome::Updated { id, previous_type } => (id, Some(previous_type)),
            UpsertOutcome::Missing(id) => {
                warn!(plot_id = id, "Update for unknown plot rejected");
                return Err(PlotError::NotFound(id));
            }
        };

        let plot = Plot {
            id: plot_id,
            name: record.name,
            area: record.area,
            plot_type: plot_type.into(),
            status: record.status,
            disroad: record.disroad,
            diswater: record.diswater,
            elephase: record.elephase,
            geometry: geometry::decode(&record.geom).map_err(PlotError::MalformedGeometry)?,
        };

        let change = match previous_type {
            None => PlotChanged::created(plot.clone()),
            Some(previous) => PlotChanged::updated(plot.clone(), previous.parse().ok()),
        };

        info!(
            plot_id = plot.id,
            plot_type = %plot.plot_type,
            kind = %change.kind,
            "Plot saved"
        );

        self.broadcaster.publish(&change);
        Ok(plot)
    }

    /// Serve one viewer request.
    ///
    /// The response goes to the requesting session only. The request also
    /// records the session's filter for later change fan-out.
    pub async fn handle_request(&self, session_id: SessionId, message: ClientMessage) -> ServerMessage {
        match message {
            ClientMessage::GetAllPlots => {
                self.broadcaster.subscribe(session_id, None);
                match self.list_all().await {
                    Ok(plots) => ServerMessage::AllPlots(FeatureCollection::from_plots(&plots)),
                    Err(e) => {
                        error!(session_id = %session_id, error = %e, "Failed to fetch all plots");
                        ServerMessage::fetch_error()
                    }
                }
            }
            ClientMessage::GetPlotsByType(plot_type) => {
                match plot_type.parse::<IndustryType>() {
                    Ok(filter) => {
                        self.broadcaster.subscribe(session_id, Some(filter));
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Viewer requested unknown type");
                    }
                }
                match self.list_by_type(&plot_type).await {
                    Ok(plots) => ServerMessage::NewPlots(FeatureCollection::from_plots(&plots)),
                    Err(e) => {
                        error!(
                            session_id = %session_id,
                            plot_type = %plot_type,
                            error = %e,
                            "Failed to fetch plots by type"
                        );
                        ServerMessage::fetch_error()
                    }
                }
            }
        }
    }

    /// Disconnect every viewer and drain the store
    pub async fn shutdown(&self) {
        self.broadcaster.disconnect_all();
        self.store.close().await;
    }
}

/// Decode stored rows, skipping (and logging) rows whose geometry cannot be decoded
fn decode_rows(rows: Vec<PlotRow>) -> Vec<Plot> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            decode_row(row)
                .map_err(|e| warn!(plot_id = id, error = %e, "Skipping undecodable plot row"))
                .ok()
        })
        .collect()
}

fn decode_row(row: PlotRow) -> Result<Plot, PlotError> {
    let geometry = geometry::decode(&row.geom).map_err(PlotError::MalformedGeometry)?;
    let plot_type = PlotType::from(row.plot_type);
    if let PlotType::Other(ref tag) = plot_type {
        debug!(plot_id = row.id, plot_type = %tag, "Plot has an uncategorised type");
    }

    Ok(Plot {
        id: row.id,
        name: row.name,
        area: row.area,
        plot_type,
        status: row.status,
        disroad: row.disroad,
        diswater: row.diswater,
        elephase: row.elephase,
        geometry,
    })
}
