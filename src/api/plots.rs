use crate::catalog::{PlotCatalog, PlotError};
use crate::plot::{FeatureCollection, PlotId, PlotInput};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared state for the plot HTTP API
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<PlotCatalog>,
    /// Largest accepted `POST /add-plot` body
    pub max_body_bytes: usize,
}

/// Query parameters for plot listing
#[derive(Deserialize)]
pub struct PlotQueryParams {
    /// Exact industry type tag (e.g. `?type=chemical`)
    #[serde(rename = "type")]
    pub plot_type: Option<String>,
}

/// Success response for plot upsert
#[derive(Debug, Serialize)]
pub struct AddPlotResponse {
    pub id: PlotId,
}

/// Create plot API router
pub fn create_plot_router(state: AppState) -> Router {
    let body_limit = state.max_body_bytes;
    Router::new()
        .route("/", get(health))
        .route("/get-plots", get(get_plots))
        .route("/add-plot", post(add_plot))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(Arc::new(state))
}

/// GET / - Liveness check
async fn health() -> Json<&'static str> {
    Json("server is running")
}

/// GET /get-plots - Feature collection of all plots
///
/// Query parameters:
/// - `type`: only plots of this industry type (exact, case-sensitive match)
async fn get_plots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlotQueryParams>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let plots = match params.plot_type {
        Some(ref plot_type) => state.catalog.list_by_type(plot_type).await,
        None => state.catalog.list_all().await,
    }
    .map_err(ApiError::Query)?;

    Ok(Json(FeatureCollection::from_plots(&plots)))
}

/// POST /add-plot - Create a plot (no `id`) or replace an existing one
async fn add_plot(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AddPlotResponse>, ApiError> {
    if body.len() > state.max_body_bytes {
        return Err(ApiError::PayloadTooLarge);
    }

    let input: PlotInput = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejected unparseable plot body");
        ApiError::Write(PlotError::InvalidBody(e.to_string()))
    })?;

    let plot = state.catalog.upsert(input).await.map_err(ApiError::Write)?;

    info!(plot_id = plot.id, "Plot upsert accepted");
    Ok(Json(AddPlotResponse { id: plot.id }))
}

/// Plot API error types, answered with a fixed plain-text body
#[derive(Debug)]
enum ApiError {
    Query(PlotError),
    Write(PlotError),
    PayloadTooLarge,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Query(e) => {
                error!(error = %e, "Plot query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error querying the database")
            }
            ApiError::Write(PlotError::NotFound(id)) => {
                warn!(plot_id = id, "Plot not found");
                (StatusCode::NOT_FOUND, "Plot not found")
            }
            ApiError::Write(e) => {
                error!(error = %e, "Plot write failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error saving to the database")
            }
            ApiError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"),
        };

        (status, error_message).into_response()
    }
}
