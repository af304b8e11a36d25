// HTTP and WebSocket APIs

pub mod plots;
pub mod websocket;

pub use plots::{create_plot_router, AddPlotResponse, AppState, PlotQueryParams};
pub use websocket::{create_ws_router, ws_handler, WsAppState};

use axum::{http::HeaderValue, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Full application router: plot HTTP API plus the viewer WebSocket channel
pub fn create_app(state: AppState, cors_origin: &str) -> Router {
    let ws_state = WsAppState {
        catalog: state.catalog.clone(),
    };

    create_plot_router(state)
        .merge(create_ws_router(ws_state))
        .layer(cors_layer(cors_origin))
}

/// CORS for the configured origin; `*` allows any origin
fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origin == "*" {
        return layer.allow_origin(Any);
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!(origin = %origin, "Invalid CORS origin, allowing any origin");
            layer.allow_origin(Any)
        }
    }
}
