use crate::catalog::PlotCatalog;
use crate::sync::ConnectionManager;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::info;

/// Shared application state for WebSocket handler
#[derive(Clone)]
pub struct WsAppState {
    pub catalog: Arc<PlotCatalog>,
}

/// GET /ws - Viewer channel upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsAppState>>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Create WebSocket router
pub fn create_ws_router(state: WsAppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(Arc::new(state))
}

/// Each socket gets its own session in the broadcaster
async fn handle_socket(socket: WebSocket, state: Arc<WsAppState>) {
    let manager = ConnectionManager::new(Arc::clone(&state.catalog));
    manager.handle(socket).await;
}
