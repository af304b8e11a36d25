use crate::catalog::PlotCatalog;
use crate::sync::broadcaster::SessionId;
use crate::sync::protocol::{ClientMessage, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Drives a single viewer WebSocket connection
pub struct ConnectionManager {
    session_id: SessionId,
    catalog: Arc<PlotCatalog>,
    /// Change notifications queued for this session by the broadcaster
    outbound: mpsc::Receiver<ServerMessage>,
}

impl ConnectionManager {
    /// Register a new session with the broadcaster
    pub fn new(catalog: Arc<PlotCatalog>) -> Self {
        let (session_id, outbound) = catalog.broadcaster().connect();
        Self {
            session_id,
            catalog,
            outbound,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(mut self, mut socket: WebSocket) {
        info!(session_id = %self.session_id, "WebSocket connection established");

        loop {
            tokio::select! {
                // Handle incoming viewer requests
                msg = socket.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = self.handle_client_message(&mut socket, &text).await {
                                error!(session_id = %self.session_id, error = %e, "Failed to answer viewer request");
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!(session_id = %self.session_id, "WebSocket client disconnected");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Ignore binary, pong messages
                        }
                        Some(Err(e)) => {
                            warn!(session_id = %self.session_id, error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                // Forward change notifications from the broadcaster
                queued = self.outbound.recv() => {
                    match queued {
                        Some(message) => {
                            if let Err(e) = send_message(&mut socket, &message).await {
                                error!(session_id = %self.session_id, error = %e, "Failed to push change");
                                break;
                            }
                        }
                        None => {
                            // Session removed by the server (shutdown)
                            let _ = socket.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
            }
        }

        self.catalog.broadcaster().disconnect(self.session_id);
        info!(session_id = %self.session_id, "WebSocket connection closed");
    }

    /// Answer one viewer frame on this socket only
    async fn handle_client_message(&self, socket: &mut WebSocket, text: &str) -> anyhow::Result<()> {
        let response = self.respond(text).await;
        send_message(socket, &response).await
    }

    /// Response to one viewer text frame. Parse failures are logged here and
    /// answered with a fixed message.
    pub(crate) async fn respond(&self, text: &str) -> ServerMessage {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(request) => self.catalog.handle_request(self.session_id, request).await,
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Unrecognised viewer message");
                ServerMessage::unrecognised_request()
            }
        }
    }
}

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> anyhow::Result<()> {
    let json = serde_json::to_string(message)?;
    socket.send(Message::Text(json)).await?;
    Ok(())
}
