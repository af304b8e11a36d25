// Integration tests for the viewer WebSocket channel
//
// The router is served on an ephemeral local port and driven with a real
// WebSocket client, so upgrade, framing and session cleanup all run as in
// production.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use futures::{SinkExt, StreamExt};
use geoallot::{
    api::{create_app, create_ws_router, AppState, WsAppState},
    catalog::PlotCatalog,
    plot::PlotInput,
    store::SqlitePlotStore,
    sync::SyncBroadcaster,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type ViewerSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

fn make_catalog() -> Arc<PlotCatalog> {
    let store = SqlitePlotStore::open(":memory:").unwrap();
    Arc::new(PlotCatalog::new(
        Arc::new(store),
        Arc::new(SyncBroadcaster::new(8)),
    ))
}

fn make_app(catalog: &Arc<PlotCatalog>) -> Router {
    let state = AppState {
        catalog: Arc::clone(catalog),
        max_body_bytes: 1024 * 1024,
    };
    create_app(state, "*")
}

/// Serve the full app on 127.0.0.1:0 and return its address
async fn spawn_server(catalog: &Arc<PlotCatalog>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = make_app(catalog);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect_viewer(addr: SocketAddr) -> ViewerSocket {
    let (socket, _response) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    socket
}

fn plot_json(name: &str, plot_type: &str) -> Value {
    json!({
        "name": name,
        "area": 2.5,
        "type": plot_type,
        "status": "available",
        "disroad": 10.0,
        "diswater": 20.0,
        "elephase": 3,
        "geom": {
            "type": "Polygon",
            "coordinates": [[[78.4, 17.3], [78.5, 17.3], [78.5, 17.4], [78.4, 17.3]]]
        }
    })
}

async fn next_frame(socket: &mut ViewerSocket) -> Message {
    tokio::time::timeout(FRAME_TIMEOUT, socket.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("socket closed")
        .unwrap()
}

/// Next JSON envelope, skipping control frames
async fn next_event(socket: &mut ViewerSocket) -> Value {
    loop {
        match next_frame(socket).await {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Expected a text frame, got {:?}", other),
        }
    }
}

async fn send_event(socket: &mut ViewerSocket, event: Value) {
    socket.send(Message::Text(event.to_string())).await.unwrap();
}

// ── Request / response ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_all_plots_returns_all_plots_event() {
    let catalog = make_catalog();
    let input: PlotInput = serde_json::from_value(plot_json("A", "IT")).unwrap();
    let plot = catalog.upsert(input).await.unwrap();
    let addr = spawn_server(&catalog).await;
    let mut socket = connect_viewer(addr).await;

    send_event(&mut socket, json!({"event": "get-all-plots"})).await;
    let reply = next_event(&mut socket).await;

    assert_eq!(reply["event"], "all-plots");
    assert_eq!(reply["data"]["type"], "FeatureCollection");
    assert_eq!(reply["data"]["features"][0]["properties"]["id"], json!(plot.id));
}

#[tokio::test]
async fn test_get_plots_by_type_returns_new_plots_event() {
    let catalog = make_catalog();
    for (name, plot_type) in [("A", "chemical"), ("B", "textile")] {
        let input: PlotInput = serde_json::from_value(plot_json(name, plot_type)).unwrap();
        catalog.upsert(input).await.unwrap();
    }
    let addr = spawn_server(&catalog).await;
    let mut socket = connect_viewer(addr).await;

    send_event(
        &mut socket,
        json!({"event": "get-plots-by-type", "data": "textile"}),
    )
    .await;
    let reply = next_event(&mut socket).await;

    assert_eq!(reply["event"], "new-plots");
    let features = reply["data"]["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["properties"]["type"], "textile");
}

#[tokio::test]
async fn test_bad_frame_gets_fixed_error_event() {
    let catalog = make_catalog();
    let addr = spawn_server(&catalog).await;
    let mut socket = connect_viewer(addr).await;

    send_event(&mut socket, json!({"event": "bogus"})).await;
    let reply = next_event(&mut socket).await;

    assert_eq!(reply, json!({"event": "error", "data": "Unrecognised request."}));

    // The session survives a bad frame
    send_event(&mut socket, json!({"event": "get-all-plots"})).await;
    assert_eq!(next_event(&mut socket).await["event"], "all-plots");
}

#[tokio::test]
async fn test_ping_is_answered_with_pong() {
    let catalog = make_catalog();
    let addr = spawn_server(&catalog).await;
    let mut socket = connect_viewer(addr).await;

    socket.send(Message::Ping(vec![7, 7, 7])).await.unwrap();

    match next_frame(&mut socket).await {
        Message::Pong(payload) => assert_eq!(payload, vec![7, 7, 7]),
        other => panic!("Expected pong, got {:?}", other),
    }
}

// ── Change fan-out ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_write_is_pushed_to_connected_viewer() {
    let catalog = make_catalog();
    let addr = spawn_server(&catalog).await;
    let mut socket = connect_viewer(addr).await;

    // Filter on another type; the change is still delivered
    send_event(
        &mut socket,
        json!({"event": "get-plots-by-type", "data": "textile"}),
    )
    .await;
    assert_eq!(next_event(&mut socket).await["event"], "new-plots");

    let response = make_app(&catalog)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/add-plot")
                .header("Content-Type", "application/json")
                .body(Body::from(plot_json("Chem", "chemical").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let pushed = next_event(&mut socket).await;
    assert_eq!(pushed["event"], "new-plots");
    assert_eq!(pushed["data"]["features"][0]["properties"]["name"], "Chem");
    assert_eq!(pushed["data"]["features"][0]["properties"]["type"], "chemical");
}

// ── Session cleanup ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_close_removes_session() {
    let catalog = make_catalog();
    let addr = spawn_server(&catalog).await;
    let mut socket = connect_viewer(addr).await;

    // A round trip guarantees the session is registered
    send_event(&mut socket, json!({"event": "get-all-plots"})).await;
    next_event(&mut socket).await;
    assert_eq!(catalog.broadcaster().session_count(), 1);

    socket.close(None).await.unwrap();

    tokio::time::timeout(FRAME_TIMEOUT, async {
        while catalog.broadcaster().session_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session was not removed after close");
}

#[tokio::test]
async fn test_plain_get_is_not_upgraded() {
    let app = create_ws_router(WsAppState {
        catalog: make_catalog(),
    });

    let resp = app
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_ne!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.status().is_client_error());
}
