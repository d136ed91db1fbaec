//! In-process fleet server for tests.
//!
//! Serves the REST endpoints and the `/ws` push route on `127.0.0.1:0`:
//! - records every request line (`GET /api/bikes?x=1`)
//! - can be switched to answer with an HTML page or an undecodable body
//! - records inbound WebSocket frames and pushes frames on demand
//!
//! Accounts: `alice` / `secret` (rider, token `abc`) and `root` / `admin-pass`
//! (admin, token `admin-token`). Username `bob` is already registered.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const RIDER_TOKEN: &str = "abc";
const ADMIN_TOKEN: &str = "admin-token";

#[derive(Debug, Clone)]
struct MockBike {
    bike_id: String,
    bike_name: String,
    bike_model: String,
    helmet_id: Option<String>,
    is_active: bool,
    ignition_blocked: bool,
}

impl MockBike {
    fn to_json(&self) -> Value {
        json!({
            "_id": format!("oid-{}", self.bike_id),
            "bikeId": self.bike_id,
            "bikeName": self.bike_name,
            "bikeModel": self.bike_model,
            "helmetId": self.helmet_id,
            "ownerId": {"username": "alice", "email": "alice@example.com"},
            "isActive": self.is_active,
            "ignitionBlocked": self.ignition_blocked,
        })
    }
}

struct MockState {
    requests: Mutex<Vec<String>>,
    serve_html: AtomicBool,
    serve_garbage: AtomicBool,
    bikes: Mutex<Vec<MockBike>>,
    frames: mpsc::UnboundedSender<String>,
    pushes: broadcast::Sender<String>,
}

/// Running mock server; stopped on drop
pub struct MockFleet {
    pub base_url: String,
    pub ws_url: String,
    state: Arc<MockState>,
    frames: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    server: JoinHandle<()>,
}

impl MockFleet {
    pub async fn start() -> Self {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (pushes, _) = broadcast::channel(64);

        let state = Arc::new(MockState {
            requests: Mutex::new(Vec::new()),
            serve_html: AtomicBool::new(false),
            serve_garbage: AtomicBool::new(false),
            bikes: Mutex::new(vec![
                MockBike {
                    bike_id: "BIKE123".to_string(),
                    bike_name: "Red Scooter".to_string(),
                    bike_model: "Activa".to_string(),
                    helmet_id: None,
                    is_active: true,
                    ignition_blocked: false,
                },
                MockBike {
                    bike_id: "BIKE456".to_string(),
                    bike_name: "Blue Cruiser".to_string(),
                    bike_model: String::new(),
                    helmet_id: Some("HELMET1".to_string()),
                    is_active: false,
                    ignition_blocked: false,
                },
            ]),
            frames: frames_tx,
            pushes,
        });

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/analytics/dashboard", get(dashboard))
            .route("/api/analytics/fleet", get(fleet))
            .route("/api/analytics/timeseries", get(timeseries))
            .route("/api/bikes", get(list_bikes).post(create_bike))
            .route("/api/users", get(list_users))
            .route("/api/admin/bike/:bike_id/ignition", post(ignition))
            .route("/api/admin/pair", post(pair))
            .route("/api/alerts", get(alerts))
            .route("/ws", get(ws_upgrade))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            ws_url: format!("ws://{}/ws", addr),
            state,
            frames: tokio::sync::Mutex::new(frames_rx),
            server,
        }
    }

    /// Request lines received so far, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().clone()
    }

    pub fn serve_html(&self, on: bool) {
        self.state.serve_html.store(on, Ordering::SeqCst);
    }

    pub fn serve_garbage(&self, on: bool) {
        self.state.serve_garbage.store(on, Ordering::SeqCst);
    }

    /// Next text frame a client sent on `/ws`
    pub async fn next_ws_frame(&self) -> String {
        let mut frames = self.frames.lock().await;
        tokio::time::timeout(Duration::from_secs(5), frames.recv())
            .await
            .expect("no WebSocket frame within 5s")
            .expect("frame channel closed")
    }

    /// Send a text frame to every connected client
    pub fn push(&self, text: &str) {
        let _ = self.state.pushes.send(text.to_string());
    }
}

impl Drop for MockFleet {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn record(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    let uri = request.uri();
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    state
        .requests
        .lock()
        .push(format!("{} {}", request.method(), target));

    if state.serve_html.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_GATEWAY,
            Html("<html><body><h1>502 Bad Gateway</h1></body></html>"),
        )
            .into_response();
    }
    if state.serve_garbage.load(Ordering::SeqCst) {
        return (StatusCode::OK, [(CONTENT_TYPE, "application/json")], "{\"users\": [").into_response();
    }

    next.run(request).await
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

/// `Err` carries the rejection to return as-is
fn authorize(headers: &HeaderMap, admin: bool) -> Result<(), Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(ADMIN_TOKEN) => Ok(()),
        Some(RIDER_TOKEN) if !admin => Ok(()),
        Some(RIDER_TOKEN) => Err(reply(
            StatusCode::FORBIDDEN,
            json!({"error": "Admin access required"}),
        )),
        _ => Err(reply(
            StatusCode::UNAUTHORIZED,
            json!({"msg": "Token has expired"}),
        )),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    if username.is_empty() || password.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"ok": false, "error": "missing"}),
        );
    }

    match (username, password) {
        ("alice", "secret") => reply(
            StatusCode::OK,
            json!({
                "ok": true,
                "token": RIDER_TOKEN,
                "user": {"id": "u1", "username": "alice", "role": "rider", "email": "alice@example.com"}
            }),
        ),
        ("root", "admin-pass") => reply(
            StatusCode::OK,
            json!({
                "ok": true,
                "token": ADMIN_TOKEN,
                "user": {"id": "u0", "username": "root", "role": "admin"}
            }),
        ),
        _ => reply(
            StatusCode::UNAUTHORIZED,
            json!({"ok": false, "error": "invalid"}),
        ),
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    if username == "bob" {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"ok": false, "error": "exists", "message": "Username 'bob' already exists"}),
        );
    }
    reply(
        StatusCode::CREATED,
        json!({"ok": true, "user": {"id": "u9", "username": username}, "message": "User registered successfully"}),
    )
}

async fn dashboard(headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&headers, false) {
        return rejection;
    }
    reply(
        StatusCode::OK,
        json!({"summary": {
            "totalRides": 24,
            "successfulRides": 20,
            "helmetAttempts": 3,
            "alcoholAttempts": 1,
            "helmetViolations": 3,
            "alcoholDetections": 1
        }}),
    )
}

async fn fleet(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&headers, true) {
        return rejection;
    }
    let bikes = state.bikes.lock().clone();
    let active = bikes.iter().filter(|b| b.is_active).count();
    let entries: Vec<Value> = bikes
        .iter()
        .map(|bike| {
            let mut entry = bike.to_json();
            entry["stats"] = json!({
                "totalRides": 10,
                "successfulRides": 8,
                "successRate": 80.0,
                "activeAlerts": 1
            });
            entry
        })
        .collect();

    reply(
        StatusCode::OK,
        json!({"totalBikes": bikes.len(), "activeBikes": active, "bikes": entries}),
    )
}

async fn timeseries(headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&headers, false) {
        return rejection;
    }
    reply(
        StatusCode::OK,
        json!({"timeseries": [
            {"date": "2024-03-01T08:15:00", "helmetWorn": true, "alcoholDetected": false},
            {"date": "2024-03-01T18:40:00", "helmetWorn": false, "alcoholDetected": false},
            {"date": "2024-03-02T09:05:00", "helmetWorn": true, "alcoholDetected": true}
        ]}),
    )
}

async fn list_bikes(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&headers, false) {
        return rejection;
    }
    let bikes: Vec<Value> = state.bikes.lock().iter().map(MockBike::to_json).collect();
    reply(StatusCode::OK, Value::Array(bikes))
}

async fn create_bike(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&headers, true) {
        return rejection;
    }
    let bike_id = body["bikeId"].as_str().unwrap_or_default().to_string();
    if bike_id.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"error": "bikeId is required"}),
        );
    }

    let mut bikes = state.bikes.lock();
    if bikes.iter().any(|b| b.bike_id == bike_id) {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({"error": "Bike ID already exists"}),
        );
    }

    let bike = MockBike {
        bike_id,
        bike_name: body["bikeName"].as_str().unwrap_or_default().to_string(),
        bike_model: body["bikeModel"].as_str().unwrap_or_default().to_string(),
        helmet_id: None,
        is_active: true,
        ignition_blocked: false,
    };
    let created = bike.to_json();
    bikes.push(bike);
    reply(StatusCode::CREATED, created)
}

async fn list_users(headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&headers, true) {
        return rejection;
    }
    reply(
        StatusCode::OK,
        json!([
            {"username": "alice", "email": "alice@example.com", "role": "rider", "isActive": true, "createdAt": "2024-01-15T10:30:00"},
            {"username": "root", "role": "admin", "isActive": true, "createdAt": "Mon, 01 Jan 2024 00:00:00 GMT"}
        ]),
    )
}

async fn ignition(
    State(state): State<Arc<MockState>>,
    Path(bike_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&headers, true) {
        return rejection;
    }
    let block = body["block"].as_bool().unwrap_or(false);

    let mut bikes = state.bikes.lock();
    match bikes.iter_mut().find(|b| b.bike_id == bike_id) {
        Some(bike) => {
            bike.ignition_blocked = block;
            reply(
                StatusCode::OK,
                json!({
                    "ok": true,
                    "bikeId": bike_id,
                    "ignitionBlocked": block,
                    "message": format!("Ignition {}", if block { "blocked" } else { "allowed" })
                }),
            )
        }
        None => reply(StatusCode::NOT_FOUND, json!({"error": "Bike not found"})),
    }
}

async fn pair(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = authorize(&headers, true) {
        return rejection;
    }
    let bike_id = body["bikeId"].as_str().unwrap_or_default().to_string();
    let helmet_id = body["helmetId"].as_str().unwrap_or_default().to_string();

    let mut bikes = state.bikes.lock();
    match bikes.iter_mut().find(|b| b.bike_id == bike_id) {
        Some(bike) => {
            bike.helmet_id = Some(helmet_id.clone());
            reply(
                StatusCode::OK,
                json!({"ok": true, "bikeId": bike_id, "helmetId": helmet_id, "message": "Helmet paired successfully"}),
            )
        }
        None => reply(StatusCode::NOT_FOUND, json!({"error": "Bike not found"})),
    }
}

async fn alerts(headers: HeaderMap) -> Response {
    if let Err(rejection) = authorize(&headers, false) {
        return rejection;
    }
    reply(
        StatusCode::OK,
        json!([{
            "_id": "a1",
            "bikeId": "BIKE123",
            "type": "helmetAttempt",
            "message": "Ignition attempted without helmet",
            "timestamp": "2024-03-02T09:00:00",
            "resolved": false
        }]),
    )
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<MockState>>) -> Response {
    ws.on_upgrade(move |socket| ws_session(socket, state))
}

async fn ws_session(socket: WebSocket, state: Arc<MockState>) {
    let mut pushes = state.pushes.subscribe();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = state.frames.send(text);
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            push = pushes.recv() => match push {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
