//! Mock dashboard server for contract testing
//!
//! Serves the four endpoints the client talks to. Every request must carry
//! the anti-forgery header; requests without it get 403 like the real server.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

pub const CSRF_HEADER: &str = "X-CSRFToken";

/// One persisted user data representation
#[derive(Debug, Clone)]
pub struct MockWidget {
    pub id: u64,
    pub codes: [String; 3],
    pub order: usize,
    pub ward: Option<u64>,
    pub room: Option<u64>,
    pub time: Option<String>,
    pub end_time: Option<String>,
}

impl MockWidget {
    fn record(&self) -> Value {
        json!({
            "id": self.id,
            "order": self.order,
            "time": self.time,
            "end_time": self.end_time,
            "ward": self.ward,
            "room": self.room,
        })
    }
}

struct MockDashboardState {
    token: String,
    next_id: u64,
    widgets: Vec<MockWidget>,
    order_updates: Vec<Vec<(String, usize)>>,
    rejected: usize,
}

/// Mock dashboard server
pub struct MockDashboardServer {
    addr: SocketAddr,
    state: Arc<RwLock<MockDashboardState>>,
    handle: JoinHandle<()>,
}

type Shared = Arc<RwLock<MockDashboardState>>;

impl MockDashboardServer {
    /// Start a mock server on a random port accepting `token`
    pub async fn start(token: &str) -> Self {
        let state = Arc::new(RwLock::new(MockDashboardState {
            token: token.to_string(),
            next_id: 1,
            widgets: Vec::new(),
            order_updates: Vec::new(),
            rejected: 0,
        }));

        let app = Router::new()
            .route("/create/user-data-representation", post(handle_create))
            .route("/delete/user-data-representation", delete(handle_delete))
            .route("/update/order", put(handle_order))
            .route("/get_data/{location}/{theme}/{time}/", get(handle_data))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn widget_ids(&self) -> Vec<u64> {
        self.state.read().await.widgets.iter().map(|w| w.id).collect()
    }

    pub async fn widget(&self, id: u64) -> Option<MockWidget> {
        self.state
            .read()
            .await
            .widgets
            .iter()
            .find(|w| w.id == id)
            .cloned()
    }

    pub async fn order_updates(&self) -> Vec<Vec<(String, usize)>> {
        self.state.read().await.order_updates.clone()
    }

    /// Requests refused for a missing or wrong token
    pub async fn rejected(&self) -> usize {
        self.state.read().await.rejected
    }

    /// Stop the mock server
    pub async fn stop(self) {
        self.handle.abort();
    }
}

async fn authorize(state: &Shared, headers: &HeaderMap) -> Result<(), StatusCode> {
    let sent = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    let mut state = state.write().await;
    if sent == Some(state.token.as_str()) {
        Ok(())
    } else {
        state.rejected += 1;
        Err(StatusCode::FORBIDDEN)
    }
}

#[derive(Debug, Deserialize)]
struct CreateBody {
    location_type: String,
    theme_type: String,
    time_type: String,
}

fn locations_for(location: &str) -> Option<Value> {
    match location {
        "W" => Some(json!([{ "id": 1, "name": "Station 1" }, { "id": 2, "name": "Station 2" }])),
        "R" => Some(json!([{ "id": 11, "name": "Zimmer 1.1" }, { "id": 12, "name": "Zimmer 1.2" }])),
        _ => None,
    }
}

async fn handle_create(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&state, &headers).await?;

    let mut state = state.write().await;
    let widget = MockWidget {
        id: state.next_id,
        order: state.widgets.len(),
        ward: (body.location_type == "W").then_some(1),
        room: (body.location_type == "R").then_some(11),
        codes: [body.location_type, body.theme_type, body.time_type],
        time: None,
        end_time: None,
    };
    state.next_id += 1;

    let mut response = json!({
        "data_representation": {
            "location_type": widget.codes[0],
            "theme_type": widget.codes[1],
            "time_type": widget.codes[2],
        },
        "user_data_representation": widget.record(),
    });
    if let Some(locations) = locations_for(&widget.codes[0]) {
        response["locations"] = locations;
    }
    state.widgets.push(widget);
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct DeleteBody {
    id: Value,
}

fn parse_id(id: &Value) -> Option<u64> {
    match id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

async fn handle_delete(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<DeleteBody>,
) -> StatusCode {
    if let Err(code) = authorize(&state, &headers).await {
        return code;
    }
    let Some(id) = parse_id(&body.id) else {
        return StatusCode::BAD_REQUEST;
    };
    let mut state = state.write().await;
    let before = state.widgets.len();
    state.widgets.retain(|w| w.id != id);
    if state.widgets.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: Value,
    order: usize,
}

async fn handle_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(entries): Json<Vec<OrderBody>>,
) -> StatusCode {
    if let Err(code) = authorize(&state, &headers).await {
        return code;
    }
    let mut state = state.write().await;
    for entry in &entries {
        if let Some(id) = parse_id(&entry.id) {
            if let Some(widget) = state.widgets.iter_mut().find(|w| w.id == id) {
                widget.order = entry.order;
            }
        }
    }
    let update = entries
        .iter()
        .map(|e| (e.id.as_str().map(str::to_string).unwrap_or_else(|| e.id.to_string()), e.order))
        .collect();
    state.order_updates.push(update);
    StatusCode::OK
}

fn sample_data(location: &str, theme: &str) -> Value {
    let figures = json!({
        "name": "Station 1",
        "number": 3,
        "max_number": 4,
        "number_of_men": 1,
        "number_of_women": 2,
        "number_of_diverse": 0,
        "average_age": 61.5
    });
    match (location, theme) {
        ("H", "I") => figures,
        ("H", "H") => json!({ "2024-01-05T10:00": figures, "2024-01-05T11:00": null }),
        (_, "H") => json!({ "2024-01-05T10:00": [figures] }),
        _ => json!([figures]),
    }
}

async fn handle_data(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path((location, theme, time)): Path<(String, String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(code) = authorize(&state, &headers).await {
        return code.into_response();
    }
    let Some(id) = params.get("id").and_then(|id| id.parse::<u64>().ok()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let mut state = state.write().await;
    let Some(widget) = state.widgets.iter_mut().find(|w| w.id == id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if widget.codes != [location.clone(), theme.clone(), time.clone()] {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let update = params.get("update_flag").map(String::as_str) == Some("true");
    if update {
        let location_id = params.get("location_id").and_then(|l| l.parse().ok());
        match location.as_str() {
            "W" => widget.ward = location_id,
            "R" => widget.room = location_id,
            _ => {}
        }
        widget.time = params.get("time").cloned();
        widget.end_time = params.get("end_time").cloned();
    }

    if params.get("download").map(String::as_str) == Some("true") {
        return (
            [
                (header::CONTENT_TYPE, "text/csv"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"data.csv\""),
            ],
            "name;number;max_number\nStation 1;3;4\n",
        )
            .into_response();
    }

    let mut response = json!({
        "data": sample_data(&location, &theme),
        "user_data_representation": widget.record(),
    });
    if update {
        if let Some(locations) = locations_for(&location) {
            response["locations"] = locations;
        }
    }
    Json(response).into_response()
}
