#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use cyberfolio_api::config::AppConfig;
use cyberfolio_api::gateway::{Gateway, MemoryGateway};
use cyberfolio_api::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

pub fn test_config(backend_url: &str) -> AppConfig {
    let backend_url = backend_url.to_string();
    AppConfig::from_lookup(move |key| match key {
        "SUPABASE_URL" => Some(backend_url.clone()),
        "SUPABASE_ANON_KEY" => Some("test-anon-key".to_string()),
        "CYBERFOLIO_LOGIN_PATH" => Some("/admin/login".to_string()),
        _ => None,
    })
    .expect("test config")
}

/// Router over an in-process store with one admin account
pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<MemoryGateway>,
    pub state: AppState,
}

impl TestApp {
    /// Session check already resolved (anonymous)
    pub async fn new() -> Self {
        let app = Self::uninitialized().await;
        app.state.session.initialize().await;
        app
    }

    /// Session check still outstanding
    pub async fn uninitialized() -> Self {
        let gateway = Arc::new(MemoryGateway::new().with_user(ADMIN_EMAIL, ADMIN_PASSWORD).await);
        let state = AppState::new(test_config("http://127.0.0.1:54321"), gateway.clone());
        Self {
            router: cyberfolio_api::app(state.clone()),
            gateway,
            state,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Result<(StatusCode, HeaderMap, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body is not JSON")?
        };
        Ok((status, headers, body))
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> Result<(StatusCode, Value)> {
        let (status, _, body) = self.request(Method::GET, uri, bearer, None).await?;
        Ok((status, body))
    }

    /// Signs in through the API and returns the bearer token
    pub async fn login(&self) -> Result<String> {
        let (status, _, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        body["data"]["access_token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no access_token")
    }
}

// ---------------------------------------------------------------------------
// Mock PostgREST / GoTrue backend for RestGateway tests
// ---------------------------------------------------------------------------

pub const MOCK_TOKEN: &str = "mock-access-token";
pub const REFRESHED_TOKEN: &str = "mock-access-token-refreshed";

#[derive(Debug, Default)]
pub struct MockState {
    pub tables: HashMap<String, Vec<Value>>,
    /// Token the row policy accepts; `None` while signed out
    pub live_token: Option<String>,
    pub next_id: u64,
    /// `METHOD /path?query` plus the Prefer header, in arrival order
    pub requests: Vec<(String, Option<String>)>,
    /// Authorization header of each REST request, same order as `requests`
    pub bearers: Vec<Option<String>>,
    /// `grant_type` of each token request
    pub grants: Vec<String>,
    pub logout_scopes: Vec<String>,
    /// Password grants hand out a token that has already expired
    pub issue_expired: bool,
    pub refuse_refresh: bool,
}

pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let state = Arc::new(Mutex::new(MockState::default()));

        let router = Router::new()
            .route(
                "/rest/v1/:table",
                get(rest_select)
                    .head(rest_count)
                    .post(rest_insert)
                    .patch(rest_update)
                    .delete(rest_delete),
            )
            .route("/auth/v1/token", post(auth_token))
            .route("/auth/v1/logout", post(auth_logout))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind mock backend")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        })
    }

    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut state = self.state.lock().unwrap();
        for mut row in rows {
            state.next_id += 1;
            let id = format!("row-{}", state.next_id);
            if let Some(map) = row.as_object_mut() {
                map.entry("id").or_insert(json!(id));
            }
            state.tables.entry(table.to_string()).or_default().push(row);
        }
    }

    pub fn requests(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn bearers(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().bearers.clone()
    }

    pub fn grants(&self) -> Vec<String> {
        self.state.lock().unwrap().grants.clone()
    }
}

type Shared = State<Arc<Mutex<MockState>>>;

fn record(state: &mut MockState, method: &str, table: &str, params: &HashMap<String, String>, headers: &HeaderMap) {
    let mut query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    query.sort();
    let prefer = headers.get("prefer").and_then(|v| v.to_str().ok()).map(str::to_string);
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
    state
        .requests
        .push((format!("{} /rest/v1/{}?{}", method, table, query.join("&")), prefer));
    state.bearers.push(bearer);
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    bearer.is_some() && state.live_token.as_deref() == bearer
}

fn rls_violation() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "code": "42501",
            "message": "new row violates row-level security policy"
        })),
    )
        .into_response()
}

fn filters(params: &HashMap<String, String>) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "select" | "order" | "limit" | "on_conflict"))
        .filter_map(|(k, v)| v.strip_prefix("eq.").map(|v| (k.clone(), v.to_string())))
        .collect()
}

fn matches(row: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(column, expected)| match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == *expected,
        None => false,
    })
}

async fn rest_select(
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): Shared,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "GET", &table, &params, &headers);

    let wanted = filters(&params);
    let mut rows: Vec<Value> = state
        .tables
        .get(&table)
        .map(|rows| rows.iter().filter(|r| matches(r, &wanted)).cloned().collect())
        .unwrap_or_default();

    if let Some(order) = params.get("order") {
        let (column, direction) = order.split_once('.').unwrap_or((order.as_str(), "asc"));
        rows.sort_by(|a, b| {
            let a = a.get(column).map(Value::to_string).unwrap_or_default();
            let b = b.get(column).map(Value::to_string).unwrap_or_default();
            if direction == "desc" {
                b.cmp(&a)
            } else {
                a.cmp(&b)
            }
        });
    }
    if let Some(limit) = params.get("limit").and_then(|l| l.parse::<usize>().ok()) {
        rows.truncate(limit);
    }
    Json(rows).into_response()
}

async fn rest_count(
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): Shared,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "HEAD", &table, &params, &headers);
    let total = state.tables.get(&table).map(Vec::len).unwrap_or(0);
    let range = if total == 0 {
        "*/0".to_string()
    } else {
        format!("0-{}/{}", total - 1, total)
    };
    (StatusCode::OK, [("content-range", range)]).into_response()
}

async fn rest_insert(
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): Shared,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "POST", &table, &params, &headers);
    if !authorized(&state, &headers) {
        return rls_violation();
    }

    let rows = match body {
        Value::Array(rows) => rows,
        other => vec![other],
    };

    // upsert: merge on the conflict column
    if let Some(column) = params.get("on_conflict") {
        for row in rows {
            let key = row.get(column).cloned();
            let stored = state.tables.entry(table.clone()).or_default();
            match stored.iter_mut().find(|r| r.get(column) == key.as_ref()) {
                Some(existing) => {
                    if let (Some(existing), Some(fields)) = (existing.as_object_mut(), row.as_object()) {
                        for (k, v) in fields {
                            existing.insert(k.clone(), v.clone());
                        }
                    }
                }
                None => stored.push(row),
            }
        }
        return StatusCode::CREATED.into_response();
    }

    let mut created = Vec::new();
    for mut row in rows {
        state.next_id += 1;
        let id = state.next_id;
        if let Some(map) = row.as_object_mut() {
            map.insert("id".into(), json!(format!("row-{}", id)));
            map.insert("created_at".into(), json!(format!("2024-01-01T00:00:{:02}Z", id % 60)));
        }
        state.tables.entry(table.clone()).or_default().push(row.clone());
        created.push(row);
    }
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn rest_update(
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): Shared,
    Json(patch): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "PATCH", &table, &params, &headers);
    if !authorized(&state, &headers) {
        return rls_violation();
    }

    let wanted = filters(&params);
    let mut updated = Vec::new();
    if let Some(rows) = state.tables.get_mut(&table) {
        for row in rows.iter_mut().filter(|r| matches(r, &wanted)) {
            if let (Some(existing), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                for (k, v) in fields {
                    existing.insert(k.clone(), v.clone());
                }
            }
            updated.push(row.clone());
        }
    }
    Json(updated).into_response()
}

async fn rest_delete(
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): Shared,
) -> Response {
    let mut state = state.lock().unwrap();
    record(&mut state, "DELETE", &table, &params, &headers);
    if !authorized(&state, &headers) {
        return rls_violation();
    }

    let wanted = filters(&params);
    let rows = state.tables.entry(table).or_default();
    let (removed, kept): (Vec<Value>, Vec<Value>) = rows.drain(..).partition(|r| matches(r, &wanted));
    *rows = kept;
    Json(removed).into_response()
}

async fn auth_token(
    Query(params): Query<HashMap<String, String>>,
    State(state): Shared,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    let grant = params.get("grant_type").cloned().unwrap_or_default();
    state.grants.push(grant.clone());
    let ok = match grant.as_str() {
        "password" => body["email"] == ADMIN_EMAIL && body["password"] == ADMIN_PASSWORD,
        "refresh_token" => !state.refuse_refresh && body["refresh_token"] == "mock-refresh-token",
        _ => false,
    };
    if !ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })),
        )
            .into_response();
    }

    let (token, expires_at) = if grant == "refresh_token" {
        (REFRESHED_TOKEN, None)
    } else if state.issue_expired {
        (MOCK_TOKEN, Some(1000))
    } else {
        (MOCK_TOKEN, None)
    };
    state.live_token = Some(token.to_string());

    let mut response = json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "mock-refresh-token",
        "user": { "id": "user-1", "email": ADMIN_EMAIL, "role": "authenticated" }
    });
    if let Some(at) = expires_at {
        response["expires_at"] = json!(at);
    }
    Json(response).into_response()
}

async fn auth_logout(Query(params): Query<HashMap<String, String>>, State(state): Shared) -> StatusCode {
    let mut state = state.lock().unwrap();
    state.live_token = None;
    state
        .logout_scopes
        .push(params.get("scope").cloned().unwrap_or_default());
    StatusCode::NO_CONTENT
}

/// Calls the gateway ping, asserting it succeeds
pub async fn assert_reachable(gateway: &dyn Gateway) -> Result<()> {
    gateway.ping().await.context("gateway ping failed")
}
