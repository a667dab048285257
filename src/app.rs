use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{protected, public};
use crate::middleware::require_admin;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        // Admin-only (bearer must match the live session)
        .merge(protected_routes(state.clone()))
        // Dashboard guards itself so it can answer pending/redirect
        .route("/api/admin/dashboard", get(protected::dashboard::get))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/status", get(public::session::status))
        .route("/auth/login", post(public::session::login))
        .route("/api/home", get(public::home::get))
        .route("/api/content/:key", get(public::content::text_get))
        .route("/api/sections/:key", get(public::content::section_get))
        .route("/api/:category", get(public::records::list))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/session", delete(protected::session::logout))
        .route("/api/content/:key", put(protected::content::text_put))
        .route("/api/sections/:key", put(protected::content::section_put))
        .route("/api/:category", post(protected::records::create))
        .route(
            "/api/:category/:id",
            put(protected::records::update).delete(protected::records::delete),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Cyberfolio API",
            "version": version,
            "description": "Cybersecurity portfolio: TryHackMe rooms, Hack The Box machines, CTF challenges",
            "endpoints": {
                "home": "/api/home (public)",
                "content": "/api/content/:key, /api/sections/:key (GET public, PUT admin)",
                "records": "/api/:category[/:id] where category is rooms|machines|ctf (GET public, POST/PUT/DELETE admin)",
                "auth": "/auth/status, /auth/login (public), /auth/session (DELETE, admin)",
                "dashboard": "/api/admin/dashboard (admin)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.gateway.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "backend": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "content service unavailable",
                "code": "SERVICE_UNAVAILABLE",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "backend_error": e.notice()
                }
            })),
        ),
    }
}

/// Binds the configured port and serves until ctrl-c
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Cyberfolio API listening on http://{}", bind_addr);

    let session = state.session.clone();
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    session.shutdown().await;
    Ok(())
}
