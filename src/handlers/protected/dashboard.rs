use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::Access;
use crate::collections::{dashboard_stats, DashboardStats};
use crate::error::ApiError;
use crate::middleware::auth::{admin_for, extract_bearer};
use crate::middleware::ApiResponse;
use crate::models::Principal;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub greeting: String,
    pub principal: Principal,
    pub stats: DashboardStats,
}

/// GET /api/admin/dashboard - Counts per category for the signed-in admin.
///
/// While the session check is outstanding this answers 503 instead of
/// redirecting; once settled, callers without the live bearer are sent to
/// the login path.
pub async fn get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let login_path = state.config.server.login_path.clone();
    let snapshot = state.session.snapshot();

    let principal = match snapshot.access(&login_path) {
        Access::Pending => {
            return ApiError::service_unavailable("Session check still in progress").into_response()
        }
        Access::Redirect(to) => return redirect(&to),
        Access::Granted(_) => {
            let caller = extract_bearer(&headers)
                .ok()
                .and_then(|token| admin_for(&snapshot, &token));
            match caller {
                Some(principal) => principal,
                None => return redirect(&login_path),
            }
        }
    };

    let stats = dashboard_stats(state.gateway.as_ref()).await;
    ApiResponse::success(Dashboard {
        greeting: format!("Welcome back, {}", principal.handle()),
        principal,
        stats,
    })
    .into_response()
}

fn redirect(to: &str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, to.to_string())]).into_response()
}
