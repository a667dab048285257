use axum::{extract::State, http::HeaderMap};

use crate::middleware::{capability_for, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::views::{build_home, HomePage};

/// GET /api/home - Hero, about text and all three achievement sections
pub async fn get(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<HomePage> {
    let capability = capability_for(&headers, &state.session.snapshot());
    let page = build_home(state.gateway.clone(), capability).await;
    Ok(ApiResponse::success(page))
}
