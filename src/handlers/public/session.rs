use axum::{extract::State, http::HeaderMap, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::token;
use crate::auth::{AuthState, Capability};
use crate::error::ApiError;
use crate::middleware::{capability_for, ApiResponse, ApiResult};
use crate::models::Principal;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    #[serde(flatten)]
    pub state: AuthState,
    pub loading: bool,
    /// Capability of this caller, not of the process-wide session
    pub capability: Capability,
}

/// GET /auth/status - Session state and what the caller may do
pub async fn status(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<SessionStatus> {
    let snapshot = state.session.snapshot();
    let capability = capability_for(&headers, &snapshot);

    // visitors always see anonymous, even while an admin is signed in
    let public_state = match (&snapshot.state, capability.can_edit()) {
        (AuthState::Authenticated(_), false) => AuthState::Anonymous,
        (other, _) => other.clone(),
    };

    Ok(ApiResponse::success(SessionStatus {
        state: public_state,
        loading: snapshot.loading(),
        capability,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub principal: Principal,
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// POST /auth/login - Sign the admin in with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let principal = state.session.sign_in(payload.email.trim(), &payload.password).await?;

    let snapshot = state.session.snapshot();
    let access_token = snapshot
        .access_token()
        .ok_or_else(|| ApiError::unauthorized("Session ended before it could be returned"))?
        .to_string();
    let expires_at = token::peek(&access_token).ok().and_then(|c| c.expires_at());

    Ok(ApiResponse::success(LoginResponse {
        principal,
        access_token,
        expires_at,
    }))
}
