use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthSnapshot, Capability};
use crate::error::ApiError;
use crate::models::Principal;
use crate::state::AppState;

/// Signed-in admin attached to requests that passed [`require_admin`]
#[derive(Clone, Debug)]
pub struct AdminUser(pub Principal);

/// Admin gate for mutating routes: the bearer token must be the live
/// session's access token. The session is re-checked first so an expired
/// one is refreshed or dropped before the comparison.
pub async fn require_admin(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).map_err(ApiError::unauthorized)?;

    let snapshot = state.session.revalidate().await;
    if snapshot.loading() {
        return Err(ApiError::service_unavailable("Session check still in progress"));
    }
    let principal = admin_for(&snapshot, &token)
        .ok_or_else(|| ApiError::unauthorized("Session is not active; please sign in again"))?;

    request.extensions_mut().insert(AdminUser(principal));
    Ok(next.run(request).await)
}

/// What the caller may see: admin affordances only for the live session's bearer
pub fn capability_for(headers: &HeaderMap, snapshot: &AuthSnapshot) -> Capability {
    match extract_bearer(headers) {
        Ok(token) if admin_for(snapshot, &token).is_some() => Capability::ADMIN,
        _ => Capability::VISITOR,
    }
}

pub(crate) fn admin_for(snapshot: &AuthSnapshot, token: &str) -> Option<Principal> {
    match snapshot.access_token() {
        Some(live) if live == token => snapshot.principal().cloned(),
        _ => None,
    }
}

/// Extract the token from an `Authorization: Bearer` header
pub(crate) fn extract_bearer(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
