use axum::extract::{Extension, State};
use serde_json::{json, Value};

use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::state::AppState;

/// DELETE /auth/session - Sign out. The session ends even when the auth
/// service call fails; that failure is still reported.
pub async fn logout(
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
) -> ApiResult<Value> {
    let scope = state.config.auth.sign_out_scope;
    state.session.sign_out(scope).await?;

    tracing::info!("{} signed out", admin.email);
    Ok(ApiResponse::success(json!({ "signed_out": true, "scope": scope.as_str() })))
}
