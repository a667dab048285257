use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Capability;
use crate::collections::{CollectionEditor, RemoveOutcome};
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::handlers::parse_category;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::models::{Category, ChallengeRecord, CtfChallenge, HackTheBoxMachine, TryHackMeRoom};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Explicit confirmation; without it nothing is deleted
    #[serde(default)]
    pub confirm: bool,
}

fn editor<R: ChallengeRecord>(gateway: Arc<dyn Gateway>) -> CollectionEditor<R> {
    CollectionEditor::new(gateway, Capability::ADMIN)
}

async fn create_as<R: ChallengeRecord>(gateway: Arc<dyn Gateway>, payload: Value) -> Result<Value, ApiError> {
    let fields: R::Fields = serde_json::from_value(payload)?;
    let created = editor::<R>(gateway).create(fields).await?;
    Ok(serde_json::to_value(created)?)
}

async fn update_as<R: ChallengeRecord>(gateway: Arc<dyn Gateway>, id: &str, payload: Value) -> Result<Value, ApiError> {
    let fields: R::Fields = serde_json::from_value(payload)?;
    let updated = editor::<R>(gateway).update(id, fields).await?;
    Ok(serde_json::to_value(updated)?)
}

async fn remove_as<R: ChallengeRecord>(gateway: Arc<dyn Gateway>, id: &str, confirm: bool) -> Result<RemoveOutcome, ApiError> {
    Ok(editor::<R>(gateway).remove(id, &confirm).await?)
}

/// POST /api/:category - Create a record
pub async fn create(
    Path(category): Path<String>,
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let category = parse_category(&category)?;
    let gateway = state.gateway.clone();

    let created = match category {
        Category::Rooms => create_as::<TryHackMeRoom>(gateway, payload).await?,
        Category::Machines => create_as::<HackTheBoxMachine>(gateway, payload).await?,
        Category::Ctf => create_as::<CtfChallenge>(gateway, payload).await?,
    };
    tracing::info!("{} created {} record", admin.email, category.slug());
    Ok(ApiResponse::created(created))
}

/// PUT /api/:category/:id - Replace a record's editable fields
pub async fn update(
    Path((category, id)): Path<(String, String)>,
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let category = parse_category(&category)?;
    let gateway = state.gateway.clone();

    let updated = match category {
        Category::Rooms => update_as::<TryHackMeRoom>(gateway, &id, payload).await?,
        Category::Machines => update_as::<HackTheBoxMachine>(gateway, &id, payload).await?,
        Category::Ctf => update_as::<CtfChallenge>(gateway, &id, payload).await?,
    };
    tracing::info!("{} updated {} record {}", admin.email, category.slug(), id);
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/:category/:id?confirm=true - Delete a record
pub async fn delete(
    Path((category, id)): Path<(String, String)>,
    Query(query): Query<DeleteQuery>,
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
) -> ApiResult<Value> {
    let category = parse_category(&category)?;
    let gateway = state.gateway.clone();

    let outcome = match category {
        Category::Rooms => remove_as::<TryHackMeRoom>(gateway, &id, query.confirm).await?,
        Category::Machines => remove_as::<HackTheBoxMachine>(gateway, &id, query.confirm).await?,
        Category::Ctf => remove_as::<CtfChallenge>(gateway, &id, query.confirm).await?,
    };

    match outcome {
        RemoveOutcome::Removed => {
            tracing::info!("{} deleted {} record {}", admin.email, category.slug(), id);
            Ok(ApiResponse::success(json!({ "id": id, "outcome": outcome })))
        }
        RemoveOutcome::Declined => Err(ApiError::bad_request("Deletion requires confirm=true")),
    }
}
