use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;
use serde_json::Value;

use crate::auth::Capability;
use crate::collections::CollectionEditor;
use crate::gateway::Gateway;
use crate::handlers::parse_category;
use crate::middleware::{capability_for, ApiResponse, ApiResult};
use crate::models::{Category, ChallengeRecord, CtfChallenge, HackTheBoxMachine, TryHackMeRoom};
use crate::state::AppState;
use crate::views::CardView;

#[derive(Debug, Serialize)]
pub struct RecordList {
    pub category: Category,
    pub items: Vec<Value>,
    pub cards: Vec<CardView>,
}

/// GET /api/:category - Records newest first, with their cards
pub async fn list(
    Path(category): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<RecordList> {
    let category = parse_category(&category)?;
    let capability = capability_for(&headers, &state.session.snapshot());
    let gateway = state.gateway.clone();

    let list = match category {
        Category::Rooms => list_as::<TryHackMeRoom>(gateway, category, capability).await?,
        Category::Machines => list_as::<HackTheBoxMachine>(gateway, category, capability).await?,
        Category::Ctf => list_as::<CtfChallenge>(gateway, category, capability).await?,
    };
    Ok(ApiResponse::success(list))
}

async fn list_as<R: ChallengeRecord>(
    gateway: Arc<dyn Gateway>,
    category: Category,
    capability: Capability,
) -> Result<RecordList, crate::error::ApiError> {
    let editor = CollectionEditor::<R>::new(gateway, capability);
    let items = editor
        .list()
        .await?
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RecordList {
        category,
        items,
        cards: editor.cards().await,
    })
}
