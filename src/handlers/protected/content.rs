use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::Capability;
use crate::content::{CommitOutcome, ContentBinding, ContentSlot, SectionBinding, TextBinding};
use crate::error::ApiError;
use crate::middleware::{AdminUser, ApiResponse, ApiResult};
use crate::models::SectionCopy;
use crate::state::AppState;
use crate::views::home::{section_default, text_default};
use crate::views::{SectionHeaderView, TextBlockView};

#[derive(Debug, Deserialize)]
pub struct TextUpdate {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Saved<V: Serialize> {
    pub outcome: CommitOutcome,
    pub view: V,
}

/// Runs one edit cycle on a fresh binding: load, seed the buffer, commit
async fn edit<S: ContentSlot>(binding: &ContentBinding<S>, value: S::Value) -> Result<(CommitOutcome, S::Value), ApiError> {
    binding.load().await;
    binding.begin_edit(Capability::ADMIN).await;
    binding.set_buffer(value).await?;
    let outcome = binding.commit(Capability::ADMIN).await?;
    Ok((outcome, binding.displayed().await))
}

/// PUT /api/content/:key - Save a free-text block
pub async fn text_put(
    Path(key): Path<String>,
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Json(payload): Json<TextUpdate>,
) -> ApiResult<Saved<TextBlockView>> {
    let default = text_default(&key).unwrap_or_default().to_string();
    let binding = TextBinding::new(state.gateway.clone(), key.as_str(), default);

    let (outcome, text) = edit(&binding, payload.content).await?;
    tracing::info!("{} saved content '{}' ({:?})", admin.email, key, outcome);

    Ok(ApiResponse::success(Saved {
        outcome,
        view: TextBlockView::new(key, text, Capability::ADMIN),
    }))
}

/// PUT /api/sections/:key - Save a section header's title and description
pub async fn section_put(
    Path(key): Path<String>,
    State(state): State<AppState>,
    Extension(AdminUser(admin)): Extension<AdminUser>,
    Json(payload): Json<SectionCopy>,
) -> ApiResult<Saved<SectionHeaderView>> {
    let default = section_default(&key)
        .ok_or_else(|| ApiError::not_found(format!("Unknown section '{}'", key)))?;
    let binding = SectionBinding::new(state.gateway.clone(), key.as_str(), default);

    let (outcome, copy) = edit(&binding, payload).await?;
    tracing::info!("{} saved section '{}' ({:?})", admin.email, key, outcome);

    Ok(ApiResponse::success(Saved {
        outcome,
        view: SectionHeaderView::new(key, copy, Capability::ADMIN),
    }))
}
