use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;

use crate::content::{SectionBinding, TextBinding};
use crate::error::ApiError;
use crate::middleware::{capability_for, ApiResponse, ApiResult};
use crate::state::AppState;
use crate::views::home::{section_default, text_default};
use crate::views::{SectionHeaderView, TextBlockView};

#[derive(Debug, Deserialize)]
pub struct TextQuery {
    /// Fallback for keys without built-in copy
    pub default: Option<String>,
}

/// GET /api/content/:key - Displayed text for a key (persisted or default)
pub async fn text_get(
    Path(key): Path<String>,
    Query(query): Query<TextQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<TextBlockView> {
    let default = query
        .default
        .or_else(|| text_default(&key).map(str::to_string))
        .unwrap_or_default();

    let binding = TextBinding::new(state.gateway.clone(), key.as_str(), default);
    let text = binding.load().await;

    let capability = capability_for(&headers, &state.session.snapshot());
    Ok(ApiResponse::success(TextBlockView::new(key, text, capability)))
}

/// GET /api/sections/:key - Section header copy (persisted or default)
pub async fn section_get(
    Path(key): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SectionHeaderView> {
    let default = section_default(&key)
        .ok_or_else(|| ApiError::not_found(format!("Unknown section '{}'", key)))?;

    let binding = SectionBinding::new(state.gateway.clone(), key.as_str(), default);
    let copy = binding.load().await;

    let capability = capability_for(&headers, &state.session.snapshot());
    Ok(ApiResponse::success(SectionHeaderView::new(key, copy, capability)))
}
