//! Admin-editable content: a displayed value that starts from a caller
//! default, hydrates from the store, and persists through upsert-by-key.

pub mod section;
pub mod text;

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::auth::Capability;
use crate::gateway::{Gateway, GatewayError, RowQuery};
use crate::models::ValidationError;

pub use section::{SectionBinding, SectionSlot};
pub use text::{render_lines, StaticText, TextBinding};

/// Tracks whether the owning view is still alive; late results are dropped
/// once it is not.
#[derive(Debug, Clone)]
pub struct Mount(Arc<AtomicBool>);

impl Default for Mount {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl Mount {
    pub fn is_mounted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("No edit in progress")]
    NotEditing,

    #[error("Editing requires a signed-in admin")]
    Forbidden,
}

/// One kind of keyed content row
pub trait ContentSlot: Send + Sync + 'static {
    type Value: Clone + PartialEq + Debug + Serialize + Send + Sync + 'static;

    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;

    fn from_row(row: &Value) -> Option<Self::Value>;
    fn to_row(key: &str, value: &Self::Value) -> Value;

    /// What the view shows given the persisted row (if any) and the default
    fn display(persisted: Option<&Self::Value>, default: &Self::Value) -> Self::Value;

    /// Normalises and validates a value before it may be saved
    fn prepare(value: Self::Value) -> Result<Self::Value, ValidationError> {
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    Saved,
    /// Buffer matched the displayed value; nothing was sent
    Unchanged,
}

#[derive(Debug)]
struct BindingState<V> {
    persisted: Option<V>,
    loading: bool,
    buffer: Option<V>,
}

pub struct ContentBinding<S: ContentSlot> {
    gateway: Arc<dyn Gateway>,
    key: String,
    default: S::Value,
    state: Arc<RwLock<BindingState<S::Value>>>,
    mount: Mount,
}

impl<S: ContentSlot> Clone for ContentBinding<S> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            key: self.key.clone(),
            default: self.default.clone(),
            state: self.state.clone(),
            mount: self.mount.clone(),
        }
    }
}

impl<S: ContentSlot> ContentBinding<S> {
    pub fn new(gateway: Arc<dyn Gateway>, key: impl Into<String>, default: S::Value) -> Self {
        Self {
            gateway,
            key: key.into(),
            default,
            state: Arc::new(RwLock::new(BindingState {
                persisted: None,
                loading: true,
                buffer: None,
            })),
            mount: Mount::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the row for this key; a missing row or failed read leaves the
    /// default on display. Nothing is written.
    pub async fn load(&self) -> S::Value {
        let query = RowQuery::new().eq(S::KEY_COLUMN, self.key.as_str()).limit(1);
        let result = self.gateway.fetch_rows(S::TABLE, &query).await;

        if !self.mount.is_mounted() {
            tracing::debug!("Dropping late load for {} after unmount", self.key);
            return self.displayed().await;
        }

        let mut state = self.state.write().await;
        match result {
            Ok(rows) => state.persisted = rows.first().and_then(S::from_row),
            Err(e) => tracing::warn!("Error fetching {} '{}': {}", S::TABLE, self.key, e),
        }
        state.loading = false;
        S::display(state.persisted.as_ref(), &self.default)
    }

    /// Upserts `value`; local state changes only once the store accepts it
    pub async fn save(&self, value: S::Value) -> Result<(), BindingError> {
        let value = S::prepare(value)?;
        let row = S::to_row(&self.key, &value);

        if let Err(e) = self
            .gateway
            .upsert_row_by_key(S::TABLE, S::KEY_COLUMN, row)
            .await
        {
            tracing::warn!("Error updating {} '{}': {}", S::TABLE, self.key, e);
            return Err(e.into());
        }

        if self.mount.is_mounted() {
            self.state.write().await.persisted = Some(value);
        }
        tracing::info!("Saved {} '{}'", S::TABLE, self.key);
        Ok(())
    }

    pub async fn displayed(&self) -> S::Value {
        let state = self.state.read().await;
        S::display(state.persisted.as_ref(), &self.default)
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    /// Seeds the edit buffer with the displayed value. `None` when the
    /// capability does not allow editing.
    pub async fn begin_edit(&self, capability: Capability) -> Option<S::Value> {
        if !capability.can_edit() {
            return None;
        }
        let mut state = self.state.write().await;
        let seed = S::display(state.persisted.as_ref(), &self.default);
        state.buffer = Some(seed.clone());
        Some(seed)
    }

    pub async fn set_buffer(&self, value: S::Value) -> Result<(), BindingError> {
        let mut state = self.state.write().await;
        match state.buffer.as_mut() {
            Some(buffer) => {
                *buffer = value;
                Ok(())
            }
            None => Err(BindingError::NotEditing),
        }
    }

    pub async fn buffer(&self) -> Option<S::Value> {
        self.state.read().await.buffer.clone()
    }

    /// Saves the edit buffer. On failure the buffer is kept so the admin can retry.
    pub async fn commit(&self, capability: Capability) -> Result<CommitOutcome, BindingError> {
        if !capability.can_edit() {
            return Err(BindingError::Forbidden);
        }
        let (buffer, displayed) = {
            let state = self.state.read().await;
            let buffer = state.buffer.clone().ok_or(BindingError::NotEditing)?;
            (buffer, S::display(state.persisted.as_ref(), &self.default))
        };

        let prepared = S::prepare(buffer)?;
        if prepared == displayed {
            self.cancel().await;
            return Ok(CommitOutcome::Unchanged);
        }

        self.save(prepared).await?;
        self.cancel().await;
        Ok(CommitOutcome::Saved)
    }

    /// Drops the edit buffer without saving
    pub async fn cancel(&self) {
        self.state.write().await.buffer = None;
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }
}
