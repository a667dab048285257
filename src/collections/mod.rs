//! Per-category achievement lists with admin create/update/delete.
//!
//! After any successful mutation the editor re-lists from the store instead
//! of patching its local copy, so ordering always matches the store's.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::auth::Capability;
use crate::content::Mount;
use crate::gateway::{Gateway, GatewayError, RowQuery};
use crate::models::{Category, ChallengeRecord, ValidationError};
use crate::views::CardView;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Editing requires a signed-in admin")]
    Forbidden,
}

/// The explicit confirmation step in front of a delete
pub trait Confirm: Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl Confirm for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveOutcome {
    Removed,
    /// The user declined; no call was issued
    Declined,
}

#[derive(Debug)]
struct EditorState<R> {
    items: Vec<R>,
    loading: bool,
}

pub struct CollectionEditor<R: ChallengeRecord> {
    gateway: Arc<dyn Gateway>,
    capability: Capability,
    state: Arc<RwLock<EditorState<R>>>,
    mount: Mount,
    _record: PhantomData<R>,
}

impl<R: ChallengeRecord> CollectionEditor<R> {
    pub fn new(gateway: Arc<dyn Gateway>, capability: Capability) -> Self {
        Self {
            gateway,
            capability,
            state: Arc::new(RwLock::new(EditorState {
                items: Vec::new(),
                loading: true,
            })),
            mount: Mount::default(),
            _record: PhantomData,
        }
    }

    /// Newest first, exactly as the store orders them
    pub async fn list(&self) -> Result<Vec<R>, EditorError> {
        let query = RowQuery::new().order("created_at desc");
        let fetched = self
            .gateway
            .fetch_rows(R::TABLE, &query)
            .await
            .map(decode_rows::<R>);

        if !self.mount.is_mounted() {
            return fetched.map_err(EditorError::from);
        }

        let mut state = self.state.write().await;
        state.loading = false;
        match fetched {
            Ok(items) => {
                state.items = items.clone();
                Ok(items)
            }
            Err(e) => {
                tracing::warn!("Error fetching {}: {}", R::TABLE, e);
                Err(e.into())
            }
        }
    }

    pub async fn items(&self) -> Vec<R> {
        self.state.read().await.items.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn create(&self, fields: R::Fields) -> Result<R, EditorError> {
        self.ensure_editable()?;
        R::validate(&fields)?;

        let row = self
            .gateway
            .insert_row(R::TABLE, serde_json::to_value(&fields).map_err(GatewayError::from)?)
            .await
            .map_err(|e| self.failed("save", e))?;
        let created: R = serde_json::from_value(row).map_err(GatewayError::from)?;

        tracing::info!("{} added successfully ({})", R::NOUN, created.id());
        self.relist().await;
        Ok(created)
    }

    pub async fn update(&self, id: &str, fields: R::Fields) -> Result<R, EditorError> {
        self.ensure_editable()?;
        R::validate(&fields)?;

        let row = self
            .gateway
            .update_row_by_id(R::TABLE, id, serde_json::to_value(&fields).map_err(GatewayError::from)?)
            .await
            .map_err(|e| self.failed("save", e))?;
        let updated: R = serde_json::from_value(row).map_err(GatewayError::from)?;

        tracing::info!("{} updated successfully ({})", R::NOUN, id);
        self.relist().await;
        Ok(updated)
    }

    /// Asks `confirm` first; a declined prompt issues no call
    pub async fn remove(&self, id: &str, confirm: &dyn Confirm) -> Result<RemoveOutcome, EditorError> {
        self.ensure_editable()?;
        let prompt = format!(
            "Are you sure you want to delete this {}?",
            R::NOUN.to_ascii_lowercase()
        );
        if !confirm.confirm(&prompt) {
            return Ok(RemoveOutcome::Declined);
        }

        self.gateway
            .delete_row_by_id(R::TABLE, id)
            .await
            .map_err(|e| self.failed("delete", e))?;

        tracing::info!("{} deleted successfully ({})", R::NOUN, id);
        self.relist().await;
        Ok(RemoveOutcome::Removed)
    }

    /// Cards for the current items; actions only when the capability allows
    pub async fn cards(&self) -> Vec<CardView> {
        let state = self.state.read().await;
        state
            .items
            .iter()
            .map(|item| CardView::new(item.id(), item.card(), self.capability))
            .collect()
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        if self.capability.can_edit() {
            Ok(())
        } else {
            Err(EditorError::Forbidden)
        }
    }

    fn failed(&self, action: &str, err: GatewayError) -> EditorError {
        tracing::warn!("Failed to {} {}: {}", action, R::NOUN.to_ascii_lowercase(), err);
        err.into()
    }

    async fn relist(&self) {
        // the mutation already succeeded; a failed re-list only leaves the old list up
        let _ = self.list().await;
    }
}

/// One bad row is skipped, not the whole category
fn decode_rows<R: ChallengeRecord>(rows: Vec<Value>) -> Vec<R> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value::<R>(row) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping undecodable {} row: {}", R::TABLE, e);
                None
            }
        })
        .collect()
}

/// Counts shown on the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub tryhackme: u64,
    pub hackthebox: u64,
    pub ctf: u64,
    pub total: u64,
}

/// Counts every category concurrently; a failed count reads as zero
pub async fn dashboard_stats(gateway: &dyn Gateway) -> DashboardStats {
    let count = |category: Category| async move {
        match gateway.count_rows(category.table()).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Error counting {}: {}", category.table(), e);
                0
            }
        }
    };

    let (tryhackme, hackthebox, ctf) = futures::join!(
        count(Category::Rooms),
        count(Category::Machines),
        count(Category::Ctf)
    );

    DashboardStats {
        tryhackme,
        hackthebox,
        ctf,
        total: tryhackme + hackthebox + ctf,
    }
}
