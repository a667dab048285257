//! Remote data gateway: row CRUD against named tables plus the auth session API.
//!
//! Everything above this module talks to an injected `Arc<dyn Gateway>`; the
//! REST implementation speaks PostgREST/GoTrue, the memory implementation backs
//! tests and offline runs.

pub mod error;
pub mod memory;
pub mod query;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::models::{Session, SessionEvent, SignOutScope};

pub use error::GatewayError;
pub use memory::MemoryGateway;
pub use query::{RowQuery, SortDirection};
pub use rest::RestGateway;

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn fetch_rows(&self, table: &str, query: &RowQuery) -> Result<Vec<Value>, GatewayError>;

    async fn count_rows(&self, table: &str) -> Result<u64, GatewayError>;

    /// Inserts one row and returns it as stored (with `id`, `created_at`)
    async fn insert_row(&self, table: &str, row: Value) -> Result<Value, GatewayError>;

    /// Patches the row with the given id; `NotFound` when no row matched
    async fn update_row_by_id(&self, table: &str, id: &str, patch: Value) -> Result<Value, GatewayError>;

    /// Inserts or merges on the unique `key_column`
    async fn upsert_row_by_key(&self, table: &str, key_column: &str, row: Value) -> Result<(), GatewayError>;

    /// `NotFound` when no row matched
    async fn delete_row_by_id(&self, table: &str, id: &str) -> Result<(), GatewayError>;

    async fn get_session(&self) -> Result<Option<Session>, GatewayError>;

    /// Registers for session-change notifications
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    async fn sign_in(&self, email: &str, secret: &str) -> Result<Session, GatewayError>;

    async fn sign_out(&self, scope: SignOutScope) -> Result<(), GatewayError>;

    /// Connection test: a one-row read from `section_content`
    async fn ping(&self) -> Result<(), GatewayError> {
        let query = RowQuery::new().limit(1);
        self.fetch_rows(crate::models::content::SECTION_CONTENT_TABLE, &query)
            .await
            .map(|_| ())
    }
}

/// Capacity of the session-change broadcast channel
pub(crate) const SESSION_EVENT_CAPACITY: usize = 16;
