use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch, Mutex};
use uuid::Uuid;

use super::{Gateway, GatewayError, RowQuery, SESSION_EVENT_CAPACITY};
use crate::auth::token::{self, AccessClaims};
use crate::models::{Principal, Session, SessionEvent, SignOutScope};

#[derive(Debug, Clone)]
struct MemoryUser {
    id: String,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Map<String, Value>>>,
    users: HashMap<String, MemoryUser>,
    session: Option<Session>,
    failures: VecDeque<GatewayError>,
}

/// In-process stand-in for the hosted backend.
///
/// Reads are public; writes require a live session whose access token this
/// gateway minted, mirroring the store's row-level access policy.
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    events: broadcast::Sender<SessionEvent>,
    reads_open: watch::Sender<bool>,
    secret: String,
    token_ttl: Duration,
    writes: AtomicU64,
    clock: AtomicU64,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        let (reads_open, _) = watch::channel(true);
        Self {
            state: Mutex::new(MemoryState::default()),
            events,
            reads_open,
            secret: Uuid::new_v4().simple().to_string(),
            token_ttl: Duration::hours(1),
            writes: AtomicU64::new(0),
            clock: AtomicU64::new(0),
        }
    }

    /// Registers a confirmed admin account
    pub async fn with_user(self, email: &str, password: &str) -> Self {
        self.add_user(email, password, true).await;
        self
    }

    pub async fn add_user(&self, email: &str, password: &str, confirmed: bool) {
        let mut state = self.state.lock().await;
        state.users.insert(
            email.to_string(),
            MemoryUser {
                id: Uuid::new_v4().to_string(),
                password: password.to_string(),
                confirmed,
            },
        );
    }

    /// Inserts rows directly, bypassing the access policy
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut state = self.state.lock().await;
        for row in rows {
            let stored = self.stamp(row);
            state.tables.entry(table.to_string()).or_default().push(stored);
        }
    }

    /// The next gateway call fails with `err`
    pub async fn fail_next(&self, err: GatewayError) {
        self.state.lock().await.failures.push_back(err);
    }

    /// Number of write calls that reached the store (accepted or rejected)
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Holds every read until [`resume_reads`](Self::resume_reads)
    pub fn pause_reads(&self) {
        self.reads_open.send_replace(false);
    }

    pub fn resume_reads(&self) {
        self.reads_open.send_replace(true);
    }

    /// Pushes the live session past its expiry
    pub async fn expire_session(&self) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.session.as_mut() {
            session.expires_at = Some(Utc::now() - Duration::seconds(1));
        }
    }

    pub async fn rows(&self, table: &str) -> Vec<Value> {
        let state = self.state.lock().await;
        state
            .tables
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    fn stamp(&self, row: Value) -> Map<String, Value> {
        let mut map = match row {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let now = self.tick().to_rfc3339();
        map.entry("id").or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        map.entry("created_at").or_insert_with(|| Value::String(now.clone()));
        map.insert("updated_at".into(), Value::String(now));
        map
    }

    /// Strictly increasing timestamps so `created_at desc` is a total order
    fn tick(&self) -> DateTime<Utc> {
        let step = self.clock.fetch_add(1, Ordering::SeqCst) as i64;
        Utc::now() + Duration::microseconds(step)
    }

    async fn wait_for_reads(&self) {
        let mut rx = self.reads_open.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }

    fn take_failure(state: &mut MemoryState) -> Result<(), GatewayError> {
        match state.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Access policy for writes
    fn authorize_write(&self, state: &MemoryState) -> Result<(), GatewayError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let session = state
            .session
            .as_ref()
            .ok_or_else(|| GatewayError::Unauthorized("new row violates row-level security policy".into()))?;
        token::verify(&self.secret, &session.access_token)
            .map(|_| ())
            .map_err(|e| GatewayError::Unauthorized(e.to_string()))
    }

    fn issue_session(&self, email: &str, user: &MemoryUser) -> Result<Session, GatewayError> {
        let principal = Principal {
            id: user.id.clone(),
            email: email.to_string(),
            role: "authenticated".to_string(),
        };
        let claims = AccessClaims::new(&principal, self.token_ttl);
        let access_token =
            token::mint(&self.secret, &claims).map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Session {
            access_token,
            refresh_token: Some(Uuid::new_v4().simple().to_string()),
            expires_at: claims.expires_at(),
            principal,
        })
    }

    fn notify(&self, event: SessionEvent) {
        // no receivers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn fetch_rows(&self, table: &str, query: &RowQuery) -> Result<Vec<Value>, GatewayError> {
        self.wait_for_reads().await;
        let mut state = self.state.lock().await;
        Self::take_failure(&mut state)?;

        let rows: Vec<Value> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default();
        Ok(query.apply(rows))
    }

    async fn count_rows(&self, table: &str) -> Result<u64, GatewayError> {
        self.wait_for_reads().await;
        let mut state = self.state.lock().await;
        Self::take_failure(&mut state)?;
        Ok(state.tables.get(table).map(|rows| rows.len() as u64).unwrap_or(0))
    }

    async fn insert_row(&self, table: &str, row: Value) -> Result<Value, GatewayError> {
        let mut state = self.state.lock().await;
        Self::take_failure(&mut state)?;
        self.authorize_write(&state)?;

        let stored = self.stamp(row);
        state.tables.entry(table.to_string()).or_default().push(stored.clone());
        Ok(Value::Object(stored))
    }

    async fn update_row_by_id(&self, table: &str, id: &str, patch: Value) -> Result<Value, GatewayError> {
        let mut state = self.state.lock().await;
        Self::take_failure(&mut state)?;
        self.authorize_write(&state)?;

        let now = self.tick().to_rfc3339();
        let row = state
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|r| r.get("id").and_then(Value::as_str) == Some(id)))
            .ok_or_else(|| GatewayError::not_found(format!("{} row {}", table, id)))?;

        if let Value::Object(fields) = patch {
            for (k, v) in fields {
                if k != "id" && k != "created_at" {
                    row.insert(k, v);
                }
            }
        }
        row.insert("updated_at".into(), Value::String(now));
        Ok(Value::Object(row.clone()))
    }

    async fn upsert_row_by_key(&self, table: &str, key_column: &str, row: Value) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        Self::take_failure(&mut state)?;
        self.authorize_write(&state)?;

        let Value::Object(fields) = row else {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "upsert payload must be an object".into(),
            });
        };
        let key = fields
            .get(key_column)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                status: 400,
                message: format!("missing conflict column {}", key_column),
            })?;

        let now = self.tick().to_rfc3339();
        let rows = state.tables.entry(table.to_string()).or_default();
        match rows.iter_mut().find(|r| r.get(key_column) == Some(&key)) {
            Some(existing) => {
                for (k, v) in fields {
                    existing.insert(k, v);
                }
                existing.insert("updated_at".into(), Value::String(now));
            }
            None => rows.push(self.stamp(Value::Object(fields))),
        }
        Ok(())
    }

    async fn delete_row_by_id(&self, table: &str, id: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        Self::take_failure(&mut state)?;
        self.authorize_write(&state)?;

        let rows = state.tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
        if rows.len() == before {
            return Err(GatewayError::not_found(format!("{} row {}", table, id)));
        }
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, GatewayError> {
        let mut state = self.state.lock().await;
        Self::take_failure(&mut state)?;

        let expired = state
            .session
            .as_ref()
            .map(|s| s.is_expired(Utc::now()))
            .unwrap_or(false);
        if expired {
            state.session = None;
            drop(state);
            self.notify(SessionEvent::SignedOut);
            return Ok(None);
        }
        Ok(state.session.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_in(&self, email: &str, secret: &str) -> Result<Session, GatewayError> {
        let mut state = self.state.lock().await;
        Self::take_failure(&mut state)?;

        let user = state
            .users
            .get(email)
            .filter(|u| u.password == secret)
            .cloned()
            .ok_or(GatewayError::InvalidCredentials)?;
        if !user.confirmed {
            return Err(GatewayError::EmailNotConfirmed);
        }

        let session = self.issue_session(email, &user)?;
        state.session = Some(session.clone());
        drop(state);

        self.notify(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, _scope: SignOutScope) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        let failure = Self::take_failure(&mut state);
        // the local session is dropped whether or not the call succeeded
        state.session = None;
        drop(state);

        self.notify(SessionEvent::SignedOut);
        failure
    }
}
