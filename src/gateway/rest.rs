use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex, RwLock};

use super::{Gateway, GatewayError, RowQuery, SESSION_EVENT_CAPACITY};
use crate::auth::token;
use crate::config::BackendConfig;
use crate::models::{Principal, Session, SessionEvent, SignOutScope};

/// PostgREST + GoTrue client for the hosted backend.
///
/// The session lives in memory only; a restart starts signed out.
pub struct RestGateway {
    http: Client,
    base_url: String,
    api_key: String,
    session: RwLock<Option<Session>>,
    /// One refresh grant at a time; later callers pick up its result
    refresh_lock: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

impl RestGateway {
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: config.url.as_str().trim_end_matches('/').to_string(),
            api_key: config.anon_key.clone(),
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            events,
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Access token of the live session, refreshed first once it has expired.
    /// `None` when signed out or when the refresh was refused.
    async fn live_token(&self) -> Option<String> {
        let current = self.session.read().await.clone()?;
        if !current.is_expired(Utc::now()) {
            return Some(current.access_token);
        }
        self.get_session().await.ok().flatten().map(|s| s.access_token)
    }

    /// Signed-in requests carry the user's token, anonymous ones the public key
    async fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self
            .live_token()
            .await
            .unwrap_or_else(|| self.api_key.clone());

        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", bearer))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }

    async fn rows_or_not_found(&self, response: Response, what: String) -> Result<Value, GatewayError> {
        let rows: Vec<Value> = response.json().await?;
        rows.into_iter().next().ok_or(GatewayError::NotFound(what))
    }

    fn notify(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    async fn token_grant(&self, grant: &str, body: Value) -> Result<Session, GatewayError> {
        let response = self
            .send(
                self.http
                    .post(self.auth_url("token"))
                    .query(&[("grant_type", grant)])
                    .header("apikey", &self.api_key)
                    .json(&body),
            )
            .await?;
        let token: TokenResponse = response.json().await?;
        Ok(session_from_token(token))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, GatewayError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }
}

fn session_from_token(token: TokenResponse) -> Session {
    let expires_at = token
        .expires_at
        .and_then(|at| Utc.timestamp_opt(at, 0).single())
        .or_else(|| token.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)))
        .or_else(|| token::peek(&token.access_token).ok().and_then(|c| c.expires_at()));

    Session {
        principal: Principal {
            id: token.user.id,
            email: token.user.email.unwrap_or_default(),
            role: token.user.role.unwrap_or_else(|| "authenticated".to_string()),
        },
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at,
    }
}

/// Maps PostgREST / GoTrue error bodies onto the gateway taxonomy
async fn error_from_response(response: Response) -> GatewayError {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
        .to_string();
    let code = ["error_code", "code", "error"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .unwrap_or_default();

    classify(status, code, &message)
}

fn classify(status: StatusCode, code: &str, message: &str) -> GatewayError {
    let lowered = message.to_ascii_lowercase();
    if code == "email_not_confirmed" || lowered.contains("email not confirmed") {
        return GatewayError::EmailNotConfirmed;
    }
    if code == "invalid_credentials"
        || code == "invalid_grant"
        || lowered.contains("invalid login credentials")
    {
        return GatewayError::InvalidCredentials;
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized(message.to_string()),
        // 42501: insufficient privilege (row-level security)
        _ if code == "42501" => GatewayError::Unauthorized(message.to_string()),
        StatusCode::NOT_FOUND => GatewayError::NotFound(message.to_string()),
        _ => GatewayError::Rejected {
            status: status.as_u16(),
            message: message.to_string(),
        },
    }
}

/// `Content-Range: 0-9/42` or `*/42`
fn parse_total(content_range: &str) -> Option<u64> {
    content_range.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl Gateway for RestGateway {
    async fn fetch_rows(&self, table: &str, query: &RowQuery) -> Result<Vec<Value>, GatewayError> {
        tracing::debug!("GET {} {:?}", table, query);
        let builder = self
            .request(Method::GET, self.rest_url(table))
            .await
            .query(&query.to_params());
        let response = self.send(builder).await?;
        Ok(response.json().await?)
    }

    async fn count_rows(&self, table: &str) -> Result<u64, GatewayError> {
        let builder = self
            .request(Method::HEAD, self.rest_url(table))
            .await
            .query(&[("select", "id")])
            .header("Prefer", "count=exact");
        let response = self.send(builder).await?;
        response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total)
            .ok_or_else(|| GatewayError::Decode("missing Content-Range count".to_string()))
    }

    async fn insert_row(&self, table: &str, row: Value) -> Result<Value, GatewayError> {
        tracing::debug!("INSERT {}", table);
        let builder = self
            .request(Method::POST, self.rest_url(table))
            .await
            .header("Prefer", "return=representation")
            .json(&json!([row]));
        let response = self.send(builder).await?;
        self.rows_or_not_found(response, format!("{} insert", table)).await
    }

    async fn update_row_by_id(&self, table: &str, id: &str, patch: Value) -> Result<Value, GatewayError> {
        tracing::debug!("UPDATE {} id={}", table, id);
        let builder = self
            .request(Method::PATCH, self.rest_url(table))
            .await
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let response = self.send(builder).await?;
        self.rows_or_not_found(response, format!("{} row {}", table, id)).await
    }

    async fn upsert_row_by_key(&self, table: &str, key_column: &str, row: Value) -> Result<(), GatewayError> {
        tracing::debug!("UPSERT {} on {}", table, key_column);
        let builder = self
            .request(Method::POST, self.rest_url(table))
            .await
            .query(&[("on_conflict", key_column)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&row);
        self.send(builder).await.map(|_| ())
    }

    async fn delete_row_by_id(&self, table: &str, id: &str) -> Result<(), GatewayError> {
        tracing::debug!("DELETE {} id={}", table, id);
        let builder = self
            .request(Method::DELETE, self.rest_url(table))
            .await
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation");
        let response = self.send(builder).await?;
        self.rows_or_not_found(response, format!("{} row {}", table, id))
            .await
            .map(|_| ())
    }

    async fn get_session(&self) -> Result<Option<Session>, GatewayError> {
        let _refreshing = self.refresh_lock.lock().await;
        let current = self.session.read().await.clone();
        let Some(session) = current else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let refreshed = match session.refresh_token.as_deref() {
            Some(refresh_token) => self.refresh(refresh_token).await,
            None => Err(GatewayError::Unauthorized("session expired".to_string())),
        };
        match refreshed {
            Ok(fresh) => {
                *self.session.write().await = Some(fresh.clone());
                tracing::info!("Refreshed session for {}", fresh.principal.email);
                self.notify(SessionEvent::TokenRefreshed(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) => {
                tracing::warn!("Session refresh failed, signing out locally: {}", e);
                *self.session.write().await = None;
                self.notify(SessionEvent::SignedOut);
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn sign_in(&self, email: &str, secret: &str) -> Result<Session, GatewayError> {
        let session = self
            .token_grant("password", json!({ "email": email, "password": secret }))
            .await?;
        *self.session.write().await = Some(session.clone());
        self.notify(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, scope: SignOutScope) -> Result<(), GatewayError> {
        let previous = self.session.write().await.take();
        let result = match previous {
            Some(session) => {
                let builder = self
                    .http
                    .post(self.auth_url("logout"))
                    .query(&[("scope", scope.as_str())])
                    .header("apikey", &self.api_key)
                    .header(header::AUTHORIZATION, format!("Bearer {}", session.access_token));
                self.send(builder).await.map(|_| ())
            }
            None => Ok(()),
        };
        self.notify(SessionEvent::SignedOut);
        result
    }
}
