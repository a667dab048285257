mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use cyberfolio_api::auth::{AuthState, SessionStore};
use cyberfolio_api::cli::config::{AdminArgs, CliContext};
use cyberfolio_api::config::AppConfig;
use cyberfolio_api::gateway::{Gateway, GatewayError, RestGateway, RowQuery};
use cyberfolio_api::models::{SessionEvent, SignOutScope};
use cyberfolio_api::AppState;

use common::{MockBackend, ADMIN_EMAIL, ADMIN_PASSWORD, MOCK_TOKEN, REFRESHED_TOKEN};

async fn gateway_for(backend: &MockBackend) -> Result<RestGateway> {
    let config = common::test_config(&backend.base_url);
    Ok(RestGateway::new(&config.backend)?)
}

#[tokio::test]
async fn ping_reaches_the_backend() -> Result<()> {
    let backend = MockBackend::start().await?;
    let gateway = gateway_for(&backend).await?;

    common::assert_reachable(&gateway).await?;
    let requests = backend.requests();
    assert_eq!(requests[0].0, "GET /rest/v1/section_content?limit=1&select=*");
    Ok(())
}

#[tokio::test]
async fn fetch_sends_filters_and_order() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend.seed(
        "tryhackme_rooms",
        vec![
            json!({ "title": "Blue", "difficulty": "Easy", "created_at": "2024-01-01T00:00:01Z" }),
            json!({ "title": "Relevant", "difficulty": "Medium", "created_at": "2024-01-01T00:00:02Z" }),
            json!({ "title": "Ice", "difficulty": "Easy", "created_at": "2024-01-01T00:00:03Z" }),
        ],
    );
    let gateway = gateway_for(&backend).await?;

    let query = RowQuery::new().eq("difficulty", "Easy").order("created_at desc");
    let rows = gateway.fetch_rows("tryhackme_rooms", &query).await?;

    let titles: Vec<_> = rows.iter().map(|r| r["title"].as_str().unwrap_or_default()).collect();
    assert_eq!(titles, vec!["Ice", "Blue"]);
    assert_eq!(
        backend.requests()[0].0,
        "GET /rest/v1/tryhackme_rooms?difficulty=eq.Easy&order=created_at.desc&select=*"
    );
    Ok(())
}

#[tokio::test]
async fn anonymous_insert_is_refused_by_policy() -> Result<()> {
    let backend = MockBackend::start().await?;
    let gateway = gateway_for(&backend).await?;

    let err = gateway
        .insert_row("hackthebox_machines", json!({ "machine_name": "Lame" }))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unauthorized(_)));
    assert!(backend.state.lock().unwrap().tables.get("hackthebox_machines").is_none());
    Ok(())
}

#[tokio::test]
async fn sign_in_then_write_then_sign_out() -> Result<()> {
    let backend = MockBackend::start().await?;
    let gateway = gateway_for(&backend).await?;

    let session = gateway.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    assert_eq!(session.access_token, MOCK_TOKEN);
    assert_eq!(session.principal.email, ADMIN_EMAIL);
    assert!(session.expires_at.is_some());
    assert!(gateway.get_session().await?.is_some());

    let created = gateway
        .insert_row("hackthebox_machines", json!({ "machine_name": "Lame", "points": 20 }))
        .await?;
    assert_eq!(created["machine_name"], "Lame");
    assert!(created["id"].is_string());

    let id = created["id"].as_str().unwrap_or_default().to_string();
    let updated = gateway
        .update_row_by_id("hackthebox_machines", &id, json!({ "points": 30 }))
        .await?;
    assert_eq!(updated["points"], 30);
    assert_eq!(gateway.count_rows("hackthebox_machines").await?, 1);

    gateway.sign_out(SignOutScope::Global).await?;
    assert!(gateway.get_session().await?.is_none());
    assert_eq!(backend.state.lock().unwrap().logout_scopes, vec!["global".to_string()]);
    Ok(())
}

#[tokio::test]
async fn wrong_password_maps_to_invalid_credentials() -> Result<()> {
    let backend = MockBackend::start().await?;
    let gateway = gateway_for(&backend).await?;

    let err = gateway.sign_in(ADMIN_EMAIL, "guess").await.unwrap_err();
    assert_eq!(err, GatewayError::InvalidCredentials);
    assert!(gateway.get_session().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn upsert_merges_on_the_key_column() -> Result<()> {
    let backend = MockBackend::start().await?;
    let gateway = gateway_for(&backend).await?;
    gateway.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    gateway
        .upsert_row_by_key("static_content", "key", json!({ "key": "about-me", "content": "v1" }))
        .await?;
    gateway
        .upsert_row_by_key("static_content", "key", json!({ "key": "about-me", "content": "v2" }))
        .await?;

    let rows = gateway
        .fetch_rows("static_content", &RowQuery::new().eq("key", "about-me"))
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["content"], "v2");

    let requests = backend.requests();
    let (line, prefer) = requests
        .iter()
        .find(|(line, _)| line.starts_with("POST"))
        .cloned()
        .unwrap_or_default();
    assert_eq!(line, "POST /rest/v1/static_content?on_conflict=key");
    assert_eq!(prefer.as_deref(), Some("resolution=merge-duplicates,return=minimal"));
    Ok(())
}

#[tokio::test]
async fn deleting_missing_row_is_not_found() -> Result<()> {
    let backend = MockBackend::start().await?;
    let gateway = gateway_for(&backend).await?;
    gateway.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    let err = gateway.delete_row_by_id("ctf_challenges", "nope").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn api_login_and_content_save_over_rest() -> Result<()> {
    let backend = MockBackend::start().await?;
    let config = common::test_config(&backend.base_url);
    let gateway: Arc<dyn Gateway> = Arc::new(RestGateway::new(&config.backend)?);
    let state = AppState::new(config, gateway);
    state.session.initialize().await;
    let router = cyberfolio_api::app(state.clone());

    let login = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }).to_string(),
        ))?;
    let response = router.clone().oneshot(login).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let save = axum::http::Request::builder()
        .method(Method::PUT)
        .uri("/api/content/about-me")
        .header("authorization", format!("Bearer {}", MOCK_TOKEN))
        .header("content-type", "application/json")
        .body(axum::body::Body::from(json!({ "content": "Hello" }).to_string()))?;
    let response = router.oneshot(save).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = backend.state.lock().unwrap().tables.get("static_content").cloned().unwrap_or_default();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["content"], "Hello");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_refreshed_before_the_next_request() -> Result<()> {
    let backend = MockBackend::start().await?;
    backend.state.lock().unwrap().issue_expired = true;
    let gateway = Arc::new(gateway_for(&backend).await?);
    let store = SessionStore::new(gateway.clone());
    store.initialize().await;
    store.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    let mut events = gateway.subscribe();

    gateway.fetch_rows("ctf_challenges", &RowQuery::new()).await?;
    gateway.fetch_rows("ctf_challenges", &RowQuery::new()).await?;

    assert_eq!(backend.grants(), vec!["password", "refresh_token"]);
    let refreshed = Some(format!("Bearer {}", REFRESHED_TOKEN));
    assert_eq!(backend.bearers(), vec![refreshed.clone(), refreshed]);
    match events.recv().await? {
        SessionEvent::TokenRefreshed(session) => assert_eq!(session.access_token, REFRESHED_TOKEN),
        other => anyhow::bail!("unexpected session event {:?}", other),
    }

    // still signed in, and the bearer handed out at sign-in keeps working
    assert!(matches!(store.snapshot().state, AuthState::Authenticated(_)));
    assert!(store.matches_token(MOCK_TOKEN));
    Ok(())
}

#[tokio::test]
async fn refused_refresh_signs_the_store_out() -> Result<()> {
    let backend = MockBackend::start().await?;
    {
        let mut state = backend.state.lock().unwrap();
        state.issue_expired = true;
        state.refuse_refresh = true;
    }
    let gateway = Arc::new(gateway_for(&backend).await?);
    let store = SessionStore::new(gateway.clone());
    store.initialize().await;
    store.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await?;
    let mut rx = store.watch();

    // the read still goes out, as a visitor
    gateway.fetch_rows("ctf_challenges", &RowQuery::new()).await?;
    assert_eq!(backend.bearers(), vec![Some("Bearer test-anon-key".to_string())]);

    tokio::time::timeout(
        Duration::from_secs(2),
        rx.wait_for(|snap| snap.state == AuthState::Anonymous),
    )
    .await??;
    assert!(gateway.get_session().await?.is_none());
    assert!(!store.matches_token(MOCK_TOKEN));
    Ok(())
}

#[tokio::test]
async fn cli_session_signs_out_locally_under_global_server_scope() -> Result<()> {
    let backend = MockBackend::start().await?;
    let url = backend.base_url.clone();
    let config = AppConfig::from_lookup(move |key| match key {
        "SUPABASE_URL" => Some(url.clone()),
        "SUPABASE_ANON_KEY" => Some("test-anon-key".to_string()),
        "CYBERFOLIO_SIGN_OUT_SCOPE" => Some("global".to_string()),
        _ => None,
    })?;
    assert_eq!(config.auth.sign_out_scope, SignOutScope::Global);

    let gateway: Arc<dyn Gateway> = Arc::new(RestGateway::new(&config.backend)?);
    let cli = CliContext { config, gateway };
    let creds = AdminArgs {
        email: ADMIN_EMAIL.to_string(),
        password: ADMIN_PASSWORD.to_string(),
    };

    let session = cli.admin(&creds).await?;
    cli.release(&session).await;
    assert_eq!(backend.state.lock().unwrap().logout_scopes, vec!["local".to_string()]);
    Ok(())
}
