use std::env;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::gateway::{Gateway, MemoryGateway, RestGateway};
use crate::models::SignOutScope;

/// Admin credentials for commands that write
#[derive(Args, Debug, Clone)]
pub struct AdminArgs {
    #[arg(long = "email", env = "CYBERFOLIO_ADMIN_EMAIL", help = "Admin account email")]
    pub email: String,

    #[arg(
        long = "password",
        env = "CYBERFOLIO_ADMIN_PASSWORD",
        hide_env_values = true,
        help = "Admin account password"
    )]
    pub password: String,
}

/// Resolved config plus the gateway every command talks through
pub struct CliContext {
    pub config: AppConfig,
    pub gateway: Arc<dyn Gateway>,
}

const OFFLINE_URL: &str = "http://127.0.0.1:54321";
const OFFLINE_KEY: &str = "offline";

impl CliContext {
    /// Hosted backend from the environment (`.env` already loaded)
    pub fn from_env() -> anyhow::Result<Self> {
        let config = AppConfig::from_env().context("invalid backend configuration")?;
        let gateway = RestGateway::new(&config.backend).context("failed to build backend client")?;
        Ok(Self {
            config,
            gateway: Arc::new(gateway),
        })
    }

    /// In-process store; backend settings are optional. The admin account is
    /// registered from the environment when both variables are set.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let config = AppConfig::from_lookup(|key| {
            env::var(key).ok().or_else(|| match key {
                "SUPABASE_URL" => Some(OFFLINE_URL.to_string()),
                "SUPABASE_ANON_KEY" => Some(OFFLINE_KEY.to_string()),
                _ => None,
            })
        })
        .context("invalid configuration")?;

        let gateway = MemoryGateway::new();
        match (env::var("CYBERFOLIO_ADMIN_EMAIL"), env::var("CYBERFOLIO_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => {
                gateway.add_user(&email, &password, true).await;
                tracing::info!("Registered in-memory admin {}", email);
            }
            _ => tracing::warn!("No admin credentials set; in-memory content is read-only"),
        }

        Ok(Self {
            config,
            gateway: Arc::new(gateway),
        })
    }

    /// Signs the admin in on a fresh session store
    pub async fn admin(&self, creds: &AdminArgs) -> anyhow::Result<SessionStore> {
        let session = SessionStore::new(self.gateway.clone());
        session.initialize().await;
        session
            .sign_in(&creds.email, &creds.password)
            .await
            .map_err(|e| anyhow::anyhow!(e.notice()))?;
        Ok(session)
    }

    /// Ends only this command's session, whatever scope the server uses; a
    /// failed call is logged, the local session ends regardless
    pub async fn release(&self, session: &SessionStore) {
        if let Err(e) = session.sign_out(SignOutScope::Local).await {
            tracing::warn!("Sign-out failed: {}", e);
        }
        session.shutdown().await;
    }
}
