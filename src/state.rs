use std::sync::Arc;

use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::gateway::Gateway;

/// Shared handler state: config, the injected gateway, and the session store
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn Gateway>,
    pub session: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: Arc<dyn Gateway>) -> Self {
        let session = SessionStore::new(gateway.clone());
        Self {
            config: Arc::new(config),
            gateway,
            session,
        }
    }
}
