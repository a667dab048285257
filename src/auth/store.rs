use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast::error::RecvError, watch, Mutex};
use tokio::task::JoinHandle;

use crate::gateway::{Gateway, GatewayError};
use crate::models::{Principal, Session, SessionEvent, SignOutScope};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "principal", rename_all = "snake_case")]
pub enum AuthState {
    /// Initial session check still outstanding; not the same as signed out
    Initializing,
    Authenticated(Principal),
    Anonymous,
}

/// Whether mutation affordances may be rendered. Derived once from the
/// session store and handed to every view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capability {
    can_edit: bool,
}

impl Capability {
    pub const VISITOR: Capability = Capability { can_edit: false };
    pub const ADMIN: Capability = Capability { can_edit: true };

    pub fn can_edit(self) -> bool {
        self.can_edit
    }
}

/// Outcome of guarding a protected view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// Still loading; show a spinner, never redirect
    Pending,
    Redirect(String),
    Granted(Principal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub state: AuthState,
    busy: bool,
    /// Bearer handed to the client that signed in. It is the session's
    /// first access token and survives later token refreshes.
    access_token: Option<String>,
}

impl AuthSnapshot {
    fn initializing() -> Self {
        Self {
            state: AuthState::Initializing,
            busy: false,
            access_token: None,
        }
    }

    pub fn loading(&self) -> bool {
        self.busy || matches!(self.state, AuthState::Initializing)
    }

    pub fn principal(&self) -> Option<&Principal> {
        match &self.state {
            AuthState::Authenticated(p) => Some(p),
            _ => None,
        }
    }

    /// Bearer token of the live session, handed back to the client that signed in
    pub fn access_token(&self) -> Option<&str> {
        self.principal().and(self.access_token.as_deref())
    }

    pub fn capability(&self) -> Capability {
        if self.principal().is_some() {
            Capability::ADMIN
        } else {
            Capability::VISITOR
        }
    }

    pub fn access(&self, login_path: &str) -> Access {
        if self.loading() {
            return Access::Pending;
        }
        match self.principal() {
            Some(p) => Access::Granted(p.clone()),
            None => Access::Redirect(login_path.to_string()),
        }
    }

    fn authenticate(&mut self, session: &Session) {
        self.state = AuthState::Authenticated(session.principal.clone());
        self.access_token = Some(session.access_token.clone());
    }

    /// Same user with a new token keeps its bearer; anyone else starts over
    fn refresh(&mut self, session: &Session) {
        match self.principal() {
            Some(p) if p.id == session.principal.id => {
                self.state = AuthState::Authenticated(session.principal.clone());
            }
            _ => self.authenticate(session),
        }
    }

    fn clear(&mut self) {
        self.state = AuthState::Anonymous;
        self.access_token = None;
    }
}

/// Process-wide auth state fed by the gateway's session notifications.
///
/// Clones share the same state. The external service's session is the
/// ground truth; the store never signs anyone out on its own.
#[derive(Clone)]
pub struct SessionStore {
    gateway: Arc<dyn Gateway>,
    state: Arc<watch::Sender<AuthSnapshot>>,
    listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (state, _) = watch::channel(AuthSnapshot::initializing());
        Self {
            gateway,
            state: Arc::new(state),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribes to session changes, then resolves the current session.
    /// A notification that lands first wins over the initial check.
    pub async fn initialize(&self) {
        self.listen().await;

        let initial = match self.gateway.get_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Initial session check failed: {}", e);
                None
            }
        };

        self.state.send_if_modified(|snap| {
            if snap.state != AuthState::Initializing {
                return false;
            }
            match &initial {
                Some(session) => snap.authenticate(session),
                None => snap.clear(),
            }
            true
        });
        tracing::info!("Auth session initialized: {}", describe(&self.snapshot().state));
    }

    async fn listen(&self) {
        let mut guard = self.listener.lock().await;
        if guard.is_some() {
            return;
        }

        let mut events = self.gateway.subscribe();
        let state = self.state.clone();
        *guard = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => apply_event(&state, &event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Session listener lagged by {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Stops listening for session changes
    pub async fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every transition
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    pub fn capability(&self) -> Capability {
        self.state.borrow().capability()
    }

    pub fn access(&self, login_path: &str) -> Access {
        self.state.borrow().access(login_path)
    }

    /// Re-checks the gateway session, which refreshes an expired token. A
    /// session that could not be kept moves the store to anonymous at once.
    pub async fn revalidate(&self) -> AuthSnapshot {
        if self.snapshot().principal().is_none() {
            return self.snapshot();
        }
        match self.gateway.get_session().await {
            Ok(Some(session)) => self.state.send_modify(|snap| snap.refresh(&session)),
            Ok(None) => {
                self.state.send_modify(|snap| snap.clear());
                tracing::info!("Session ended; store is anonymous");
            }
            Err(e) => tracing::warn!("Session check failed: {}", e),
        }
        self.snapshot()
    }

    /// True when `token` is the live session's access token
    pub fn matches_token(&self, token: &str) -> bool {
        let snap = self.state.borrow();
        snap.principal().is_some() && snap.access_token.as_deref() == Some(token)
    }

    pub async fn sign_in(&self, email: &str, secret: &str) -> Result<Principal, GatewayError> {
        self.state.send_modify(|snap| snap.busy = true);

        match self.gateway.sign_in(email, secret).await {
            Ok(session) => {
                self.state.send_modify(|snap| {
                    snap.authenticate(&session);
                    snap.busy = false;
                });
                tracing::info!("Signed in as {}", session.principal.email);
                Ok(session.principal)
            }
            Err(e) => {
                self.state.send_modify(|snap| snap.busy = false);
                tracing::warn!("Sign-in failed for {}: {}", email, e);
                Err(e)
            }
        }
    }

    /// Always ends anonymous; a gateway failure is still reported
    pub async fn sign_out(&self, scope: SignOutScope) -> Result<(), GatewayError> {
        self.state.send_modify(|snap| snap.busy = true);

        let result = self.gateway.sign_out(scope).await;
        self.state.send_modify(|snap| {
            snap.clear();
            snap.busy = false;
        });

        match &result {
            Ok(()) => tracing::info!("Signed out ({} scope)", scope.as_str()),
            Err(e) => tracing::warn!("Sign-out call failed, cleared local session anyway: {}", e),
        }
        result
    }
}

fn apply_event(state: &watch::Sender<AuthSnapshot>, event: &SessionEvent) {
    state.send_modify(|snap| match event {
        SessionEvent::SignedIn(session) => snap.authenticate(session),
        SessionEvent::TokenRefreshed(session) => snap.refresh(session),
        SessionEvent::SignedOut => snap.clear(),
    });
    tracing::debug!("Session event applied: {}", describe(&state.borrow().state));
}

fn describe(state: &AuthState) -> String {
    match state {
        AuthState::Initializing => "initializing".to_string(),
        AuthState::Authenticated(p) => format!("authenticated as {}", p.email),
        AuthState::Anonymous => "anonymous".to_string(),
    }
}
