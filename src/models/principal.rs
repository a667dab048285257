use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in admin identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    /// Authentication-state tag reported by the auth service, e.g. `authenticated`
    pub role: String,
}

impl Principal {
    /// Local part of the email, used for the dashboard greeting
    pub fn handle(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// Live auth session held by the gateway; never written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub principal: Principal,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Session-change notifications pushed by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignOutScope {
    /// Only this client's session
    #[default]
    Local,
    /// Every session of the user
    Global,
}

impl SignOutScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignOutScope::Local => "local",
            SignOutScope::Global => "global",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn principal() -> Principal {
        Principal {
            id: "u1".into(),
            email: "admin@example.com".into(),
            role: "authenticated".into(),
        }
    }

    #[test]
    fn handle_is_local_part() {
        assert_eq!(principal().handle(), "admin");
    }

    #[test]
    fn session_without_expiry_never_expires() {
        let session = Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: None,
            principal: principal(),
        };
        assert!(!session.is_expired(Utc::now() + Duration::days(365)));
    }

    #[test]
    fn session_expires_at_boundary() {
        let now = Utc::now();
        let session = Session {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Some(now),
            principal: principal(),
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
