use thiserror::Error;

/// Tagged failure returned by every gateway operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Email not confirmed")]
    EmailNotConfirmed,

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn not_found(what: impl Into<String>) -> Self {
        GatewayError::NotFound(what.into())
    }

    /// Message suitable for a transient user-facing notice
    pub fn notice(&self) -> String {
        match self {
            GatewayError::InvalidCredentials => {
                "Invalid email or password. Please check your credentials.".to_string()
            }
            GatewayError::EmailNotConfirmed => {
                "Please verify your email address before signing in".to_string()
            }
            GatewayError::Unauthorized(_) => "You are not allowed to make this change".to_string(),
            GatewayError::NotFound(what) => format!("{} not found", what),
            GatewayError::Transport(_) => "Could not reach the content service".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}
