use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use url::Url;

use crate::models::SignOutScope;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Hosted database/auth service credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: Url,
    #[serde(skip_serializing)]
    pub anon_key: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Where protected views send anonymous visitors
    pub login_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub sign_out_scope: SignOutScope,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing backend environment variable {0}. Please check your .env file.")]
    Missing(&'static str),

    #[error("Invalid backend URL format: {0}. Please ensure it starts with https:// and is a valid URL.")]
    InvalidUrl(String),

    #[error("Please replace the placeholder value of {0} in your .env file with your actual project settings.")]
    Placeholder(&'static str),
}

const URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];
const URL_PLACEHOLDER: &str = "your-project-ref";
const KEY_PLACEHOLDER: &str = "your_supabase_anon_key_here";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let backend = BackendConfig::from_lookup(&lookup, environment)?;

        // Set defaults based on environment, then override with specific env vars
        let (server, auth) = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };

        Ok(Self {
            environment,
            backend,
            server,
            auth,
        }
        .with_overrides(&lookup))
    }

    fn with_overrides(mut self, lookup: &impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("CYBERFOLIO_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = lookup("CYBERFOLIO_CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = lookup("CYBERFOLIO_LOGIN_PATH") {
            self.server.login_path = v;
        }
        if let Some(v) = lookup("CYBERFOLIO_REQUEST_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = v.parse().unwrap_or(self.backend.request_timeout_secs);
        }
        if let Some(v) = lookup("CYBERFOLIO_SIGN_OUT_SCOPE") {
            self.auth.sign_out_scope = match v.as_str() {
                "global" => SignOutScope::Global,
                "local" => SignOutScope::Local,
                _ => self.auth.sign_out_scope,
            };
        }
        self
    }

    fn development() -> (ServerConfig, AuthConfig) {
        (
            ServerConfig {
                port: 3000,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                login_path: "/admin/login".to_string(),
            },
            AuthConfig {
                sign_out_scope: SignOutScope::Local,
            },
        )
    }

    fn staging() -> (ServerConfig, AuthConfig) {
        (
            ServerConfig {
                port: 8080,
                cors_origins: vec![],
                login_path: "/admin/login".to_string(),
            },
            AuthConfig {
                sign_out_scope: SignOutScope::Global,
            },
        )
    }

    fn production() -> (ServerConfig, AuthConfig) {
        (
            ServerConfig {
                port: 8080,
                cors_origins: vec![],
                login_path: "/admin/login".to_string(),
            },
            AuthConfig {
                sign_out_scope: SignOutScope::Global,
            },
        )
    }
}

impl BackendConfig {
    fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let raw_url = first_present(lookup, &URL_VARS).ok_or(ConfigError::Missing(URL_VARS[0]))?;
        let anon_key = first_present(lookup, &KEY_VARS).ok_or(ConfigError::Missing(KEY_VARS[0]))?;

        let url = Url::parse(raw_url.trim()).map_err(|_| ConfigError::InvalidUrl(raw_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(raw_url));
        }
        if raw_url.contains(URL_PLACEHOLDER) {
            return Err(ConfigError::Placeholder(URL_VARS[0]));
        }
        if anon_key.contains(KEY_PLACEHOLDER) {
            return Err(ConfigError::Placeholder(KEY_VARS[0]));
        }

        let request_timeout_secs = match environment {
            Environment::Development => 30,
            Environment::Staging | Environment::Production => 10,
        };

        Ok(Self {
            url,
            anon_key: anon_key.trim().to_string(),
            request_timeout_secs,
        })
    }
}

fn first_present(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| lookup(k))
        .find(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.sign_out_scope, SignOutScope::Local);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.auth.sign_out_scope, SignOutScope::Global);
    }

    #[test]
    fn vite_variables_are_accepted() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("VITE_SUPABASE_URL", "https://abc.supabase.co"),
            ("VITE_SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();
        assert_eq!(config.backend.url.host_str(), Some("abc.supabase.co"));
    }

    #[test]
    fn missing_key_refuses_to_start() {
        let err = AppConfig::from_lookup(lookup_from(&[("SUPABASE_URL", "https://abc.supabase.co")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn malformed_url_refuses_to_start() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn placeholders_refuse_to_start() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://your-project-ref.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Placeholder("SUPABASE_URL"));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", "your_supabase_anon_key_here"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Placeholder("SUPABASE_ANON_KEY"));
    }
}
