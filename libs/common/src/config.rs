//! Application configuration
//!
//! Settings are layered: built-in defaults first, then `TASKS_*` environment
//! variables. List-valued settings take comma-separated values.

use config::{Config, ConfigError, Environment, Map};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_TOKEN_KEY: &str = "authToken";
pub const DEFAULT_LOGIN_PATH: &str = "/login";

const ENV_PREFIX: &str = "TASKS";

/// Configuration shared by the client library and the web shell
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Base URL of the remote task API, without trailing slash
    pub api_base_url: String,
    /// Socket address the web shell binds to
    pub listen_addr: String,
    /// Storage key and cookie name the bearer token is persisted under
    pub token_key: String,
    /// Login entry point unauthenticated requests are redirected to
    pub login_path: String,
    /// Path prefixes that require a persisted token
    pub protected_routes: Vec<String>,
    /// Paths that always pass the route guard
    pub public_routes: Vec<String>,
    /// Optional file backing the durable credential store
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `TASKS_API_BASE_URL` (default: "http://localhost:8000/api")
    /// - `TASKS_LISTEN_ADDR` (default: "0.0.0.0:3000")
    /// - `TASKS_TOKEN_KEY` (default: "authToken")
    /// - `TASKS_LOGIN_PATH` (default: "/login")
    /// - `TASKS_PROTECTED_ROUTES` (default: "/")
    /// - `TASKS_PUBLIC_ROUTES` (default: "/health,/signup")
    /// - `TASKS_CREDENTIALS_FILE` (default: unset, in-memory store)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load configuration, reading variables from `vars` instead of the process
    /// environment when given
    pub fn load(vars: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let environment = Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("protected_routes")
            .with_list_parse_key("public_routes")
            .source(vars);

        let config: AppConfig = Config::builder()
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("listen_addr", DEFAULT_LISTEN_ADDR)?
            .set_default("token_key", DEFAULT_TOKEN_KEY)?
            .set_default("login_path", DEFAULT_LOGIN_PATH)?
            .set_default("protected_routes", vec!["/"])?
            .set_default("public_routes", vec!["/health", "/signup"])?
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();

        if self.api_base_url.is_empty() {
            return Err(ConfigError::Message("api_base_url must not be empty".into()));
        }
        if self.token_key.is_empty() {
            return Err(ConfigError::Message("token_key must not be empty".into()));
        }
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::Message(format!(
                "login_path must start with '/': {}",
                self.login_path
            )));
        }

        Ok(self)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            protected_routes: vec!["/".to_string()],
            public_routes: vec!["/health".to_string(), "/signup".to_string()],
            credentials_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::load(Some(Map::new())).expect("Failed to load config");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::load(Some(vars(&[
            ("TASKS_API_BASE_URL", "https://tasks.example.com/api/"),
            ("TASKS_TOKEN_KEY", "sessionToken"),
            ("TASKS_PROTECTED_ROUTES", "/,/tasks"),
            ("TASKS_CREDENTIALS_FILE", "/tmp/credentials.json"),
        ])))
        .expect("Failed to load config");

        assert_eq!(config.api_base_url, "https://tasks.example.com/api");
        assert_eq!(config.token_key, "sessionToken");
        assert_eq!(config.protected_routes, vec!["/", "/tasks"]);
        assert_eq!(
            config.credentials_file,
            Some(PathBuf::from("/tmp/credentials.json"))
        );
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
    }

    #[test]
    fn test_rejects_relative_login_path() {
        let result = AppConfig::load(Some(vars(&[("TASKS_LOGIN_PATH", "login")])));
        assert!(result.is_err());
    }
}
