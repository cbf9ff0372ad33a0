//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Secret used when none is configured. Only suitable for local development.
pub const DEV_JWT_SECRET: &str = "dev_secret_change_me";

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Token and access-gate settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// How long a storage call waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Token and access-gate configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Whether `/events` requires a valid bearer token.
    #[serde(default)]
    pub require_auth: bool,

    /// HMAC secret for signing and verifying tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Issuer written into every token.
    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,

    /// Token lifetime in seconds. Default: 86400 (24 hours).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,

    /// Whether to mount the credential-less `POST /token` endpoint.
    #[serde(default = "default_issue_dev_tokens")]
    pub issue_dev_tokens: bool,
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    /// Returns `true` when the built-in development secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("require_auth", &self.require_auth)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("issue_dev_tokens", &self.issue_dev_tokens)
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "c2_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "c2.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_jwt_issuer() -> String {
    "humanitarian-cps".to_string()
}

fn default_token_ttl_seconds() -> u64 {
    24 * 60 * 60
}

fn default_issue_dev_tokens() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            jwt_secret: default_jwt_secret(),
            jwt_issuer: default_jwt_issuer(),
            token_ttl_seconds: default_token_ttl_seconds(),
            issue_dev_tokens: default_issue_dev_tokens(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `C2_HOST`, `C2_PORT` override `server.host` / `server.port`
/// - `C2_HTTP_ADDR` overrides both, given as `host:port`
/// - `C2_DB_PATH` overrides `database.path`
/// - `C2_DB_BUSY_TIMEOUT_MS`, `C2_DB_POOL_MAX_SIZE` override the pool tunables
/// - `C2_REQUIRE_AUTH` overrides `auth.require_auth`
/// - `C2_JWT_SECRET`, `C2_JWT_ISSUER` override the signing settings
/// - `C2_TOKEN_TTL_SECONDS` overrides `auth.token_ttl_seconds`
/// - `C2_ISSUE_DEV_TOKENS` overrides `auth.issue_dev_tokens`
/// - `C2_LOG_LEVEL`, `C2_LOG_JSON` override the logging settings
///
/// Boolean variables accept "true" or "1"; anything else is false.
/// Unparseable numeric or address values are ignored.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

fn env_flag(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Applies overrides looked up through `var`.
pub fn apply_env_overrides<F>(config: &mut Config, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = var("C2_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = host;
    }
    if let Some(port) = var("C2_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = port;
    }
    if let Some(addr) = var("C2_HTTP_ADDR").and_then(|v| v.parse::<SocketAddr>().ok()) {
        config.server.host = addr.ip();
        config.server.port = addr.port();
    }
    if let Some(path) = var("C2_DB_PATH") {
        config.database.path = path;
    }
    if let Some(ms) = var("C2_DB_BUSY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.database.busy_timeout_ms = ms;
    }
    if let Some(size) = var("C2_DB_POOL_MAX_SIZE").and_then(|v| v.parse().ok()) {
        config.database.pool_max_size = size;
    }
    if let Some(flag) = var("C2_REQUIRE_AUTH") {
        config.auth.require_auth = env_flag(&flag);
    }
    if let Some(secret) = var("C2_JWT_SECRET").filter(|v| !v.is_empty()) {
        config.auth.jwt_secret = secret;
    }
    if let Some(issuer) = var("C2_JWT_ISSUER").filter(|v| !v.is_empty()) {
        config.auth.jwt_issuer = issuer;
    }
    if let Some(ttl) = var("C2_TOKEN_TTL_SECONDS").and_then(|v| v.parse().ok()) {
        config.auth.token_ttl_seconds = ttl;
    }
    if let Some(flag) = var("C2_ISSUE_DEV_TOKENS") {
        config.auth.issue_dev_tokens = env_flag(&flag);
    }
    if let Some(level) = var("C2_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("C2_LOG_JSON") {
        config.logging.json = env_flag(&json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.database.path, "c2.db");
        assert!(!config.auth.require_auth);
        assert!(config.auth.uses_dev_secret());
        assert_eq!(config.auth.jwt_issuer, "humanitarian-cps");
        assert_eq!(config.auth.token_ttl(), Duration::from_secs(86_400));
        assert!(config.auth.issue_dev_tokens);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [auth]
            require_auth = true
            jwt_secret = "from-file"

            [database]
            path = "/var/lib/c2/events.db"
            "#,
        )
        .expect("toml should parse");

        assert!(config.auth.require_auth);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.jwt_issuer, "humanitarian-cps");
        assert_eq!(config.database.path, "/var/lib/c2/events.db");
        assert_eq!(config.database.pool_max_size, 8);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            lookup(&[
                ("C2_HTTP_ADDR", "0.0.0.0:9090"),
                ("C2_DB_PATH", "/tmp/c2.db"),
                ("C2_REQUIRE_AUTH", "true"),
                ("C2_JWT_SECRET", "s3cret"),
                ("C2_JWT_ISSUER", "field-hq"),
                ("C2_ISSUE_DEV_TOKENS", "0"),
                ("C2_LOG_JSON", "1"),
            ]),
        );

        assert_eq!(config.server.bind_addr().to_string(), "0.0.0.0:9090");
        assert_eq!(config.database.path, "/tmp/c2.db");
        assert!(config.auth.require_auth);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.auth.jwt_issuer, "field-hq");
        assert!(!config.auth.issue_dev_tokens);
        assert!(config.logging.json);
    }

    #[test]
    fn unparseable_env_values_are_ignored() {
        let mut config = Config::default();
        apply_env_overrides(
            &mut config,
            lookup(&[
                ("C2_PORT", "eighty"),
                ("C2_HTTP_ADDR", "nowhere"),
                ("C2_JWT_SECRET", ""),
                ("C2_REQUIRE_AUTH", "yes"),
            ]),
        );

        assert_eq!(config.server.port, 8080);
        assert!(config.auth.uses_dev_secret());
        assert!(!config.auth.require_auth);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).expect("missing file is not an error");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[auth\nrequire_auth = ").unwrap();
        assert!(matches!(
            load_config(path.to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn auth_debug_redacts_secret() {
        let mut auth = AuthConfig::default();
        auth.jwt_secret = "do-not-print".to_string();
        assert!(!format!("{auth:?}").contains("do-not-print"));
    }
}
