use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Secret bytes mixed into every token tag.
///
/// Immutable for the process lifetime; rotating it invalidates all
/// outstanding tokens.
#[derive(Clone)]
pub struct TokenSecret(Vec<u8>);

impl TokenSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenSecret([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub secret: TokenSecret,
    pub users: Vec<(String, String)>,

    // Token lifetimes (seconds)
    pub temporary_ttl_seconds: u64,
    pub session_ttl_seconds: u64,

    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("REAUTH_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("REAUTH_PORT"))?;

        let app_env = AppEnv::from_env();

        let secret =
            std::env::var("REAUTH_SECRET").map_err(|_| ConfigError::Missing("REAUTH_SECRET"))?;
        if secret.is_empty() {
            return Err(ConfigError::Invalid("REAUTH_SECRET"));
        }

        let users = parse_users(
            &std::env::var("REAUTH_USERS").map_err(|_| ConfigError::Missing("REAUTH_USERS"))?,
        )?;

        let temporary_ttl_seconds = std::env::var("REAUTH_TEMPORARY_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60); // 1 min
        let session_ttl_seconds = std::env::var("REAUTH_SESSION_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(28_800); // 8 hours

        // Behind a TLS-terminating proxy the socket cannot tell; default to
        // secure cookies whenever we run in production.
        let cookie_secure = std::env::var("REAUTH_COOKIE_SECURE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| app_env.is_production());

        Ok(Self {
            addr,
            app_env,
            secret: TokenSecret::new(secret.into_bytes()),
            users,
            temporary_ttl_seconds,
            session_ttl_seconds,
            cookie_secure,
        })
    }
}

/// Parse the `user:password` table, comma-separated. Passwords may contain
/// colons; only the first one splits.
fn parse_users(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut users = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (username, password) = entry
            .split_once(':')
            .ok_or(ConfigError::Invalid("REAUTH_USERS"))?;
        if username.is_empty() || password.is_empty() {
            return Err(ConfigError::Invalid("REAUTH_USERS"));
        }
        users.push((username.to_string(), password.to_string()));
    }
    if users.is_empty() {
        return Err(ConfigError::Invalid("REAUTH_USERS"));
    }
    Ok(users)
}
