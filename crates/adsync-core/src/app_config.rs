use std::net::SocketAddr;

/// Graph API root used when `ADSYNC_META_BASE_URL` is unset.
pub const DEFAULT_META_BASE_URL: &str = "https://graph.facebook.com/v18.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub jwt_secret: String,
    /// True when `jwt_secret` is the built-in development fallback.
    pub jwt_secret_is_fallback: bool,
    pub jwt_ttl_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub meta_base_url: String,
    pub meta_timeout_secs: u64,
    /// Campaign cap for the bounded sync that follows a local edit.
    pub sync_bounded_limit: usize,
    pub rate_limit_per_minute: u32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("jwt_secret", &"[redacted]")
            .field("jwt_secret_is_fallback", &self.jwt_secret_is_fallback)
            .field("jwt_ttl_secs", &self.jwt_ttl_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("meta_base_url", &self.meta_base_url)
            .field("meta_timeout_secs", &self.meta_timeout_secs)
            .field("sync_bounded_limit", &self.sync_bounded_limit)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}
