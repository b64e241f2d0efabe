use crate::app_config::{AppConfig, Environment, DEFAULT_META_BASE_URL};
use crate::ConfigError;

/// Signing secret used only when running in development without
/// `ADSYNC_JWT_SECRET`.
const DEV_JWT_SECRET: &str = "adsync-development-secret-change-me";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;

    let env = parse_environment(&or_default("ADSYNC_ENV", "development"))?;

    let bind_addr = or_default("ADSYNC_BIND_ADDR", "0.0.0.0:5000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("ADSYNC_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("ADSYNC_LOG_LEVEL", "info");

    let (jwt_secret, jwt_secret_is_fallback) = match require("ADSYNC_JWT_SECRET") {
        Ok(secret) => (secret, false),
        Err(_) if env.is_development() => (DEV_JWT_SECRET.to_string(), true),
        Err(e) => return Err(e),
    };
    let jwt_ttl_secs = parse_u64("ADSYNC_JWT_TTL_SECS", "604800")?;
    if jwt_ttl_secs == 0 {
        return Err(invalid("ADSYNC_JWT_TTL_SECS", "must be positive".to_string()));
    }

    let db_max_connections = parse_u32("ADSYNC_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("ADSYNC_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "ADSYNC_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds ADSYNC_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("ADSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let meta_base_url = or_default("ADSYNC_META_BASE_URL", DEFAULT_META_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    if !(meta_base_url.starts_with("http://") || meta_base_url.starts_with("https://")) {
        return Err(invalid(
            "ADSYNC_META_BASE_URL",
            "must start with http:// or https://".to_string(),
        ));
    }
    let meta_timeout_secs = parse_u64("ADSYNC_META_TIMEOUT_SECS", "30")?;

    let sync_bounded_limit = parse_usize("ADSYNC_SYNC_BOUNDED_LIMIT", "5")?;
    let rate_limit_per_minute = parse_u32("ADSYNC_RATE_LIMIT_PER_MINUTE", "120")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        jwt_secret,
        jwt_secret_is_fallback,
        jwt_ttl_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        meta_base_url,
        meta_timeout_secs,
        sync_bounded_limit,
        rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ADSYNC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
