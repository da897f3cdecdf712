//! Server configuration parsed from environment variables.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_TTL_HOURS: i32 = 72;
pub const DEFAULT_MAX_BACKGROUND_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_LAYOUT_MIN_ITEM_SIZE: f64 = 16.0;
pub const DEFAULT_CART_SWEEP_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub session_ttl_hours: i32,
    pub cookie_secure: bool,
    /// Cap on the size of a background image data URL, in bytes.
    pub max_background_bytes: usize,
    /// Cap on the request body of a bulk import, in bytes.
    pub max_import_bytes: usize,
    /// Smallest width/height a layout item can be resized to.
    pub layout_min_item_size: f64,
    /// Seconds between sweeps that drop carts of expired sessions.
    pub cart_sweep_secs: u64,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `SESSION_TTL_HOURS`: default 72
    /// - `COOKIE_SECURE`: default false
    /// - `MAX_BACKGROUND_BYTES`: default 5 MiB
    /// - `MAX_IMPORT_BYTES`: default 10 MiB
    /// - `LAYOUT_MIN_ITEM_SIZE`: default 16
    /// - `CART_SWEEP_SECS`: default 300
    ///
    /// # Errors
    ///
    /// Returns `Missing` when `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS).max(1),
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(false),
            max_background_bytes: env_parse("MAX_BACKGROUND_BYTES", DEFAULT_MAX_BACKGROUND_BYTES),
            max_import_bytes: env_parse("MAX_IMPORT_BYTES", DEFAULT_MAX_IMPORT_BYTES),
            layout_min_item_size: env_parse("LAYOUT_MIN_ITEM_SIZE", DEFAULT_LAYOUT_MIN_ITEM_SIZE),
            cart_sweep_secs: env_parse("CART_SWEEP_SECS", DEFAULT_CART_SWEEP_SECS).max(1),
        })
    }

    /// Config with defaults and the given database URL.
    #[must_use]
    pub fn with_database_url(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_owned(),
            port: DEFAULT_PORT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            cookie_secure: false,
            max_background_bytes: DEFAULT_MAX_BACKGROUND_BYTES,
            max_import_bytes: DEFAULT_MAX_IMPORT_BYTES,
            layout_min_item_size: DEFAULT_LAYOUT_MIN_ITEM_SIZE,
            cart_sweep_secs: DEFAULT_CART_SWEEP_SECS,
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
