//! Server Configuration
//!
//! Environment-driven configuration. Variables read at startup:
//!
//! | Variable                 | Default                     |
//! |--------------------------|-----------------------------|
//! | `HOST`                   | `0.0.0.0`                   |
//! | `PORT`                   | `3000`                      |
//! | `DATA_DIR`               | `./data`                    |
//! | `LOG_LEVEL`              | `info`                      |
//! | `LOG_DIR`                | unset (stdout only)         |
//! | `JWT_SECRET`             | required in release builds  |
//! | `JWT_EXPIRATION_MINUTES` | `1440`                      |
//! | `OWNER_USERNAME`         | `owner`                     |
//! | `OWNER_PASSWORD`         | required in release builds  |
//! | `BUSINESS_TIMEZONE`      | `Asia/Kolkata`              |
//! | `PUBLIC_BASE_URL`        | `http://localhost:3000/b`   |
//! | `COUNTRY_CODE`           | `91`                        |

use std::path::PathBuf;

use chrono_tz::Tz;

use crate::auth::JwtConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// Directory holding the embedded database
    pub data_dir: PathBuf,
    /// Log level filter
    pub log_level: String,
    /// Optional directory for rolling log files
    pub log_dir: Option<String>,
    /// Token configuration
    pub jwt: JwtConfig,
    /// Owner account name
    pub owner_username: String,
    /// Owner account password (hashed at startup)
    pub owner_password: String,
    /// Shop timezone for business dates
    pub timezone: Tz,
    /// Base URL prefixed to shared bill links
    pub public_base_url: String,
    /// Dialling code prepended to bare phone numbers
    pub country_code: String,
}

impl Config {
    /// Load the configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_dir: std::env::var("LOG_DIR").ok(),
            jwt: JwtConfig::default(),
            owner_username: std::env::var("OWNER_USERNAME")
                .unwrap_or_else(|_| "owner".to_string()),
            owner_password: load_owner_password(),
            timezone: std::env::var("BUSINESS_TIMEZONE")
                .ok()
                .and_then(|tz| tz.parse::<Tz>().ok())
                .unwrap_or(chrono_tz::Asia::Kolkata),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/b".to_string()),
            country_code: std::env::var("COUNTRY_CODE").unwrap_or_else(|_| "91".to_string()),
        }
    }

    /// A copy with a different data directory and port, for tests
    pub fn with_overrides(mut self, data_dir: PathBuf, http_port: u16) -> Self {
        self.data_dir = data_dir;
        self.http_port = http_port;
        self
    }

    /// Path of the embedded database inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("bills.db")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Load the owner password from the environment.
///
/// Missing `OWNER_PASSWORD` is a hard error in release builds; debug
/// builds fall back to a fixed development password.
fn load_owner_password() -> String {
    match std::env::var("OWNER_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => {
            #[cfg(debug_assertions)]
            {
                tracing::warn!("OWNER_PASSWORD not set, using the development default");
                "owner-dev-password".to_string()
            }
            #[cfg(not(debug_assertions))]
            {
                panic!("OWNER_PASSWORD environment variable must be set in production");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_lives_under_the_data_dir() {
        let config = Config::from_env().with_overrides(PathBuf::from("/tmp/billing"), 0);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/billing/bills.db"));
    }
}
