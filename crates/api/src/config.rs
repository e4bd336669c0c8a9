//! Application configuration loaded from environment variables.

use chrono::Duration;
use domain::TokenSettings;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for JSON log lines, anything else for text
/// - `DATABASE_URL`: Postgres connection string; unset runs in memory
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `ACCESS_TOKEN_TTL_SECS` / `REFRESH_TOKEN_TTL_SECS`: token lifetimes
///   (default: 15 minutes / 7 days)
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD`: bootstrap admin account
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub admin: Option<AdminBootstrap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Credentials of the admin account ensured at startup.
#[derive(Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.trim().is_empty() => {
                Some(AdminBootstrap { email, password })
            }
            _ => None,
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var::<u16>(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_var::<u32>(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            access_token_ttl_secs: parse_var::<i64>(&lookup, "ACCESS_TOKEN_TTL_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(defaults.access_token_ttl_secs),
            refresh_token_ttl_secs: parse_var::<i64>(&lookup, "REFRESH_TOKEN_TTL_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(defaults.refresh_token_ttl_secs),
            admin,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_ttl: Duration::seconds(self.access_token_ttl_secs),
            refresh_ttl: Duration::seconds(self.refresh_token_ttl_secs),
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 604_800,
            admin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_overrides() {
        let config = from_pairs(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.database_max_connections, 12);
        assert_eq!(config.token_settings().access_ttl.num_seconds(), 60);
        assert_eq!(config.token_settings().refresh_ttl.num_seconds(), 604_800);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("ACCESS_TOKEN_TTL_SECS", "-5"),
            ("DATABASE_URL", "  "),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.access_token_ttl_secs, 900);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_admin_needs_both_values() {
        assert!(from_pairs(&[("ADMIN_EMAIL", "root@example.com")]).admin.is_none());

        let config = from_pairs(&[
            ("ADMIN_EMAIL", "root@example.com"),
            ("ADMIN_PASSWORD", "changeme"),
        ]);
        let admin = config.admin.unwrap();
        assert_eq!(admin.email, "root@example.com");
        assert!(!format!("{admin:?}").contains("changeme"));
    }
}
