//! Server configuration read from the environment (and a `.env` file when present).

use anyhow::{Context, Result};
use chrono::Duration;
use std::net::SocketAddr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:home_economy.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8080";
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 30 * 24 * 60 * 60;
/// Upper bound for either token lifetime: ten years
pub const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub cors_origin: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            access_token_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
            refresh_token_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
        }
    }
}

impl ServerConfig {
    /// Load from `HOME_ECONOMY_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("HOME_ECONOMY_DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = lookup("HOME_ECONOMY_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("HOME_ECONOMY_BIND_ADDR must be a socket address like 127.0.0.1:3000")?;

        let cors_origin = lookup("HOME_ECONOMY_CORS_ORIGIN")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        let access_secs = parse_secs(&lookup, "HOME_ECONOMY_ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_secs = parse_secs(&lookup, "HOME_ECONOMY_REFRESH_TTL_SECS", DEFAULT_REFRESH_TTL_SECS)?;
        if refresh_secs < access_secs {
            anyhow::bail!("Refresh token lifetime must not be shorter than the access token lifetime");
        }

        Ok(Self {
            database_url,
            bind_addr,
            cors_origin,
            access_token_ttl: Duration::seconds(access_secs),
            refresh_token_ttl: Duration::seconds(refresh_secs),
        })
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> Result<i64> {
    match lookup(key) {
        Some(raw) => {
            let secs = raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("{} must be a whole number of seconds", key))?;
            if secs < 0 {
                anyhow::bail!("{} cannot be negative", key);
            }
            if secs > MAX_TTL_SECS {
                anyhow::bail!("{} cannot be more than {} seconds (ten years)", key, MAX_TTL_SECS);
            }
            Ok(secs)
        }
        None => Ok(default),
    }
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.access_token_ttl, Duration::seconds(900));
        assert_eq!(config.refresh_token_ttl, Duration::days(30));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HOME_ECONOMY_DATABASE_URL", "sqlite:/tmp/family.db"),
            ("HOME_ECONOMY_BIND_ADDR", "0.0.0.0:8000"),
            ("HOME_ECONOMY_ACCESS_TTL_SECS", "60"),
            ("HOME_ECONOMY_REFRESH_TTL_SECS", "3600"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "sqlite:/tmp/family.db");
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.access_token_ttl, Duration::seconds(60));
        assert_eq!(config.refresh_token_ttl, Duration::seconds(3600));
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup_from(&[("HOME_ECONOMY_BIND_ADDR", "localhost")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("HOME_ECONOMY_ACCESS_TTL_SECS", "soon")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[("HOME_ECONOMY_ACCESS_TTL_SECS", "-5")])).is_err());
        assert!(ServerConfig::from_lookup(lookup_from(&[
            ("HOME_ECONOMY_ACCESS_TTL_SECS", "600"),
            ("HOME_ECONOMY_REFRESH_TTL_SECS", "60"),
        ]))
        .is_err());
    }

    #[test]
    fn test_lifetimes_are_bounded() {
        let longest = MAX_TTL_SECS.to_string();
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HOME_ECONOMY_ACCESS_TTL_SECS", longest.as_str()),
            ("HOME_ECONOMY_REFRESH_TTL_SECS", longest.as_str()),
        ]))
        .unwrap();
        assert!(chrono::Utc::now().checked_add_signed(config.refresh_token_ttl).is_some());

        let too_long = (MAX_TTL_SECS + 1).to_string();
        let config = ServerConfig::from_lookup(lookup_from(&[("HOME_ECONOMY_REFRESH_TTL_SECS", too_long.as_str())]));
        assert!(config.is_err());

        let overflow = i64::MAX.to_string();
        let err = ServerConfig::from_lookup(lookup_from(&[
            ("HOME_ECONOMY_ACCESS_TTL_SECS", overflow.as_str()),
            ("HOME_ECONOMY_REFRESH_TTL_SECS", overflow.as_str()),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("HOME_ECONOMY_ACCESS_TTL_SECS"), "{}", err);
    }
}
