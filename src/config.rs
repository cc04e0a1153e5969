//! Environment configuration.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `PORT` | `3000` | listen port; an empty value counts as unset |
//! | `MONGODB_URI` | `mongodb://localhost/test` | connection string, or `memory:` for the in-process store |
//! | `MONGODB_CONNECT_TIMEOUT_MS` | `5000` | how long the startup ping waits for a server |
//! | `POSTS_NOT_FOUND` | `null` | `null` answers misses with `200 null`, `404` with `404 null` |

use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::Error;
use crate::routes::NotFoundPolicy;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE_URL: &str = "mongodb://localhost/test";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database: DatabaseConfig,
    pub not_found: NotFoundPolicy,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_owned(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Config {
    /// Reads the process environment.
    pub fn load() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let default_timeout_ms = DEFAULT_CONNECT_TIMEOUT.as_millis().to_string();
        let timeout_ms: u64 = try_load(&lookup, "MONGODB_CONNECT_TIMEOUT_MS", &default_timeout_ms)?;

        Ok(Self {
            port: try_load(&lookup, "PORT", &DEFAULT_PORT.to_string())?,
            database: DatabaseConfig {
                url: try_load(&lookup, "MONGODB_URI", DEFAULT_DATABASE_URL)?,
                connect_timeout: Duration::from_millis(timeout_ms),
            },
            not_found: try_load(&lookup, "POSTS_NOT_FOUND", "null")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, Error>
where
    T::Err: Display,
{
    let raw = lookup(key)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_owned()
        });

    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        Error::Config { key, reason: e.to_string() }
    })
}
