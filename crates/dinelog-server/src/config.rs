use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Longest accepted session lifetime: one year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
    pub busy_timeout: Duration,
    pub reader_pool_size: usize,
    pub session_purge_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("DINELOG_JWT_SECRET").unwrap_or_else(|| {
            warn!("DINELOG_JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.into()
        });

        let ttl_hours: i64 = try_load(&lookup, "DINELOG_SESSION_TTL_HOURS", "24")?;
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&ttl_hours) {
            bail!(
                "Invalid DINELOG_SESSION_TTL_HOURS value: {ttl_hours} \
                 (must be between 1 and {MAX_SESSION_TTL_HOURS})"
            );
        }
        let session_ttl = chrono::Duration::try_hours(ttl_hours)
            .with_context(|| format!("DINELOG_SESSION_TTL_HOURS out of range: {ttl_hours}"))?;

        let purge_secs: u64 = try_load(&lookup, "DINELOG_SESSION_PURGE_SECS", "600")?;
        if purge_secs == 0 {
            bail!("Invalid DINELOG_SESSION_PURGE_SECS value: 0 (must be at least 1)");
        }

        Ok(Self {
            host: try_load(&lookup, "DINELOG_HOST", "0.0.0.0")?,
            port: try_load(&lookup, "DINELOG_PORT", "3000")?,
            db_path: try_load(&lookup, "DINELOG_DB_PATH", "dinelog.db")?,
            jwt_secret,
            session_ttl,
            busy_timeout: Duration::from_millis(try_load(
                &lookup,
                "DINELOG_BUSY_TIMEOUT_MS",
                "5000",
            )?),
            reader_pool_size: try_load(&lookup, "DINELOG_READER_POOL_SIZE", "4")?,
            session_purge_interval: Duration::from_secs(purge_secs),
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value: {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.session_ttl, chrono::Duration::hours(24));
        assert_eq!(config.session_purge_interval, Duration::from_secs(600));
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_zero_purge_interval_is_rejected() {
        let err = load(&[("DINELOG_SESSION_PURGE_SECS", "0")]).err().unwrap();
        assert!(err.to_string().contains("DINELOG_SESSION_PURGE_SECS"));

        let config = load(&[("DINELOG_SESSION_PURGE_SECS", "1")]).unwrap();
        assert_eq!(config.session_purge_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_session_ttl_must_be_positive_and_bounded() {
        for bad in ["0", "-1", "2600000000000", "8761"] {
            let err = load(&[("DINELOG_SESSION_TTL_HOURS", bad)]).err().unwrap();
            assert!(err.to_string().contains("DINELOG_SESSION_TTL_HOURS"), "{bad}: {err}");
        }

        let config = load(&[("DINELOG_SESSION_TTL_HOURS", "8760")]).unwrap();
        assert_eq!(config.session_ttl, chrono::Duration::hours(8760));
    }

    #[test]
    fn test_unparseable_value_names_the_key() {
        let err = load(&[("DINELOG_PORT", "eighty")]).err().unwrap();
        assert!(format!("{err:#}").contains("DINELOG_PORT"));
    }
}
