use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use crate::domain::orders::DEFAULT_MAX_TICKETS_PER_ORDER;
use crate::services::holds::DEFAULT_HOLD_SECONDS;

const DEFAULT_SWEEP_SECONDS: u64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// How long a locked seat stays reserved for checkout.
    pub hold_duration: Duration,
    /// Never longer than `hold_duration`.
    pub sweep_interval: Duration,
    /// JSON file with events and coupons to seed the store from.
    pub catalog_path: Option<PathBuf>,
    /// Copied on every order confirmation.
    pub admin_email: Option<String>,
    pub max_tickets_per_order: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            hold_duration: Duration::from_secs(DEFAULT_HOLD_SECONDS as u64),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_SECONDS),
            catalog_path: None,
            admin_email: None,
            max_tickets_per_order: DEFAULT_MAX_TICKETS_PER_ORDER,
        }
    }
}

impl Config {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let hold_secs: u64 = parse(&lookup, "HOLD_DURATION_SECS")?.unwrap_or(defaults.hold_duration.as_secs());
        if hold_secs == 0 {
            return Err(ConfigError::Invalid { name: "HOLD_DURATION_SECS", value: "0".to_string() });
        }
        let sweep_secs: u64 = parse(&lookup, "SWEEP_INTERVAL_SECS")?.unwrap_or(defaults.sweep_interval.as_secs());
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid { name: "SWEEP_INTERVAL_SECS", value: "0".to_string() });
        }
        let max_tickets: u32 = parse(&lookup, "MAX_TICKETS_PER_ORDER")?.unwrap_or(defaults.max_tickets_per_order);
        if max_tickets == 0 {
            return Err(ConfigError::Invalid { name: "MAX_TICKETS_PER_ORDER", value: "0".to_string() });
        }

        Ok(Config {
            host: lookup("HOST").filter(|h| !h.is_empty()).unwrap_or(defaults.host),
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.port),
            hold_duration: Duration::from_secs(hold_secs),
            sweep_interval: Duration::from_secs(sweep_secs.min(hold_secs)),
            catalog_path: lookup("CATALOG_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            admin_email: lookup("ADMIN_EMAIL").filter(|e| !e.is_empty()),
            max_tickets_per_order: max_tickets,
        })
    }

    pub fn hold_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.hold_duration.as_secs() as i64)
    }
}

fn parse<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::Invalid { name, value }),
        },
    }
}
