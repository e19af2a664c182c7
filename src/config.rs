use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

use crate::importers::pubmed::DEFAULT_BASE_URL;

/// Runtime configuration, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub pubmed_base_url: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{0} must be set")]
pub struct MissingVar(pub &'static str);

impl Config {
    pub fn from_env() -> Result<Self, MissingVar> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| MissingVar("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:3000"),
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5"),
            pubmed_base_url: try_load("PUBMED_BASE_URL", DEFAULT_BASE_URL),
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            parse_default(key, default)
        }
    }
}

fn parse_default<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    default
        .parse()
        .unwrap_or_else(|e| panic!("default for {key} does not parse: {e}"))
}
