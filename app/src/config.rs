use crate::error::ConfigError;
use once_cell::sync::Lazy;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub struct Config {
    database_url: Option<String>,
    server_addr: SocketAddr,
    probe_timeout_ms: u64,
    pull_timeout_ms: u64,
    plant_id_length: usize,
    plant_id_retries: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        let server_addr = parse_or("SERVER_ADDR", SocketAddr::from(([0, 0, 0, 0], 2000)))?;
        let probe_timeout_ms = parse_or("PROBE_TIMEOUT_MS", 3_000)?;
        let pull_timeout_ms = parse_or("PULL_TIMEOUT_MS", 5_000)?;
        let plant_id_length = parse_or("PLANT_ID_LENGTH", 8)?;
        let plant_id_retries = parse_or("PLANT_ID_RETRIES", 5)?;

        if plant_id_length == 0 {
            return Err(ConfigError::Invalid("PLANT_ID_LENGTH", "0".to_owned()));
        }
        if plant_id_retries == 0 {
            return Err(ConfigError::Invalid("PLANT_ID_RETRIES", "0".to_owned()));
        }

        Ok(Config {
            database_url,
            server_addr,
            probe_timeout_ms,
            pull_timeout_ms,
            plant_id_length,
            plant_id_retries,
        })
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_millis(self.pull_timeout_ms)
    }

    pub fn plant_id_length(&self) -> usize {
        self.plant_id_length
    }

    pub fn plant_id_retries(&self) -> usize {
        self.plant_id_retries
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv::dotenv().ok();
    Config::from_env().expect("Invalid environment configuration")
});
