use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_UNIT_PRICE: f64 = 3000.0;
pub const DEFAULT_MIN_NUMBER: u32 = 10000;
pub const DEFAULT_MAX_NUMBER: u32 = 99999;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;
pub const DEFAULT_STORE: &str = "redis";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Unit price must be a positive number, got {0}")]
    UnitPrice(f64),

    #[error("Number range is empty: {min} > {max}")]
    EmptyRange { min: u32, max: u32 },

    #[error("Max attempts per ticket must be at least 1")]
    NoAttempts,

    #[error("Unknown store backend: {0}")]
    UnknownStore(String),
}

/// Raffle rules shared by the issuer and the draw engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RaffleConfig {
    pub unit_price: f64,
    pub min_number: u32,
    pub max_number: u32,
    pub max_attempts: u32,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            unit_price: DEFAULT_UNIT_PRICE,
            min_number: DEFAULT_MIN_NUMBER,
            max_number: DEFAULT_MAX_NUMBER,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RaffleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.unit_price.is_finite() || self.unit_price <= 0.0 {
            return Err(ConfigError::UnitPrice(self.unit_price));
        }

        if self.min_number > self.max_number {
            return Err(ConfigError::EmptyRange {
                min: self.min_number,
                max: self.max_number,
            });
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreKind {
    Memory,
    Redis,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "redis" => Ok(StoreKind::Redis),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub store: StoreKind,
    pub redis_url: String,
    pub raffle: RaffleConfig,
}

impl Config {
    pub fn load() -> Self {
        let raffle = RaffleConfig {
            unit_price: try_load("RAFFLE_UNIT_PRICE", "3000"),
            min_number: try_load("RAFFLE_MIN_NUMBER", "10000"),
            max_number: try_load("RAFFLE_MAX_NUMBER", "99999"),
            max_attempts: try_load("RAFFLE_MAX_ATTEMPTS", "64"),
        };

        raffle
            .validate()
            .map_err(|e| {
                warn!("Invalid raffle rules: {e}");
            })
            .expect("Environment misconfigured!");

        Self {
            port: try_load("RUST_PORT", "8080"),
            store: try_load("RAFFLE_STORE", DEFAULT_STORE),
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            raffle,
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
