use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub reservation: ReservationConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_json: bool,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis. Без REDIS_URL кеш отключён
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Параметры удержания мест и фоновой очистки
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationConfig {
    pub hold_minutes: i64,
    pub seat_price: f64,
    pub sweep_interval_secs: u64,
    pub sweep_batch_size: i64,
    pub orphan_grace_secs: i64,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            hold_minutes: 10,
            seat_price: 100000.00,
            sweep_interval_secs: 60,
            sweep_batch_size: 100,
            orphan_grace_secs: 120,
        }
    }
}

impl ReservationConfig {
    pub fn hold_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.hold_minutes)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Блокировка без живой брони старше этого возраста считается брошенной
    pub fn orphan_lock_age(&self) -> chrono::Duration {
        self.hold_duration() + chrono::Duration::seconds(self.orphan_grace_secs)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ReservationConfig::default();

        Ok(Config {
            app: AppConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 8000)?,
                environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
                rust_log: lookup("RUST_LOG")
                    .unwrap_or_else(|| "seat_reservation=debug,tower_http=debug".to_string()),
                log_json: lookup("LOG_FORMAT").is_some_and(|format| format == "json"),
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
                pool_size: parse_or(&lookup, "DB_POOL_SIZE", 20)?,
            },
            redis: lookup("REDIS_URL").map(|url| RedisConfig { url }),
            reservation: ReservationConfig {
                hold_minutes: parse_positive_or(&lookup, "HOLD_MINUTES", defaults.hold_minutes)?,
                seat_price: parse_or(&lookup, "SEAT_PRICE", defaults.seat_price)?,
                sweep_interval_secs: parse_positive_or(
                    &lookup,
                    "SWEEP_INTERVAL_SECS",
                    defaults.sweep_interval_secs,
                )?,
                sweep_batch_size: parse_positive_or(
                    &lookup,
                    "SWEEP_BATCH_SIZE",
                    defaults.sweep_batch_size,
                )?,
                orphan_grace_secs: parse_or(
                    &lookup,
                    "ORPHAN_GRACE_SECS",
                    defaults.orphan_grace_secs,
                )?,
            },
        })
    }
}

// Ноль или отрицательное значение ломает очистку: interval(0) паникует,
// отрицательный LIMIT отвергает Postgres
fn parse_positive_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + Display,
    T::Err: Display,
{
    let value = parse_or(lookup, key, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
