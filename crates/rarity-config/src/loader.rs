//! Environment-driven loading of [`AppConfig`].
//!
//! # Design
//! - Every setting is optional; unset or blank variables keep the section default.
//! - Lookup is injected so tests never touch the process environment.
//! - The first invalid variable aborts loading with its name and raw value.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use rarity_telemetry::LogFormat;

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;

/// RPC bind address.
pub const ENV_BIND_ADDR: &str = "RARITY_BIND_ADDR";
/// RPC port.
pub const ENV_HTTP_PORT: &str = "RARITY_HTTP_PORT";
/// Engine peer listen port.
pub const ENV_LISTEN_PORT: &str = "RARITY_LISTEN_PORT";
/// Download directory.
pub const ENV_DOWNLOAD_DIR: &str = "RARITY_DOWNLOAD_DIR";
/// Resume blob directory.
pub const ENV_RESUME_DIR: &str = "RARITY_RESUME_DIR";
/// DHT snapshot file.
pub const ENV_DHT_STATE_PATH: &str = "RARITY_DHT_STATE_PATH";
/// Comma-separated DHT routers.
pub const ENV_DHT_ROUTERS: &str = "RARITY_DHT_ROUTERS";
/// Local service discovery toggle.
pub const ENV_LOCAL_DISCOVERY: &str = "RARITY_LOCAL_DISCOVERY";
/// Waiter expiry in seconds.
pub const ENV_WAITER_TIMEOUT_SECS: &str = "RARITY_WAITER_TIMEOUT_SECS";
/// Alert pump period in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "RARITY_POLL_INTERVAL_MS";
/// Delay before the first DHT write, in seconds.
pub const ENV_DHT_INITIAL_DELAY_SECS: &str = "RARITY_DHT_INITIAL_DELAY_SECS";
/// Period between DHT writes, in seconds.
pub const ENV_DHT_INTERVAL_SECS: &str = "RARITY_DHT_INTERVAL_SECS";
/// Metainfo fetch timeout in seconds.
pub const ENV_FETCH_TIMEOUT_SECS: &str = "RARITY_FETCH_TIMEOUT_SECS";
/// Log level or filter directive.
pub const ENV_LOG_LEVEL: &str = "RARITY_LOG_LEVEL";
/// Log format (`json` or `pretty`).
pub const ENV_LOG_FORMAT: &str = "RARITY_LOG_FORMAT";

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for the first variable that fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for the first variable that fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(value) = read(ENV_BIND_ADDR) {
            config.api.bind_addr = value
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::invalid(ENV_BIND_ADDR, &value, "must be an IP address"))?;
        }
        if let Some(value) = read(ENV_HTTP_PORT) {
            config.api.http_port = parse_port(ENV_HTTP_PORT, &value)?;
        }

        let engine = &mut config.engine;
        if let Some(value) = read(ENV_LISTEN_PORT) {
            engine.listen_port = parse_port(ENV_LISTEN_PORT, &value)?;
        }
        if let Some(value) = read(ENV_DOWNLOAD_DIR) {
            engine.download_dir = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_RESUME_DIR) {
            engine.resume_dir = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_DHT_STATE_PATH) {
            engine.dht_state_path = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_DHT_ROUTERS) {
            engine.dht_routers = parse_routers(&value)?;
        }
        if let Some(value) = read(ENV_LOCAL_DISCOVERY) {
            engine.local_discovery = parse_flag(ENV_LOCAL_DISCOVERY, &value)?;
        }

        let schedule = &mut config.schedule;
        if let Some(value) = read(ENV_WAITER_TIMEOUT_SECS) {
            schedule.waiter_timeout = parse_secs(ENV_WAITER_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = read(ENV_POLL_INTERVAL_MS) {
            schedule.poll_interval =
                Duration::from_millis(parse_positive(ENV_POLL_INTERVAL_MS, &value)?);
        }
        if let Some(value) = read(ENV_DHT_INITIAL_DELAY_SECS) {
            schedule.dht_initial_delay = parse_secs(ENV_DHT_INITIAL_DELAY_SECS, &value)?;
        }
        if let Some(value) = read(ENV_DHT_INTERVAL_SECS) {
            schedule.dht_interval = parse_secs(ENV_DHT_INTERVAL_SECS, &value)?;
        }
        if let Some(value) = read(ENV_FETCH_TIMEOUT_SECS) {
            schedule.fetch_timeout = parse_secs(ENV_FETCH_TIMEOUT_SECS, &value)?;
        }

        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.logging.level = value;
        }
        if let Some(value) = read(ENV_LOG_FORMAT) {
            config.logging.format = value.parse::<LogFormat>().map_err(|_| {
                ConfigError::invalid(ENV_LOG_FORMAT, &value, "must be 'json' or 'pretty'")
            })?;
        }

        Ok(config)
    }
}

fn parse_port(field: &'static str, value: &str) -> ConfigResult<u16> {
    match value.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::invalid(
            field,
            value,
            "must be between 1 and 65535",
        )),
    }
}

fn parse_positive(field: &'static str, value: &str) -> ConfigResult<u64> {
    match value.parse::<u64>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(ConfigError::invalid(field, value, "must be a positive integer")),
    }
}

fn parse_secs(field: &'static str, value: &str) -> ConfigResult<Duration> {
    parse_positive(field, value).map(Duration::from_secs)
}

fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, value, "must be a boolean")),
    }
}

fn parse_routers(value: &str) -> ConfigResult<Vec<String>> {
    let mut routers = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let valid = entry
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && parse_port(ENV_DHT_ROUTERS, port).is_ok());
        if !valid {
            return Err(ConfigError::invalid(
                ENV_DHT_ROUTERS,
                entry,
                "must be host:port",
            ));
        }
        routers.push(entry.to_string());
    }
    Ok(routers)
}
