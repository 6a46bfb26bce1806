//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 存储后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// 内存存储，仅用于本地演示和测试。
    Memory,
}

/// MQTT 主题前缀约定。
///
/// 设备向 `*_pub_prefix + imei` 发布，向 `*_sub_prefix + imei` 订阅。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicPrefixes {
    pub indoor_pub: String,
    pub indoor_sub: String,
    pub outdoor_pub: String,
    pub outdoor_sub: String,
}

impl Default for TopicPrefixes {
    fn default() -> Self {
        Self {
            indoor_pub: "/AIR8000/PUB/".to_string(),
            indoor_sub: "/AIR8000/SUB/".to_string(),
            outdoor_pub: "/780EHV/PUB/".to_string(),
            outdoor_sub: "/780EHV/SUB/".to_string(),
        }
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_backend: StorageBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_client_id_prefix: String,
    pub mqtt_keep_alive_seconds: u64,
    pub mqtt_qos: u8,
    pub mqtt_reconnect_delay_ms: u64,
    pub topics: TopicPrefixes,
    pub inbound_queue_capacity: usize,
    pub device_offline_hours: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage_backend = read_storage_backend("RELAY_STORAGE_BACKEND")?;
        let database_url = read_optional("RELAY_DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("RELAY_DATABASE_URL".to_string()));
        }
        let database_max_connections =
            read_u32_with_default("RELAY_DATABASE_MAX_CONNECTIONS", 8)?.max(1);
        let mqtt_host = env::var("RELAY_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("RELAY_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("RELAY_MQTT_USERNAME");
        let mqtt_password = read_optional("RELAY_MQTT_PASSWORD");
        let mqtt_client_id_prefix = env::var("RELAY_MQTT_CLIENT_ID_PREFIX")
            .unwrap_or_else(|_| "gas_station_monitor".to_string());
        let mqtt_keep_alive_seconds = read_u64_with_default("RELAY_MQTT_KEEP_ALIVE_SECONDS", 60)?;
        let mqtt_qos = read_u8_with_default("RELAY_MQTT_QOS", 0)?;
        if mqtt_qos > 2 {
            return Err(ConfigError::Invalid(
                "RELAY_MQTT_QOS".to_string(),
                mqtt_qos.to_string(),
            ));
        }
        let mqtt_reconnect_delay_ms = read_u64_with_default("RELAY_RECONNECT_DELAY_MS", 1000)?;

        let defaults = TopicPrefixes::default();
        let topics = TopicPrefixes {
            indoor_pub: read_prefix("RELAY_INDOOR_PUB_PREFIX", defaults.indoor_pub)?,
            indoor_sub: read_prefix("RELAY_INDOOR_SUB_PREFIX", defaults.indoor_sub)?,
            outdoor_pub: read_prefix("RELAY_OUTDOOR_PUB_PREFIX", defaults.outdoor_pub)?,
            outdoor_sub: read_prefix("RELAY_OUTDOOR_SUB_PREFIX", defaults.outdoor_sub)?,
        };
        if topics.indoor_pub == topics.outdoor_pub {
            return Err(ConfigError::Invalid(
                "RELAY_OUTDOOR_PUB_PREFIX".to_string(),
                topics.outdoor_pub,
            ));
        }

        let inbound_queue_capacity =
            read_u64_with_default("RELAY_INBOUND_QUEUE_CAPACITY", 256)?.max(1) as usize;
        let device_offline_hours = read_u64_with_default("RELAY_DEVICE_OFFLINE_HOURS", 13)?;

        Ok(Self {
            storage_backend,
            database_url,
            database_max_connections,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_client_id_prefix,
            mqtt_keep_alive_seconds,
            mqtt_qos,
            mqtt_reconnect_delay_ms,
            topics,
            inbound_queue_capacity,
            device_offline_hours,
        })
    }

    /// 离线判定阈值（毫秒）。
    pub fn device_offline_after_ms(&self) -> i64 {
        let ms = self.device_offline_hours.saturating_mul(3_600_000);
        i64::try_from(ms).unwrap_or(i64::MAX)
    }
}

fn read_storage_backend(key: &str) -> Result<StorageBackend, ConfigError> {
    let value = match env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => return Ok(StorageBackend::Postgres),
    };
    match value.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" => Ok(StorageBackend::Postgres),
        "memory" | "in_memory" => Ok(StorageBackend::Memory),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

/// 主题前缀不能为空，也不能包含 MQTT 通配符。
fn read_prefix(key: &str, default: String) -> Result<String, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    if value.is_empty() || value.contains(['+', '#']) {
        return Err(ConfigError::Invalid(key.to_string(), value));
    }
    Ok(value)
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
