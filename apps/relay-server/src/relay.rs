//! 转发链路装配
//!
//! 按配置选择存储后端，组装主题编解码、设备登记、转发引擎与 MQTT 传输，
//! 并启动后台任务。

use relay_config::{AppConfig, StorageBackend};
use relay_engine::RelayEngine;
use relay_registry::DeviceRegistry;
use relay_storage::{
    AuditLogStore, DeviceStore, InMemoryAuditLogStore, InMemoryDeviceStore, InMemoryStationStore,
    PgAuditLogStore, PgDeviceStore, PgStationStore, StationStore, StorageError, connect_pool,
    ensure_schema,
};
use relay_topic::TopicCodec;
use relay_transport::{MqttTransport, MqttTransportConfig, TransportHandles};
use std::sync::Arc;
use tracing::info;

/// 转发链路用到的存储集合。
pub struct RelayStores {
    pub devices: Arc<dyn DeviceStore>,
    pub stations: Arc<dyn StationStore>,
    pub audit: Arc<dyn AuditLogStore>,
}

/// 按配置构建存储（Postgres 会先建表）。
pub async fn build_stores(config: &AppConfig) -> Result<RelayStores, StorageError> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StorageError::new("RELAY_DATABASE_URL is not set"))?;
            let pool = connect_pool(url, config.database_max_connections).await?;
            ensure_schema(&pool).await?;
            info!(target: "relay.server", "storage backend: postgres");
            Ok(RelayStores {
                devices: Arc::new(PgDeviceStore::new(pool.clone())),
                stations: Arc::new(PgStationStore::new(pool.clone())),
                audit: Arc::new(PgAuditLogStore::new(pool)),
            })
        }
        StorageBackend::Memory => {
            // 内存后端没有管理面写入绑定关系，所有设备都停留在未绑定状态
            info!(target: "relay.server", "storage backend: memory");
            Ok(RelayStores {
                devices: Arc::new(InMemoryDeviceStore::new()),
                stations: Arc::new(InMemoryStationStore::new()),
                audit: Arc::new(InMemoryAuditLogStore::new()),
            })
        }
    }
}

/// 由应用配置推导 MQTT 传输配置。
pub fn transport_config(config: &AppConfig, codec: &TopicCodec) -> MqttTransportConfig {
    MqttTransportConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        client_id_prefix: config.mqtt_client_id_prefix.clone(),
        keep_alive_seconds: config.mqtt_keep_alive_seconds,
        qos: config.mqtt_qos,
        subscriptions: codec.subscriptions(),
        queue_capacity: config.inbound_queue_capacity,
        reconnect_delay_ms: config.mqtt_reconnect_delay_ms,
    }
}

/// 启动转发链路：事件循环 + 分发 worker。
pub fn spawn_relay(config: &AppConfig, stores: RelayStores) -> TransportHandles {
    let codec = TopicCodec::new(config.topics.clone());
    let registry = DeviceRegistry::new(stores.devices, stores.stations);
    let (publisher, transport) = MqttTransport::new(transport_config(config, &codec));
    info!(
        target: "relay.server",
        client_id = %transport.client_id(),
        subscriptions = ?codec.subscriptions(),
        "relay_transport_configured"
    );
    let engine = RelayEngine::new(codec, registry, stores.audit, Arc::new(publisher))
        .with_offline_after_ms(config.device_offline_after_ms());
    transport.run(Arc::new(engine))
}
