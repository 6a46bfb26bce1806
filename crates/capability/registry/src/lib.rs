//! 设备登记能力：首次上报自动注册、加油站绑定/解绑。
//!
//! 自动注册是网络流量进入设备表的唯一入口；绑定/解绑供管理面调用，
//! 转发引擎只读取结果中的 `station_id`。

use domain::DeviceClass;
use relay_storage::{
    DeviceRecord, DeviceStore, NewDeviceRecord, StationStore, StorageError, StorageErrorKind,
};
use relay_telemetry::record_device_registered;
use std::sync::Arc;
use tracing::info;

/// 设备登记错误。
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("station not found: {0}")]
    StationNotFound(i64),
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device {imei} is bound to station {station_id}, unbind it first")]
    AlreadyBound { imei: String, station_id: i64 },
    #[error("station {station_id} already has indoor device {imei}")]
    IndoorTaken { station_id: i64, imei: String },
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        RegistryError::Storage(err.to_string())
    }
}

/// 自动注册设备的占位名称。
pub fn placeholder_name(imei: &str) -> String {
    format!("自动注册-{}", imei)
}

/// 设备登记服务（基于 DeviceStore + StationStore）。
#[derive(Clone)]
pub struct DeviceRegistry {
    device_store: Arc<dyn DeviceStore>,
    station_store: Arc<dyn StationStore>,
}

impl DeviceRegistry {
    pub fn new(device_store: Arc<dyn DeviceStore>, station_store: Arc<dyn StationStore>) -> Self {
        Self {
            device_store,
            station_store,
        }
    }

    pub fn device_store(&self) -> &Arc<dyn DeviceStore> {
        &self.device_store
    }

    /// 按 IMEI 取设备，不存在时以观测到的类型创建未绑定设备。
    ///
    /// 已有记录原样返回：库中类型为准，不被流量中的类型覆盖。
    /// 并发首次上报由存储层唯一约束合并为一行。
    pub async fn resolve_or_register(
        &self,
        imei: &str,
        class: DeviceClass,
    ) -> Result<DeviceRecord, RegistryError> {
        if let Some(device) = self.device_store.find_device(imei).await? {
            return Ok(device);
        }
        let now_ms = domain::now_epoch_ms();
        let written = self
            .device_store
            .insert_device_if_absent(NewDeviceRecord {
                imei: imei.to_string(),
                class,
                name: placeholder_name(imei),
                station_id: None,
                last_seen_at_ms: Some(now_ms),
                created_at_ms: now_ms,
            })
            .await?;
        if written.inserted {
            record_device_registered();
            info!(
                target: "relay.registry",
                imei = %imei,
                device_class = %class,
                device_id = written.record.device_id,
                "device_auto_registered"
            );
        }
        Ok(written.record)
    }

    /// 绑定设备到加油站。
    ///
    /// - 已绑定到其他加油站时需先解绑
    /// - 每个加油站最多一台室内机
    /// - 重复绑定到同一加油站视为成功
    pub async fn bind(&self, imei: &str, station_id: i64) -> Result<DeviceRecord, RegistryError> {
        if self.station_store.find_station(station_id).await?.is_none() {
            return Err(RegistryError::StationNotFound(station_id));
        }
        let device = self
            .device_store
            .find_device(imei)
            .await?
            .ok_or_else(|| RegistryError::DeviceNotFound(imei.to_string()))?;
        match device.station_id {
            Some(current) if current == station_id => return Ok(device),
            Some(current) => {
                return Err(RegistryError::AlreadyBound {
                    imei: imei.to_string(),
                    station_id: current,
                });
            }
            None => {}
        }
        if device.class == DeviceClass::Indoor {
            let existing = self
                .device_store
                .list_station_devices(station_id, DeviceClass::Indoor)
                .await?;
            if let Some(other) = existing.into_iter().find(|item| item.imei != imei) {
                return Err(RegistryError::IndoorTaken {
                    station_id,
                    imei: other.imei,
                });
            }
        }
        let updated = match self.device_store.set_station(imei, Some(station_id)).await {
            Ok(updated) => updated,
            // 并发绑定时由唯一索引兜底
            Err(err) if err.kind() == StorageErrorKind::Conflict => {
                let holder = self
                    .device_store
                    .list_station_devices(station_id, DeviceClass::Indoor)
                    .await?
                    .into_iter()
                    .next()
                    .map(|item| item.imei)
                    .unwrap_or_default();
                return Err(RegistryError::IndoorTaken {
                    station_id,
                    imei: holder,
                });
            }
            Err(err) if err.kind() == StorageErrorKind::NotFound => {
                return Err(RegistryError::StationNotFound(station_id));
            }
            Err(err) => return Err(err.into()),
        };
        let updated = updated.ok_or_else(|| RegistryError::DeviceNotFound(imei.to_string()))?;
        info!(
            target: "relay.registry",
            imei = %imei,
            station_id = station_id,
            device_class = %updated.class,
            "device_bound"
        );
        Ok(updated)
    }

    /// 解除设备绑定。
    pub async fn unbind(&self, imei: &str) -> Result<DeviceRecord, RegistryError> {
        let updated = self
            .device_store
            .set_station(imei, None)
            .await?
            .ok_or_else(|| RegistryError::DeviceNotFound(imei.to_string()))?;
        info!(target: "relay.registry", imei = %imei, "device_unbound");
        Ok(updated)
    }
}
