//! 设备内存存储实现
//!
//! 仅用于本地演示和测试。
//!
//! 与 Postgres 实现保持同样的约束：
//! - IMEI 唯一，重复插入返回已有记录
//! - 同一加油站最多绑定一台室内机
//!
//! 不校验加油站是否存在（Postgres 由外键保证，管理面由 registry 校验）。

use crate::error::StorageError;
use crate::models::{DeviceRecord, NewDeviceRecord};
use crate::traits::{DeviceStore, DeviceWriteResult};
use domain::DeviceClass;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct DeviceTable {
    by_imei: HashMap<String, DeviceRecord>,
    next_id: i64,
}

/// 设备内存存储
///
/// 使用 RwLock + HashMap 提供线程安全的内存存储，写锁内完成"查重 + 插入"。
pub struct InMemoryDeviceStore {
    devices: RwLock<DeviceTable>,
}

impl InMemoryDeviceStore {
    /// 创建新的设备存储
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(DeviceTable::default()),
        }
    }

    /// 当前设备数量
    pub fn len(&self) -> usize {
        self.devices
            .read()
            .map(|table| table.by_imei.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn find_device(&self, imei: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let item = self
            .devices
            .read()
            .ok()
            .and_then(|table| table.by_imei.get(imei).cloned());
        Ok(item)
    }

    async fn insert_device_if_absent(
        &self,
        record: NewDeviceRecord,
    ) -> Result<DeviceWriteResult, StorageError> {
        let mut table = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if let Some(existing) = table.by_imei.get(&record.imei) {
            return Ok(DeviceWriteResult {
                record: existing.clone(),
                inserted: false,
            });
        }
        table.next_id += 1;
        let device = DeviceRecord {
            device_id: table.next_id,
            imei: record.imei,
            class: record.class,
            name: record.name,
            station_id: record.station_id,
            last_seen_at_ms: record.last_seen_at_ms,
            battery_voltage: None,
            created_at_ms: record.created_at_ms,
            updated_at_ms: record.created_at_ms,
        };
        table.by_imei.insert(device.imei.clone(), device.clone());
        Ok(DeviceWriteResult {
            record: device,
            inserted: true,
        })
    }

    async fn touch_device(
        &self,
        imei: &str,
        seen_at_ms: i64,
        battery_voltage: Option<f64>,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let mut table = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let Some(device) = table.by_imei.get_mut(imei) else {
            return Ok(None);
        };
        device.last_seen_at_ms = Some(seen_at_ms);
        if let Some(voltage) = battery_voltage {
            device.battery_voltage = Some(voltage);
        }
        device.updated_at_ms = seen_at_ms;
        Ok(Some(device.clone()))
    }

    async fn list_station_devices(
        &self,
        station_id: i64,
        class: DeviceClass,
    ) -> Result<Vec<DeviceRecord>, StorageError> {
        let mut items: Vec<DeviceRecord> = self
            .devices
            .read()
            .map(|table| {
                table
                    .by_imei
                    .values()
                    .filter(|item| item.station_id == Some(station_id) && item.class == class)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        items.sort_by_key(|item| item.device_id);
        Ok(items)
    }

    async fn set_station(
        &self,
        imei: &str,
        station_id: Option<i64>,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let mut table = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let Some(class) = table.by_imei.get(imei).map(|device| device.class) else {
            return Ok(None);
        };
        if let (DeviceClass::Indoor, Some(station_id)) = (class, station_id) {
            let taken = table.by_imei.values().any(|item| {
                item.imei != imei
                    && item.class == DeviceClass::Indoor
                    && item.station_id == Some(station_id)
            });
            if taken {
                return Err(StorageError::conflict("station already has an indoor device"));
            }
        }
        let now_ms = domain::now_epoch_ms();
        let Some(device) = table.by_imei.get_mut(imei) else {
            return Ok(None);
        };
        device.station_id = station_id;
        device.updated_at_ms = now_ms;
        Ok(Some(device.clone()))
    }
}
