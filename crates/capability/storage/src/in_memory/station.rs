//! 加油站内存存储实现

use crate::error::StorageError;
use crate::models::{NewStationRecord, StationRecord};
use crate::traits::StationStore;
use std::sync::RwLock;

/// 加油站内存存储
pub struct InMemoryStationStore {
    stations: RwLock<Vec<StationRecord>>,
}

impl InMemoryStationStore {
    /// 创建新的加油站存储
    pub fn new() -> Self {
        Self {
            stations: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StationStore for InMemoryStationStore {
    async fn create_station(
        &self,
        record: NewStationRecord,
    ) -> Result<StationRecord, StorageError> {
        let mut stations = self
            .stations
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if stations.iter().any(|item| item.code == record.code) {
            return Err(StorageError::conflict("station code exists"));
        }
        let now_ms = domain::now_epoch_ms();
        let station = StationRecord {
            station_id: stations.len() as i64 + 1,
            name: record.name,
            code: record.code,
            address: record.address,
            contact: record.contact,
            phone: record.phone,
            status: 1,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        stations.push(station.clone());
        Ok(station)
    }

    async fn find_station(&self, station_id: i64) -> Result<Option<StationRecord>, StorageError> {
        let item = self
            .stations
            .read()
            .ok()
            .and_then(|items| {
                items
                    .iter()
                    .find(|item| item.station_id == station_id)
                    .cloned()
            });
        Ok(item)
    }
}
