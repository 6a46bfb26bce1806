//! Postgres 设备存储实现
//!
//! 设计要点：
//! - `imei` 唯一索引：并发首次上报只会落一行，冲突时回读
//! - `uq_devices_station_indoor` 部分唯一索引：同站只允许一台室内机
//! - 使用参数化 SQL 防止注入

use crate::error::StorageError;
use crate::models::{DeviceRecord, NewDeviceRecord};
use crate::traits::{DeviceStore, DeviceWriteResult};
use domain::DeviceClass;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const DEVICE_COLUMNS: &str = "device_id, imei, device_type, name, station_id, \
     (extract(epoch from last_seen_at) * 1000)::bigint as last_seen_at_ms, \
     battery_voltage, \
     (extract(epoch from created_at) * 1000)::bigint as created_at_ms, \
     (extract(epoch from updated_at) * 1000)::bigint as updated_at_ms";

pub struct PgDeviceStore {
    pub pool: PgPool,
}

impl PgDeviceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn device_from_row(row: &PgRow) -> Result<DeviceRecord, StorageError> {
    let device_type: String = row.try_get("device_type")?;
    let class = device_type
        .parse::<DeviceClass>()
        .map_err(|err| StorageError::new(err.to_string()))?;
    Ok(DeviceRecord {
        device_id: row.try_get("device_id")?,
        imei: row.try_get("imei")?,
        class,
        name: row.try_get("name")?,
        station_id: row.try_get("station_id")?,
        last_seen_at_ms: row.try_get("last_seen_at_ms")?,
        battery_voltage: row.try_get("battery_voltage")?,
        created_at_ms: row.try_get("created_at_ms")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

#[async_trait::async_trait]
impl DeviceStore for PgDeviceStore {
    async fn find_device(&self, imei: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!("select {DEVICE_COLUMNS} from devices where imei = $1");
        let row = sqlx::query(&sql)
            .bind(imei)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(device_from_row(&row)?))
    }

    async fn insert_device_if_absent(
        &self,
        record: NewDeviceRecord,
    ) -> Result<DeviceWriteResult, StorageError> {
        let sql = format!(
            "insert into devices \
             (imei, device_type, name, station_id, last_seen_at, created_at, updated_at) \
             values ($1, $2, $3, $4, to_timestamp($5 / 1000.0), \
             to_timestamp($6 / 1000.0), to_timestamp($6 / 1000.0)) \
             on conflict (imei) do nothing \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&record.imei)
            .bind(record.class.as_str())
            .bind(&record.name)
            .bind(record.station_id)
            .bind(record.last_seen_at_ms.map(|ms| ms as f64))
            .bind(record.created_at_ms as f64)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = row {
            return Ok(DeviceWriteResult {
                record: device_from_row(&row)?,
                inserted: true,
            });
        }
        // 唯一键冲突：另一条并发报文已完成注册，按读取处理
        let existing = self
            .find_device(&record.imei)
            .await?
            .ok_or_else(|| StorageError::new("device vanished after insert conflict"))?;
        Ok(DeviceWriteResult {
            record: existing,
            inserted: false,
        })
    }

    async fn touch_device(
        &self,
        imei: &str,
        seen_at_ms: i64,
        battery_voltage: Option<f64>,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!(
            "update devices set \
             last_seen_at = to_timestamp($2 / 1000.0), \
             battery_voltage = coalesce($3, battery_voltage), \
             updated_at = to_timestamp($2 / 1000.0) \
             where imei = $1 \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(imei)
            .bind(seen_at_ms as f64)
            .bind(battery_voltage)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(device_from_row(&row)?))
    }

    async fn list_station_devices(
        &self,
        station_id: i64,
        class: DeviceClass,
    ) -> Result<Vec<DeviceRecord>, StorageError> {
        let sql = format!(
            "select {DEVICE_COLUMNS} from devices \
             where station_id = $1 and device_type = $2 \
             order by device_id"
        );
        let rows = sqlx::query(&sql)
            .bind(station_id)
            .bind(class.as_str())
            .fetch_all(&self.pool)
            .await?;
        let mut devices = Vec::with_capacity(rows.len());
        for row in rows {
            devices.push(device_from_row(&row)?);
        }
        Ok(devices)
    }

    async fn set_station(
        &self,
        imei: &str,
        station_id: Option<i64>,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!(
            "update devices set station_id = $2, updated_at = now() \
             where imei = $1 \
             returning {DEVICE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(imei)
            .bind(station_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(device_from_row(&row)?))
    }
}
