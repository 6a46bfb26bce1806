//! 存储接口 Trait 定义
//!
//! - StationStore：加油站存储
//! - DeviceStore：设备存储（绑定关系 + 派生状态）
//! - AuditLogStore：通讯记录/报警记录（只追加）
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{
    AlarmRecord, CommLogRecord, DeviceRecord, NewDeviceRecord, NewStationRecord, StationRecord,
};
use async_trait::async_trait;
use domain::DeviceClass;

/// 设备写入结果。
///
/// `inserted = false` 表示 IMEI 已存在，`record` 为库中已有记录。
#[derive(Debug, Clone)]
pub struct DeviceWriteResult {
    pub record: DeviceRecord,
    pub inserted: bool,
}

/// 加油站存储接口
#[async_trait]
pub trait StationStore: Send + Sync {
    /// 创建加油站（编号重复返回冲突错误）
    async fn create_station(
        &self,
        record: NewStationRecord,
    ) -> Result<StationRecord, StorageError>;

    /// 查找指定加油站
    async fn find_station(&self, station_id: i64) -> Result<Option<StationRecord>, StorageError>;
}

/// 设备存储接口
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// 按 IMEI 查找设备
    async fn find_device(&self, imei: &str) -> Result<Option<DeviceRecord>, StorageError>;

    /// IMEI 不存在时插入；已存在时返回已有记录，不覆盖任何字段
    async fn insert_device_if_absent(
        &self,
        record: NewDeviceRecord,
    ) -> Result<DeviceWriteResult, StorageError>;

    /// 刷新最后在线时间；`battery_voltage` 为 Some 时同时更新电压
    async fn touch_device(
        &self,
        imei: &str,
        seen_at_ms: i64,
        battery_voltage: Option<f64>,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 列出绑定到指定加油站的某类设备（按 device_id 升序）
    async fn list_station_devices(
        &self,
        station_id: i64,
        class: DeviceClass,
    ) -> Result<Vec<DeviceRecord>, StorageError>;

    /// 设置或清除设备绑定；同站第二台室内机返回冲突错误
    async fn set_station(
        &self,
        imei: &str,
        station_id: Option<i64>,
    ) -> Result<Option<DeviceRecord>, StorageError>;
}

/// 通讯记录/报警记录存储接口（只追加，不提供修改和删除）
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// 追加一条通讯记录
    async fn append_comm_log(&self, record: CommLogRecord) -> Result<(), StorageError>;

    /// 原子追加一批转发记录及（可选的）报警记录
    async fn append_forwards(
        &self,
        forwards: Vec<CommLogRecord>,
        alarm: Option<AlarmRecord>,
    ) -> Result<(), StorageError>;
}
