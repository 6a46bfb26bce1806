//! 数据模型
//!
//! 定义所有存储相关的数据模型：
//! - 加油站：StationRecord, NewStationRecord
//! - 设备（含绑定关系与派生状态）：DeviceRecord, NewDeviceRecord
//! - 通讯记录：CommLogRecord
//! - 报警记录：AlarmRecord
//!
//! 时间字段统一为 Unix 毫秒（`*_ms`）。

use domain::{AlarmType, CommDirection, DeviceClass, OnlineStatus, online_status};

/// 加油站记录。
#[derive(Debug, Clone)]
pub struct StationRecord {
    pub station_id: i64,
    pub name: String,
    pub code: String,
    pub address: String,
    pub contact: String,
    pub phone: String,
    /// 1 启用，0 禁用
    pub status: i16,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// 加油站创建输入。
#[derive(Debug, Clone, Default)]
pub struct NewStationRecord {
    pub name: String,
    pub code: String,
    pub address: String,
    pub contact: String,
    pub phone: String,
}

/// 设备记录。
///
/// 绑定关系以 `station_id` 表达；`last_seen_at_ms` / `battery_voltage` 由入站报文刷新。
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub device_id: i64,
    pub imei: String,
    pub class: DeviceClass,
    pub name: String,
    pub station_id: Option<i64>,
    pub last_seen_at_ms: Option<i64>,
    /// 电池电压（V）
    pub battery_voltage: Option<f64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl DeviceRecord {
    pub fn online_status(&self, now_ms: i64, offline_after_ms: i64) -> OnlineStatus {
        online_status(self.last_seen_at_ms, now_ms, offline_after_ms)
    }
}

/// 设备创建输入。
#[derive(Debug, Clone)]
pub struct NewDeviceRecord {
    pub imei: String,
    pub class: DeviceClass,
    pub name: String,
    pub station_id: Option<i64>,
    pub last_seen_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

/// 通讯记录（只追加）。
#[derive(Debug, Clone)]
pub struct CommLogRecord {
    pub log_id: String,
    pub direction: CommDirection,
    pub source_class: DeviceClass,
    pub source_imei: String,
    pub target_class: Option<DeviceClass>,
    pub target_imei: Option<String>,
    pub topic: String,
    /// 原始报文字节（不做编码转换）
    pub payload: Vec<u8>,
    pub station_id: Option<i64>,
    pub created_at_ms: i64,
}

/// 报警记录（只追加）。
#[derive(Debug, Clone)]
pub struct AlarmRecord {
    pub alarm_id: String,
    pub station_id: i64,
    pub indoor_imei: String,
    pub alarm_type: AlarmType,
    /// 本次实际转发到的室外机 IMEI（按转发顺序）
    pub outdoor_imeis: Vec<String>,
    /// 全部目标发布成功时为 true
    pub forward_ok: bool,
    pub created_at_ms: i64,
}
