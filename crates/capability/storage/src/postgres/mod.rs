//! # PostgreSQL 存储实现模块
//!
//! 本模块提供所有存储接口的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 查询使用参数绑定，防止 SQL 注入攻击
//! 2. **约束下沉**：IMEI 唯一、同站唯一室内机由数据库索引保证，应用层只做友好校验
//! 3. **冲突即读取**：设备自动注册使用 `on conflict do nothing`，冲突时回读已有行
//! 4. **连接池管理**：使用连接池复用数据库连接
//!
//! ## 包含的实现
//!
//! - **StationStore** (`station.rs`)：加油站存储
//! - **DeviceStore** (`device.rs`)：设备存储（绑定关系 + last_seen / 电压）
//! - **AuditLogStore** (`audit.rs`)：通讯记录与报警记录（只追加）
//!
//! ## 数据库模式要求
//!
//! 表结构见 `migrations/0001_init.sql`，可通过 [`crate::ensure_schema`] 执行：
//! - `stations`：加油站表（station_id, name, code, address, contact, phone, status）
//! - `devices`：设备表（device_id, imei, device_type, name, station_id, last_seen_at, battery_voltage）
//! - `comm_logs`：通讯记录表（direction, source/target, topic, payload, station_id）
//! - `alarm_logs`：报警记录表（station_id, indoor_imei, alarm_type, outdoor_imeis, forward_status）
//!
//! ## 时间字段
//!
//! 库内使用 `timestamptz`，跨越 Rust 边界时统一换算为 Unix 毫秒：
//! 写入 `to_timestamp($n / 1000.0)`，读取 `(extract(epoch from col) * 1000)::bigint`。
//!
//! ## 事务支持
//!
//! 转发记录与报警记录在同一事务内写入（`append_forwards`）。

pub mod audit;
pub mod device;
pub mod station;

pub use audit::*;
pub use device::*;
pub use station::*;
