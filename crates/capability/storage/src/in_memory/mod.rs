//! 内存存储实现模块
//!
//! 仅用于本地演示和测试。
//!
//! 包含以下实现：
//! - StationStore: InMemoryStationStore
//! - DeviceStore: InMemoryDeviceStore
//! - AuditLogStore: InMemoryAuditLogStore

pub mod audit;
pub mod device;
pub mod station;

pub use audit::*;
pub use device::*;
pub use station::*;
