//! 通讯记录/报警记录内存实现
//!
//! 仅用于本地测试和演示。

use crate::error::StorageError;
use crate::models::{AlarmRecord, CommLogRecord};
use crate::traits::AuditLogStore;
use std::sync::RwLock;

#[derive(Default)]
struct AuditTables {
    comm_logs: Vec<CommLogRecord>,
    alarms: Vec<AlarmRecord>,
}

/// 通讯记录/报警记录内存存储
///
/// 两张表放在同一把锁下，保证批量追加的原子性。
pub struct InMemoryAuditLogStore {
    tables: RwLock<AuditTables>,
}

impl InMemoryAuditLogStore {
    /// 创建新的审计存储
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(AuditTables::default()),
        }
    }

    /// 按写入顺序返回全部通讯记录
    pub fn comm_logs(&self) -> Vec<CommLogRecord> {
        self.tables
            .read()
            .map(|tables| tables.comm_logs.clone())
            .unwrap_or_default()
    }

    /// 按写入顺序返回全部报警记录
    pub fn alarms(&self) -> Vec<AlarmRecord> {
        self.tables
            .read()
            .map(|tables| tables.alarms.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryAuditLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuditLogStore for InMemoryAuditLogStore {
    async fn append_comm_log(&self, record: CommLogRecord) -> Result<(), StorageError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        tables.comm_logs.push(record);
        Ok(())
    }

    async fn append_forwards(
        &self,
        forwards: Vec<CommLogRecord>,
        alarm: Option<AlarmRecord>,
    ) -> Result<(), StorageError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        tables.comm_logs.extend(forwards);
        if let Some(alarm) = alarm {
            tables.alarms.push(alarm);
        }
        Ok(())
    }
}
