//! Postgres 通讯记录/报警记录实现

use crate::error::StorageError;
use crate::models::{AlarmRecord, CommLogRecord};
use crate::traits::AuditLogStore;
use sqlx::{PgPool, Postgres, Transaction};

const INSERT_COMM_LOG: &str = "insert into comm_logs \
     (log_id, direction, source_type, source_imei, target_type, target_imei, \
     topic, payload, station_id, created_at) \
     values ($1, $2, $3, $4, $5, $6, $7, $8, $9, to_timestamp($10 / 1000.0))";

const INSERT_ALARM: &str = "insert into alarm_logs \
     (alarm_id, station_id, indoor_imei, alarm_type, outdoor_imeis, forward_status, created_at) \
     values ($1, $2, $3, $4, $5, $6, to_timestamp($7 / 1000.0))";

pub struct PgAuditLogStore {
    pub pool: PgPool,
}

impl PgAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn comm_log_query(
    record: &CommLogRecord,
) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_COMM_LOG)
        .bind(&record.log_id)
        .bind(record.direction.as_str())
        .bind(record.source_class.as_str())
        .bind(&record.source_imei)
        .bind(record.target_class.map(|class| class.as_str()))
        .bind(&record.target_imei)
        .bind(&record.topic)
        .bind(&record.payload)
        .bind(record.station_id)
        .bind(record.created_at_ms as f64)
}

async fn insert_alarm(
    tx: &mut Transaction<'_, Postgres>,
    alarm: &AlarmRecord,
) -> Result<(), StorageError> {
    let outdoor_imeis = serde_json::to_string(&alarm.outdoor_imeis)
        .map_err(|err| StorageError::new(err.to_string()))?;
    let forward_status: i16 = if alarm.forward_ok { 1 } else { 0 };
    sqlx::query(INSERT_ALARM)
        .bind(&alarm.alarm_id)
        .bind(alarm.station_id)
        .bind(&alarm.indoor_imei)
        .bind(alarm.alarm_type.as_str())
        .bind(outdoor_imeis)
        .bind(forward_status)
        .bind(alarm.created_at_ms as f64)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl AuditLogStore for PgAuditLogStore {
    async fn append_comm_log(&self, record: CommLogRecord) -> Result<(), StorageError> {
        comm_log_query(&record).execute(&self.pool).await?;
        Ok(())
    }

    async fn append_forwards(
        &self,
        forwards: Vec<CommLogRecord>,
        alarm: Option<AlarmRecord>,
    ) -> Result<(), StorageError> {
        if forwards.is_empty() && alarm.is_none() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for record in &forwards {
            comm_log_query(record).execute(&mut *tx).await?;
        }
        if let Some(alarm) = alarm.as_ref() {
            insert_alarm(&mut tx, alarm).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
