//! Postgres 加油站存储实现

use crate::error::StorageError;
use crate::models::{NewStationRecord, StationRecord};
use crate::traits::StationStore;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const STATION_COLUMNS: &str = "station_id, name, code, address, contact, phone, status, \
     (extract(epoch from created_at) * 1000)::bigint as created_at_ms, \
     (extract(epoch from updated_at) * 1000)::bigint as updated_at_ms";

pub struct PgStationStore {
    pub pool: PgPool,
}

impl PgStationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn station_from_row(row: &PgRow) -> Result<StationRecord, StorageError> {
    Ok(StationRecord {
        station_id: row.try_get("station_id")?,
        name: row.try_get("name")?,
        code: row.try_get("code")?,
        address: row.try_get("address")?,
        contact: row.try_get("contact")?,
        phone: row.try_get("phone")?,
        status: row.try_get("status")?,
        created_at_ms: row.try_get("created_at_ms")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

#[async_trait::async_trait]
impl StationStore for PgStationStore {
    async fn create_station(
        &self,
        record: NewStationRecord,
    ) -> Result<StationRecord, StorageError> {
        let sql = format!(
            "insert into stations (name, code, address, contact, phone) \
             values ($1, $2, $3, $4, $5) \
             returning {STATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&record.name)
            .bind(&record.code)
            .bind(&record.address)
            .bind(&record.contact)
            .bind(&record.phone)
            .fetch_one(&self.pool)
            .await?;
        station_from_row(&row)
    }

    async fn find_station(&self, station_id: i64) -> Result<Option<StationRecord>, StorageError> {
        let sql = format!("select {STATION_COLUMNS} from stations where station_id = $1");
        let row = sqlx::query(&sql)
            .bind(station_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(station_from_row(&row)?))
    }
}
