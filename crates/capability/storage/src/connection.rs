//! 数据库连接管理
//!
//! - connect_pool：建立 Postgres 连接池
//! - ensure_schema：执行建表脚本（可重复执行）

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const SCHEMA_SQL: &str = include_str!("../migrations/0001_init.sql");

/// 建立 Postgres 连接池
///
/// # 参数
/// - `database_url`：Postgres 连接字符串
/// - `max_connections`：最大连接数
pub async fn connect_pool(database_url: &str, max_connections: u32) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// 建表（`create ... if not exists`）
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
