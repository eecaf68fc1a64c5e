// ==========================================
// 采购申请跟踪系统 - 操作日志仓储
// ==========================================
// 职责: activity_logs 的写入与按事件类型查询
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::activity_log::{ActivityEventType, ActivityLog};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, MutexGuard};

fn parse_json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<JsonValue>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn map_log_row(row: &Row<'_>) -> rusqlite::Result<ActivityLog> {
    let raw_type: String = row.get(3)?;
    let event_type = ActivityEventType::parse(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("未知的事件类型: {}", raw_type).into(),
        )
    })?;

    Ok(ActivityLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        procurement_item_id: row.get(2)?,
        event_type,
        description: row.get(4)?,
        old_values: parse_json_column(row, 5)?,
        new_values: parse_json_column(row, 6)?,
        created_at: row.get(7)?,
    })
}

// ==========================================
// ActivityLogRepository - 操作日志仓储
// ==========================================
pub struct ActivityLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActivityLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(id)`: 新日志 id
    pub fn insert(&self, log: &ActivityLog) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO activity_logs (
                user_id, procurement_item_id, event_type, description,
                old_values, new_values, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                log.user_id,
                log.procurement_item_id,
                log.event_type.as_str(),
                log.description,
                log.old_values.as_ref().map(|v| v.to_string()),
                log.new_values.as_ref().map(|v| v.to_string()),
                log.created_at,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// 按事件类型查询（最新在前）
    pub fn list_by_event_type(
        &self,
        event_type: ActivityEventType,
        limit: usize,
    ) -> RepositoryResult<Vec<ActivityLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, procurement_item_id, event_type, description,
                   old_values, new_values, created_at
            FROM activity_logs
            WHERE event_type = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;
        let logs = stmt
            .query_map(params![event_type.as_str(), limit as i64], map_log_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }
}
