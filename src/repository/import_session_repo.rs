// ==========================================
// 采购申请跟踪系统 - 导入会话仓储
// ==========================================
// 职责: import_sessions / import_mappings 的读写
// 红线: Repository 不含状态机规则，只做数据 CRUD
// 说明: *_tx 系列函数接收 &Connection，可在事务或保存点内调用
// ==========================================

use crate::domain::import_session::{
    ColumnMapping, ImportSession, MappingUpdate, NewColumnMapping, NewImportSession,
};
use crate::domain::types::SessionStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{Local, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SESSION_COLUMNS: &str = r#"
    id, original_filename, stored_filename, file_size, total_rows, status,
    processed_rows, success_rows, error_rows, created_by, created_at, updated_at
"#;

fn map_session_row(row: &Row<'_>) -> rusqlite::Result<ImportSession> {
    let raw_status: String = row.get(5)?;
    let status = SessionStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("未知的会话状态: {}", raw_status).into(),
        )
    })?;

    Ok(ImportSession {
        id: row.get(0)?,
        original_filename: row.get(1)?,
        stored_filename: row.get(2)?,
        file_size: row.get(3)?,
        total_rows: row.get(4)?,
        status,
        processed_rows: row.get(6)?,
        success_rows: row.get(7)?,
        error_rows: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn map_mapping_row(row: &Row<'_>) -> rusqlite::Result<ColumnMapping> {
    Ok(ColumnMapping {
        id: row.get(0)?,
        import_session_id: row.get(1)?,
        column_index: row.get::<_, i64>(2)? as usize,
        excel_column: row.get(3)?,
        database_field: row.get(4)?,
        sample_data: row.get(5)?,
        confidence_score: row.get(6)?,
    })
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

// ==========================================
// ImportSessionRepository
// ==========================================
pub struct ImportSessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportSessionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 创建会话及其列映射（同一事务）
    ///
    /// # 返回
    /// - Ok(session_id)
    pub fn create_with_mappings(
        &self,
        session: &NewImportSession,
        mappings: &[NewColumnMapping],
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let ts = now();
        tx.execute(
            r#"
            INSERT INTO import_sessions (
                original_filename, stored_filename, file_size, total_rows, status,
                processed_rows, success_rows, error_rows, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, 0, ?6, ?7, ?7)
            "#,
            params![
                session.original_filename,
                session.stored_filename,
                session.file_size,
                session.total_rows,
                SessionStatus::Pending.as_str(),
                session.created_by,
                ts,
            ],
        )?;
        let session_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO import_mappings (
                    import_session_id, column_index, excel_column, database_field,
                    sample_data, confidence_score
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for mapping in mappings {
                stmt.execute(params![
                    session_id,
                    mapping.column_index as i64,
                    mapping.excel_column,
                    mapping.database_field,
                    mapping.sample_data,
                    mapping.confidence_score,
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(session_id)
    }

    /// 批量改写映射目标字段（同一事务，全部成功或全部不写）
    pub fn update_mapping_fields(&self, updates: &[MappingUpdate]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        for update in updates {
            let affected = tx.execute(
                "UPDATE import_mappings SET database_field = ?1 WHERE id = ?2",
                params![update.database_field, update.id],
            )?;
            if affected == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "ImportMapping".to_string(),
                    id: update.id.to_string(),
                });
            }
            count += affected;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    /// 更新会话状态（独立语句）
    pub fn update_status(&self, session_id: i64, status: SessionStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::update_status_tx(&conn, session_id, status)
    }

    /// 在事务中更新会话状态
    pub fn update_status_tx(
        conn: &Connection,
        session_id: i64,
        status: SessionStatus,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE import_sessions SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now(), session_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportSession".to_string(),
                id: session_id.to_string(),
            });
        }
        Ok(())
    }

    /// 在事务中写入执行结果计数并置为 completed
    pub fn complete_tx(
        conn: &Connection,
        session_id: i64,
        processed_rows: i64,
        success_rows: i64,
        error_rows: i64,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            r#"
            UPDATE import_sessions
            SET status = ?1, processed_rows = ?2, success_rows = ?3, error_rows = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
            params![
                SessionStatus::Completed.as_str(),
                processed_rows,
                success_rows,
                error_rows,
                now(),
                session_id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportSession".to_string(),
                id: session_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, session_id: i64) -> RepositoryResult<Option<ImportSession>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM import_sessions WHERE id = ?1", SESSION_COLUMNS);
        let session = conn
            .query_row(&sql, params![session_id], map_session_row)
            .optional()?;
        Ok(session)
    }

    /// 会话的全部映射（按列顺序）
    pub fn list_mappings(&self, session_id: i64) -> RepositoryResult<Vec<ColumnMapping>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, import_session_id, column_index, excel_column, database_field,
                   sample_data, confidence_score
            FROM import_mappings
            WHERE import_session_id = ?1
            ORDER BY column_index ASC, id ASC
            "#,
        )?;
        let mappings = stmt
            .query_map(params![session_id], map_mapping_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(mappings)
    }
}
