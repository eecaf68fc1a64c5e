// ==========================================
// 采购申请跟踪系统 - 采购明细仓储
// ==========================================
// 职责: procurement_items 的对账查询与写入
// 红线: 列名只能来自白名单（is_writable_column），值一律参数化
// 说明: *_tx 系列函数接收 &Connection，可在事务或保存点内调用
// ==========================================

use crate::domain::custom_field::CUSTOM_FIELD_SLOTS;
use crate::domain::procurement::{is_writable_column, ItemFields, ProcurementItem};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::sync::{Arc, Mutex, MutexGuard};

/// 对账命中的已有记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingItem {
    pub id: i64,
    pub version: i64,
}

const ITEM_COLUMNS: &str = r#"
    id, no_pr, mat_code, nama_barang, item_category, qty, um, pg, user_requester, nilai,
    department_id, tgl_terima_dokumen, procx_manual, buyer_id, status_id, tgl_status,
    is_emergency, no_po, nama_vendor, tgl_po, tgl_datang, keterangan,
    custom_field_1, custom_field_2, custom_field_3, custom_field_4, custom_field_5,
    version, created_by, updated_by, created_at, updated_at
"#;

fn map_item_row(row: &Row<'_>) -> rusqlite::Result<ProcurementItem> {
    let mut custom_fields = Vec::with_capacity(CUSTOM_FIELD_SLOTS);
    for idx in 0..CUSTOM_FIELD_SLOTS {
        custom_fields.push(row.get::<_, Option<String>>(22 + idx)?);
    }

    Ok(ProcurementItem {
        id: row.get(0)?,
        no_pr: row.get(1)?,
        mat_code: row.get(2)?,
        nama_barang: row.get(3)?,
        item_category: row.get(4)?,
        qty: row.get(5)?,
        um: row.get(6)?,
        pg: row.get(7)?,
        user_requester: row.get(8)?,
        nilai: row.get(9)?,
        department_id: row.get(10)?,
        tgl_terima_dokumen: row.get(11)?,
        procx_manual: row.get(12)?,
        buyer_id: row.get(13)?,
        status_id: row.get(14)?,
        tgl_status: row.get(15)?,
        is_emergency: row.get(16)?,
        no_po: row.get(17)?,
        nama_vendor: row.get(18)?,
        tgl_po: row.get(19)?,
        tgl_datang: row.get(20)?,
        keterangan: row.get(21)?,
        custom_fields,
        version: row.get(27)?,
        created_by: row.get(28)?,
        updated_by: row.get(29)?,
        created_at: row.get(30)?,
        updated_at: row.get(31)?,
    })
}

fn ensure_writable(fields: &ItemFields) -> RepositoryResult<()> {
    match fields.keys().find(|name| !is_writable_column(name)) {
        Some(name) => Err(RepositoryError::FieldValueError {
            field: name.clone(),
            message: "column is not writable".to_string(),
        }),
        None => Ok(()),
    }
}

// ==========================================
// ProcurementItemRepository
// ==========================================
pub struct ProcurementItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcurementItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 事务内操作（对账 / 写入）
    // ==========================================

    /// 按复合身份 (no_pr, nama_barang) 精确查找
    ///
    /// nama_barang 为 None 时匹配 NULL（IS 语义）
    pub fn find_by_identity_tx(
        conn: &Connection,
        no_pr: &str,
        nama_barang: Option<&str>,
    ) -> RepositoryResult<Option<ExistingItem>> {
        let found = conn
            .query_row(
                r#"
                SELECT id, version FROM procurement_items
                WHERE no_pr = ?1 AND nama_barang IS ?2
                ORDER BY id ASC
                LIMIT 1
                "#,
                params![no_pr, nama_barang],
                |row| {
                    Ok(ExistingItem {
                        id: row.get(0)?,
                        version: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }

    /// 同一 no_pr 下已有记录数（含本事务内新插入的记录）
    pub fn count_by_no_pr_tx(conn: &Connection, no_pr: &str) -> RepositoryResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM procurement_items WHERE no_pr = ?1",
            params![no_pr],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 插入新记录
    ///
    /// # 返回
    /// - Ok(id): 新记录 id
    pub fn insert_tx(
        conn: &Connection,
        fields: &ItemFields,
        version: i64,
        created_by: Option<i64>,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        ensure_writable(fields)?;

        let mut columns: Vec<&str> = fields.keys().map(String::as_str).collect();
        let mut values: Vec<&dyn ToSql> = fields.values().map(|v| v as &dyn ToSql).collect();
        // updated_by 留空，首次更新时写入
        columns.extend(["version", "created_by", "created_at", "updated_at"]);
        values.extend([
            &version as &dyn ToSql,
            &created_by as &dyn ToSql,
            &now as &dyn ToSql,
            &now as &dyn ToSql,
        ]);

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO procurement_items ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        conn.execute(&sql, params_from_iter(values))?;
        Ok(conn.last_insert_rowid())
    }

    /// 按 id 更新传入的列（no_pr / version / created_by 不在白名单内）
    pub fn update_tx(
        conn: &Connection,
        id: i64,
        fields: &ItemFields,
        updated_by: Option<i64>,
        now: NaiveDateTime,
    ) -> RepositoryResult<usize> {
        ensure_writable(fields)?;

        let mut assignments: Vec<String> = fields
            .keys()
            .filter(|name| name.as_str() != "no_pr")
            .map(String::clone)
            .collect();
        let mut values: Vec<&dyn ToSql> = fields
            .iter()
            .filter(|(name, _)| name.as_str() != "no_pr")
            .map(|(_, v)| v as &dyn ToSql)
            .collect();
        assignments.extend(["updated_by".to_string(), "updated_at".to_string()]);
        values.extend([&updated_by as &dyn ToSql, &now as &dyn ToSql]);

        let set_clause: Vec<String> = assignments
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect();
        let sql = format!(
            "UPDATE procurement_items SET {} WHERE id = ?{}",
            set_clause.join(", "),
            assignments.len() + 1
        );
        values.push(&id as &dyn ToSql);

        let affected = conn.execute(&sql, params_from_iter(values))?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ProcurementItem".to_string(),
                id: id.to_string(),
            });
        }
        Ok(affected)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<ProcurementItem>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM procurement_items WHERE id = ?1", ITEM_COLUMNS);
        let item = conn.query_row(&sql, params![id], map_item_row).optional()?;
        Ok(item)
    }

    /// 同一 no_pr 下的全部记录（按 version 升序）
    pub fn list_by_no_pr(&self, no_pr: &str) -> RepositoryResult<Vec<ProcurementItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM procurement_items WHERE no_pr = ?1 ORDER BY version ASC, id ASC",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![no_pr], map_item_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM procurement_items", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FieldValue;
    use chrono::Local;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn
    }

    fn fields(pairs: &[(&str, FieldValue)]) -> ItemFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_identity_matches_null_name() {
        let conn = conn();
        let now = Local::now().naive_local();
        let id = ProcurementItemRepository::insert_tx(
            &conn,
            &fields(&[("no_pr", FieldValue::Text("PR-1".into()))]),
            1,
            Some(1),
            now,
        )
        .unwrap();

        let found = ProcurementItemRepository::find_by_identity_tx(&conn, "PR-1", None).unwrap();
        assert_eq!(found, Some(ExistingItem { id, version: 1 }));
        assert_eq!(
            ProcurementItemRepository::find_by_identity_tx(&conn, "PR-1", Some("Widget")).unwrap(),
            None
        );
    }

    #[test]
    fn test_update_keeps_no_pr_and_version() {
        let conn = conn();
        let now = Local::now().naive_local();
        let id = ProcurementItemRepository::insert_tx(
            &conn,
            &fields(&[
                ("no_pr", FieldValue::Text("PR-1".into())),
                ("nama_barang", FieldValue::Text("Widget".into())),
                ("qty", FieldValue::Integer(5)),
            ]),
            2,
            Some(1),
            now,
        )
        .unwrap();

        ProcurementItemRepository::update_tx(
            &conn,
            id,
            &fields(&[
                ("no_pr", FieldValue::Text("PR-OTHER".into())),
                ("qty", FieldValue::Integer(9)),
            ]),
            Some(2),
            now,
        )
        .unwrap();

        let repo = ProcurementItemRepository::new(Arc::new(Mutex::new(conn)));
        let item = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(item.no_pr, "PR-1");
        assert_eq!(item.qty, 9);
        assert_eq!(item.version, 2);
        assert_eq!(item.created_by, Some(1));
        assert_eq!(item.updated_by, Some(2));
    }

    #[test]
    fn test_insert_leaves_updated_by_empty() {
        let conn = conn();
        let id = ProcurementItemRepository::insert_tx(
            &conn,
            &fields(&[("no_pr", FieldValue::Text("PR-1".into()))]),
            1,
            Some(3),
            Local::now().naive_local(),
        )
        .unwrap();

        let repo = ProcurementItemRepository::new(Arc::new(Mutex::new(conn)));
        let item = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(item.created_by, Some(3));
        assert_eq!(item.updated_by, None);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let conn = conn();
        let result = ProcurementItemRepository::insert_tx(
            &conn,
            &fields(&[("version", FieldValue::Integer(7))]),
            1,
            None,
            Local::now().naive_local(),
        );
        assert!(matches!(result, Err(RepositoryError::FieldValueError { .. })));
    }
}
