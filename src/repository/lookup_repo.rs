// ==========================================
// 采购申请跟踪系统 - 外键字典仓储
// ==========================================
// 职责: departments / buyers / statuses 的读取与维护
// 用途: execute 开始时一次性加载，交给外键解析器
// ==========================================

use crate::domain::procurement::{LookupDomain, LookupEntry};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

fn table_name(domain: LookupDomain) -> &'static str {
    match domain {
        LookupDomain::Department => "departments",
        LookupDomain::Buyer => "buyers",
        LookupDomain::Status => "statuses",
    }
}

pub struct LookupRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LookupRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取整张字典表（按 id 升序，解析时先到先得）
    pub fn list(&self, domain: LookupDomain) -> RepositoryResult<Vec<LookupEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT id, name FROM {} ORDER BY id ASC", table_name(domain));
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], |row| {
                Ok(LookupEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// 新增字典项
    ///
    /// # 返回
    /// - Ok(id)
    pub fn insert(&self, domain: LookupDomain, name: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let sql = format!("INSERT INTO {} (name) VALUES (?1)", table_name(domain));
        conn.execute(&sql, params![name])?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_list_per_domain() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        let repo = LookupRepository::new(Arc::new(Mutex::new(conn)));

        let it = repo.insert(LookupDomain::Department, "IT").unwrap();
        repo.insert(LookupDomain::Buyer, "Ato Heryanto").unwrap();

        let departments = repo.list(LookupDomain::Department).unwrap();
        assert_eq!(departments, vec![LookupEntry { id: it, name: "IT".to_string() }]);
        assert!(repo.list(LookupDomain::Status).unwrap().is_empty());
    }
}
