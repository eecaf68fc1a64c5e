// ==========================================
// 采购申请跟踪系统 - 自定义字段配置仓储
// ==========================================
// 职责: custom_field_config 的读取与配置
// 说明: 槽位在建表时预置，这里只改标签与开关
// ==========================================

use crate::domain::custom_field::{is_custom_slot, CustomFieldConfig, CustomFieldRegistry};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct CustomFieldRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CustomFieldRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 加载登记表快照（按显示顺序）
    pub fn load_registry(&self) -> RepositoryResult<CustomFieldRegistry> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT slot_name, label, is_active, is_searchable
            FROM custom_field_config
            ORDER BY display_order ASC, slot_name ASC
            "#,
        )?;
        let fields = stmt
            .query_map([], |row| {
                Ok(CustomFieldConfig {
                    slot_name: row.get(0)?,
                    label: row.get(1)?,
                    is_active: row.get::<_, i32>(2)? != 0,
                    is_searchable: row.get::<_, i32>(3)? != 0,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(CustomFieldRegistry::new(fields))
    }

    /// 配置一个槽位
    pub fn configure(&self, config: &CustomFieldConfig) -> RepositoryResult<()> {
        if !is_custom_slot(&config.slot_name) {
            return Err(RepositoryError::FieldValueError {
                field: "slot_name".to_string(),
                message: format!("未知的自定义字段槽位: {}", config.slot_name),
            });
        }

        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE custom_field_config
            SET label = ?1, is_active = ?2, is_searchable = ?3
            WHERE slot_name = ?4
            "#,
            params![
                config.label,
                config.is_active as i32,
                config.is_searchable as i32,
                config.slot_name,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "CustomFieldConfig".to_string(),
                id: config.slot_name.clone(),
            });
        }
        Ok(())
    }
}
