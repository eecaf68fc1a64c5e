// ==========================================
// 采购申请跟踪系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)，值统一为 JSON 文本
// ==========================================

use crate::config::import_config_trait::{BuyerAlias, ImportConfigReader};
use crate::importer::error::{ImportError, ImportResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 默认预览行数
pub const DEFAULT_PREVIEW_LIMIT: usize = 10;

/// 默认上传大小上限（10 MiB）
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// 默认数据目录名（位于系统数据目录下）
pub const DEFAULT_STORAGE_DIR_NAME: &str = "procurement-import";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ImportError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))?;

        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ImportError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取 JSON 配置并反序列化，缺失时返回 None
    ///
    /// 格式错误视为配置错误（不静默回退），便于运维发现问题
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> ImportResult<Option<T>> {
        match self.get_config_value(key)? {
            None => Ok(None),
            Some(raw) => serde_json::from_str::<T>(&raw)
                .map(Some)
                .map_err(|e| ImportError::ConfigValueError {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
impl ImportConfigReader for ConfigManager {
    fn get_legacy_status_mapping(&self) -> ImportResult<HashMap<String, String>> {
        Ok(self
            .get_json(config_keys::LEGACY_STATUS_MAPPING)?
            .unwrap_or_else(default_legacy_status_mapping))
    }

    fn get_buyer_aliases(&self) -> ImportResult<Vec<BuyerAlias>> {
        Ok(self
            .get_json(config_keys::BUYER_ALIASES)?
            .unwrap_or_else(default_buyer_aliases))
    }

    fn get_preview_limit(&self) -> ImportResult<usize> {
        let limit: Option<usize> = self.get_json(config_keys::PREVIEW_LIMIT)?;
        Ok(limit.filter(|&n| n > 0).unwrap_or(DEFAULT_PREVIEW_LIMIT))
    }

    fn get_max_upload_bytes(&self) -> ImportResult<u64> {
        let limit: Option<u64> = self.get_json(config_keys::MAX_UPLOAD_BYTES)?;
        Ok(limit.filter(|&n| n > 0).unwrap_or(DEFAULT_MAX_UPLOAD_BYTES))
    }
}

// ==========================================
// 内置默认值
// ==========================================

/// 历史状态名 → 当前状态名
pub fn default_legacy_status_mapping() -> HashMap<String, String> {
    [
        ("Konfirmasi Spesifikasi", "Evaluasi Teknis & Komersial"),
        ("Konfirmasi Anggaran", "Evaluasi Teknis & Komersial"),
        ("App. Nego", "Negosiasi"),
        ("Auction", "Negosiasi"),
        ("Approval PO", "PO/SPK"),
        ("PO", "PO/SPK"),
        ("TTD PO", "PO/SPK"),
        ("LOI/Belum PO", "PO/SPK"),
        ("SPK", "PO/SPK"),
        ("TTD SPK", "PO/SPK"),
        ("Rebid", "RFQ"),
        ("PR Dibatalkan", "Dibatalkan"),
        ("PO dibatalkan", "Dibatalkan"),
        ("PR dikembalikan ke PPP untuk di proses di PI", "DUR"),
    ]
    .iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}

/// 采购员昵称 → 全名（按顺序匹配，首个命中生效）
pub fn default_buyer_aliases() -> Vec<BuyerAlias> {
    vec![
        BuyerAlias::new("akbar", "Akbar Faturahman"),
        BuyerAlias::new("ato", "Ato Heryanto"),
        BuyerAlias::new("cholida", "Cholida Maranani"),
        BuyerAlias::new("dian", "Dian Sholihat"),
        BuyerAlias::new("dicky", "Dicky Setiagraha"),
        BuyerAlias::new("eggy", "Eggy Baharudin"),
        BuyerAlias::new("erik", "Erik Erdiana"),
        BuyerAlias::new("erwin", "Erwin Herdiana"),
        BuyerAlias::new("gugun", "Gugun GT"),
        BuyerAlias::new("heru", "Heru Winata Praja"),
        BuyerAlias::new("mutia", "Mutia Virgiana"),
        BuyerAlias::new("nawang", "Nawang Wulan"),
        BuyerAlias::new("tathu", "Tathu RA"),
    ]
}

/// 默认存储目录: <系统数据目录>/procurement-import（取不到时退回当前目录）
pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_STORAGE_DIR_NAME)
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 外键解析
    pub const LEGACY_STATUS_MAPPING: &str = "import.legacy_status_mapping"; // JSON 对象
    pub const BUYER_ALIASES: &str = "import.buyer_aliases"; // JSON 数组 [{token, full_name}]

    // 会话流程
    pub const PREVIEW_LIMIT: &str = "import.preview_limit";
    pub const MAX_UPLOAD_BYTES: &str = "import.max_upload_bytes";
}
