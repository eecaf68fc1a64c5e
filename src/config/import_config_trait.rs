// ==========================================
// 采购申请跟踪系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 采购员昵称别名: 小写片段 → 规范全名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerAlias {
    pub token: String,
    pub full_name: String,
}

impl BuyerAlias {
    pub fn new(token: &str, full_name: &str) -> Self {
        Self {
            token: token.to_string(),
            full_name: full_name.to_string(),
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait ImportConfigReader: Send + Sync {
    // ===== 外键解析配置 =====

    /// 获取历史状态名映射（旧状态名 → 当前状态名）
    ///
    /// # 默认值
    /// - 内置映射，见 config_manager::default_legacy_status_mapping
    fn get_legacy_status_mapping(&self) -> ImportResult<HashMap<String, String>>;

    /// 获取采购员昵称别名（按配置顺序逐个尝试）
    ///
    /// # 默认值
    /// - 内置名单，见 config_manager::default_buyer_aliases
    fn get_buyer_aliases(&self) -> ImportResult<Vec<BuyerAlias>>;

    // ===== 会话流程配置 =====

    /// 获取预览行数
    ///
    /// # 默认值
    /// - 10
    fn get_preview_limit(&self) -> ImportResult<usize>;

    /// 获取上传大小上限（字节）
    ///
    /// # 默认值
    /// - 10 MiB
    fn get_max_upload_bytes(&self) -> ImportResult<u64>;
}
