// ==========================================
// 采购申请跟踪系统 - 配置层
// ==========================================
// 职责: 导入流程配置（别名表 / 预览行数 / 上传上限 / 存储目录）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, default_storage_dir, ConfigManager};
pub use import_config_trait::{BuyerAlias, ImportConfigReader};
