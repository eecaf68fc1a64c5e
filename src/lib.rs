// ==========================================
// 采购申请跟踪系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 核心能力: 表格导入 → 列映射识别 → 数据归一化 → 按 (no_pr, nama_barang) 对账落库
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 表格导入与对账
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CellValue, FieldValue, ImportAction, PreviewStatus, SessionStatus};

// 领域实体
pub use domain::{
    ColumnMapping, ExecuteReport, ImportOutcome, ImportSession, PreviewReport, ProcurementItem,
    SessionDetail, UploadSummary,
};

// 导入
pub use importer::{ImportError, ImportResult, ImportSessionService};

// API
pub use api::{ApiError, ApiResult, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Procurement Import";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
