// ==========================================
// 采购申请跟踪系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod activity_log_repo;
pub mod custom_field_repo;
pub mod error;
pub mod import_session_repo;
pub mod lookup_repo;
pub mod procurement_item_repo;

// 重导出核心仓储
pub use activity_log_repo::ActivityLogRepository;
pub use custom_field_repo::CustomFieldRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use import_session_repo::ImportSessionRepository;
pub use lookup_repo::LookupRepository;
pub use procurement_item_repo::{ExistingItem, ProcurementItemRepository};
