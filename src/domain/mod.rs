// ==========================================
// 采购申请跟踪系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod activity_log;
pub mod custom_field;
pub mod import_session;
pub mod procurement;
pub mod types;

// 重导出核心类型
pub use activity_log::{ActivityEventType, ActivityLog};
pub use custom_field::{CustomFieldConfig, CustomFieldRegistry, CUSTOM_FIELD_SLOTS};
pub use import_session::{
    ColumnMapping, ExecuteReport, ImportOutcome, ImportSession, MappedRow, MappingUpdate,
    NewColumnMapping, NewImportSession, PreviewReport, PreviewRow, PreviewSummary, SessionDetail,
    UploadSummary,
};
pub use procurement::{
    available_fields, is_writable_column, AvailableField, FieldKind, FieldSpec, ItemFields,
    LookupDomain, LookupEntry, ProcurementItem, STANDARD_FIELDS,
};
pub use types::{CellValue, FieldValue, ImportAction, PreviewStatus, SessionStatus};
