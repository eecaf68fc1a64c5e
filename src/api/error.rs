// ==========================================
// 采购申请跟踪系统 - API层错误类型
// ==========================================
// 职责: 将导入层 / 仓储层错误转换为调用方可理解的错误
// 分类: 客户端错误（可修正，无副作用）与服务端错误
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 客户端错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("会话状态无效: {0}")]
    InvalidSessionState(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("导入失败: {0}")]
    ImportFailed(String),

    #[error("数据约束违反: {0}")]
    ConstraintViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 调用方可修正的错误（对应 HTTP 4xx）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidInput(_) | ApiError::NotFound(_) | ApiError::InvalidSessionState(_)
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::ForeignKeyViolation(msg)
            | RepositoryError::CheckConstraintViolation(msg) => ApiError::ConstraintViolation(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段 {}: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::SessionNotFound(_) | ImportError::FileNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ImportError::InvalidSessionState { .. } => ApiError::InvalidSessionState(err.to_string()),
            ImportError::UnsupportedFormat(_)
            | ImportError::FileTooLarge { .. }
            | ImportError::EmptyWorkbook
            | ImportError::MappingNotInSession { .. }
            | ImportError::UnknownTargetField(_) => ApiError::InvalidInput(err.to_string()),
            ImportError::FileReadError(_)
            | ImportError::ExcelParseError(_)
            | ImportError::CsvParseError(_)
            | ImportError::StorageError(_) => ApiError::ImportFailed(err.to_string()),
            ImportError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            ImportError::LockError(msg) => ApiError::DatabaseError(msg),
            ImportError::Repository(inner) => ApiError::from(inner),
            ImportError::ConfigReadError { .. } | ImportError::ConfigValueError { .. } => {
                ApiError::InternalError(err.to_string())
            }
            ImportError::Other(inner) => ApiError::Other(inner),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
