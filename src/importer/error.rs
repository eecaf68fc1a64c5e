// ==========================================
// 采购申请跟踪系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 客户端错误（状态/参数）与服务端错误（解析/数据库/存储）
// ==========================================

use crate::domain::types::SessionStatus;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件过大: {size} 字节（上限 {limit} 字节）")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作表为空或缺少表头行")]
    EmptyWorkbook,

    #[error("文件保存失败: {0}")]
    StorageError(String),

    // ===== 会话状态错误 =====
    #[error("导入会话不存在: {0}")]
    SessionNotFound(i64),

    #[error("导入会话 {session_id} 当前状态为 {status}，{operation} 仅允许 pending 会话")]
    InvalidSessionState {
        session_id: i64,
        status: SessionStatus,
        operation: &'static str,
    },

    // ===== 映射错误 =====
    #[error("映射 {mapping_id} 不属于导入会话 {session_id}")]
    MappingNotInSession { mapping_id: i64, session_id: i64 },

    #[error("未知的目标字段: {0}")]
    UnknownTargetField(String),

    // ===== 数据库错误 =====
    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 调用方可修正的错误（不改变任何持久状态）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileTooLarge { .. }
                | ImportError::EmptyWorkbook
                | ImportError::SessionNotFound(_)
                | ImportError::InvalidSessionState { .. }
                | ImportError::MappingNotInSession { .. }
                | ImportError::UnknownTargetField(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>（统一走仓储层的约束分类）
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_violation_is_client_error() {
        let err = ImportError::InvalidSessionState {
            session_id: 7,
            status: SessionStatus::Completed,
            operation: "execute",
        };
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "Import session 7 is completed; execute requires a pending session"
        );
    }

    #[test]
    fn test_database_error_is_not_client_error() {
        let err = ImportError::from(rusqlite::Error::InvalidQuery);
        assert!(!err.is_client_error());
        assert!(matches!(err, ImportError::Repository(RepositoryError::DatabaseQueryError(_))));
    }
}
