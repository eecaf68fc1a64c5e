// ==========================================
// 采购申请跟踪系统 - 导入 API
// ==========================================
// 职责: 封装导入会话编排器，统一入参校验与错误转换
// 说明: 上层（HTTP / CLI）只依赖本门面，不直接接触 importer
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::domain::custom_field::CustomFieldConfig;
use crate::domain::import_session::{
    ColumnMapping, ExecuteReport, MappingUpdate, PreviewReport, SessionDetail, UploadSummary,
};
use crate::importer::ImportSessionService;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// 导入API
pub struct ImportApi {
    service: ImportSessionService<ConfigManager>,
}

impl ImportApi {
    /// 打开（必要时初始化）数据库并创建 ImportApi
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - storage_dir: 上传文件与导入日志的存储根目录
    pub fn open(db_path: &str, storage_dir: impl Into<PathBuf>) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseError(format!("数据库打开失败 {}: {}", db_path, e)))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        // schema 版本高于当前程序时拒绝打开
        let version = read_schema_version(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        if let Some(found) = version.filter(|v| *v > CURRENT_SCHEMA_VERSION) {
            return Err(ApiError::DatabaseError(format!(
                "数据库 schema 版本 {} 高于程序支持的版本 {}",
                found, CURRENT_SCHEMA_VERSION
            )));
        }

        Self::from_connection(Arc::new(Mutex::new(conn)), storage_dir)
    }

    /// 基于已有连接创建 ImportApi（与其他模块共享连接）
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        storage_dir: impl Into<PathBuf>,
    ) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())?;
        Ok(Self {
            service: ImportSessionService::new(conn, config, storage_dir),
        })
    }

    /// 上传表格内容
    ///
    /// # 参数
    /// - original_filename: 客户端文件名（决定解析格式）
    /// - bytes: 文件内容
    /// - actor: 操作人 id
    pub fn upload(
        &self,
        original_filename: &str,
        bytes: &[u8],
        actor: Option<i64>,
    ) -> ApiResult<UploadSummary> {
        if original_filename.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件名不能为空".to_string()));
        }
        if bytes.is_empty() {
            return Err(ApiError::InvalidInput("上传文件为空".to_string()));
        }

        self.service
            .upload(original_filename, bytes, actor)
            .map_err(|e| {
                error!(file = original_filename, error = %e, "上传失败");
                ApiError::from(e)
            })
    }

    /// 从本地路径上传
    pub fn upload_file(&self, path: &Path, actor: Option<i64>) -> ApiResult<UploadSummary> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::InvalidInput(format!("无效的文件路径: {}", path.display())))?;
        let bytes = fs::read(path)
            .map_err(|e| ApiError::NotFound(format!("{}: {}", path.display(), e)))?;

        self.upload(name, &bytes, actor)
    }

    /// 查询会话详情
    pub fn get_session(&self, session_id: i64) -> ApiResult<SessionDetail> {
        validate_session_id(session_id)?;
        Ok(self.service.get_session(session_id)?)
    }

    /// 修改列映射
    pub fn update_mappings(
        &self,
        session_id: i64,
        updates: &[MappingUpdate],
    ) -> ApiResult<Vec<ColumnMapping>> {
        validate_session_id(session_id)?;
        if updates.is_empty() {
            return Err(ApiError::InvalidInput("映射列表不能为空".to_string()));
        }
        Ok(self.service.update_mappings(session_id, updates)?)
    }

    /// 配置自定义字段槽位
    pub fn configure_custom_field(&self, config: &CustomFieldConfig) -> ApiResult<()> {
        Ok(self.service.configure_custom_field(config)?)
    }

    /// 预览
    pub fn preview(&self, session_id: i64) -> ApiResult<PreviewReport> {
        validate_session_id(session_id)?;
        Ok(self.service.preview(session_id)?)
    }

    /// 执行导入
    pub fn execute(&self, session_id: i64, actor: Option<i64>) -> ApiResult<ExecuteReport> {
        validate_session_id(session_id)?;
        let report = self.service.execute(session_id, actor).map_err(|e| {
            error!(session_id, error = %e, "执行导入失败");
            ApiError::from(e)
        })?;
        info!(
            session_id,
            processed = report.processed_rows(),
            "执行导入成功"
        );
        Ok(report)
    }
}

fn validate_session_id(session_id: i64) -> ApiResult<()> {
    if session_id <= 0 {
        return Err(ApiError::InvalidInput(format!(
            "无效的会话 id: {}",
            session_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id(1).is_ok());
        assert!(matches!(validate_session_id(0), Err(ApiError::InvalidInput(_))));
        assert!(matches!(validate_session_id(-5), Err(ApiError::InvalidInput(_))));
    }
}
