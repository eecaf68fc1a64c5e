// ==========================================
// 采购申请跟踪系统 - 导入会话领域模型
// ==========================================
// 职责: 导入会话 / 列映射 / 预览结果 / 执行结果
// 生命周期: upload 创建 → (改映射) → preview → execute
// ==========================================

use crate::domain::procurement::AvailableField;
use crate::domain::types::{CellValue, ImportAction, PreviewStatus, SessionStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 行映射结果: 字段名 → 去空白后的原始值
pub type MappedRow = BTreeMap<String, CellValue>;

// ==========================================
// ImportSession - 一次表格上传
// ==========================================
// 对齐: import_sessions 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    pub id: i64,
    pub original_filename: String,
    pub stored_filename: String, // {uuid}_{原文件名}
    pub file_size: i64,
    pub total_rows: i64,         // 数据行数（不含表头）
    pub status: SessionStatus,
    pub processed_rows: i64,
    pub success_rows: i64,       // 新增 + 更新
    pub error_rows: i64,
    pub created_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 新建会话参数
#[derive(Debug, Clone)]
pub struct NewImportSession {
    pub original_filename: String,
    pub stored_filename: String,
    pub file_size: i64,
    pub total_rows: i64,
    pub created_by: Option<i64>,
}

// ==========================================
// ColumnMapping - 列映射
// ==========================================
// 对齐: import_mappings 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub id: i64,
    pub import_session_id: i64,
    pub column_index: usize,            // 表头所在列（从 0 开始）
    pub excel_column: String,           // 表头原文
    pub database_field: Option<String>, // None = 忽略该列
    pub sample_data: Option<String>,
    pub confidence_score: i32,          // 0..=100，仅供参考
}

/// 新建映射参数（upload 阶段由表头匹配器生成）
#[derive(Debug, Clone)]
pub struct NewColumnMapping {
    pub column_index: usize,
    pub excel_column: String,
    pub database_field: Option<String>,
    pub sample_data: Option<String>,
    pub confidence_score: i32,
}

/// 人工改映射
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingUpdate {
    pub id: i64,
    pub database_field: Option<String>,
}

// ==========================================
// 接口返回结构
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub session_id: i64,
    pub total_rows: i64,
    pub columns_detected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: ImportSession,
    pub mappings: Vec<ColumnMapping>,
    pub available_fields: Vec<AvailableField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRow {
    pub row_number: usize,
    pub data: MappedRow,
    pub status: PreviewStatus,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub total_rows: i64,
    pub preview_count: usize,
    pub estimated_valid: usize,
    pub estimated_skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewReport {
    pub rows: Vec<PreviewRow>,
    pub summary: PreviewSummary,
    pub mappings: Vec<ColumnMapping>,
}

// ==========================================
// ImportOutcome - 单行处理记录
// ==========================================
// 不单独落表，随执行结果返回并写入日志文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub row: usize,
    pub action: ImportAction,
    pub no_pr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nama_barang: Option<String>, // 截断至 30 字符
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// 错误样例最多返回条数
pub const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteReport {
    pub success_count: usize, // 新增
    pub updated_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<String>,  // 前 10 条
    pub log: Vec<ImportOutcome>,
}

impl ExecuteReport {
    pub fn processed_rows(&self) -> usize {
        self.success_count + self.updated_count + self.error_count + self.skipped_count
    }

    pub fn record(&mut self, outcome: ImportOutcome) {
        match outcome.action {
            ImportAction::New => self.success_count += 1,
            ImportAction::Update => self.updated_count += 1,
            ImportAction::Skipped => self.skipped_count += 1,
            ImportAction::Error => {
                self.error_count += 1;
                if self.errors.len() < MAX_REPORTED_ERRORS {
                    let message = outcome.reason.clone().unwrap_or_default();
                    self.errors.push(format!("Row {}: {}", outcome.row, message));
                }
            }
        }
        self.log.push(outcome);
    }
}
