// ==========================================
// 采购申请跟踪系统 - 领域类型定义
// ==========================================
// 职责: 单元格原始值 / 落库字段值 / 会话状态 / 行处理动作
// ==========================================

use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CellValue - 表格原始单元格值
// ==========================================
// 红线: 读取原始值而非显示格式化值（避免 No PR 被显示成时间）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// 文本值去首尾空白，数值原样保留
    pub fn trimmed(&self) -> CellValue {
        match self {
            CellValue::Text(s) => CellValue::Text(s.trim().to_string()),
            other => other.clone(),
        }
    }

    /// 空单元格或纯空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(v) => !v.is_finite(),
        }
    }

    /// 以文本形式读取（整数值不带小数位）
    ///
    /// # 返回
    /// - None: 空白
    /// - Some(String): 去空白后的文本
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(v) => {
                if !v.is_finite() {
                    None
                } else if v.fract() == 0.0 && v.abs() < 9_007_199_254_740_992.0 {
                    Some(format!("{:.0}", v))
                } else {
                    Some(v.to_string())
                }
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text().unwrap_or_default())
    }
}

// ==========================================
// FieldValue - 归一化后的落库字段值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
    Null,
}

impl FieldValue {
    /// 空白文本统一为 Null
    pub fn text_or_null(value: Option<String>) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() => FieldValue::Text(s.trim().to_string()),
            _ => FieldValue::Null,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            FieldValue::Decimal(v) => ToSqlOutput::Owned(Value::Real(*v)),
            FieldValue::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

// ==========================================
// SessionStatus - 导入会话状态
// ==========================================
// 状态机: pending → processing → completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Processing => "processing",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(SessionStatus::Pending),
            "processing" => Some(SessionStatus::Processing),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// ImportAction - 单行处理结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportAction {
    New,
    Update,
    Error,
    Skipped,
}

impl ImportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportAction::New => "NEW",
            ImportAction::Update => "UPDATE",
            ImportAction::Error => "ERROR",
            ImportAction::Skipped => "SKIPPED",
        }
    }
}

// ==========================================
// PreviewStatus - 预览行判定
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewStatus {
    Valid,
    Skip,
}
