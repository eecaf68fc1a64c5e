// ==========================================
// 采购申请跟踪系统 - 操作日志领域模型
// ==========================================
// 用途: 导入完成后写入一条汇总日志（event_type = imported）
// 对齐: activity_logs 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub procurement_item_id: Option<i64>,
    pub event_type: ActivityEventType,
    pub description: String,
    pub old_values: Option<JsonValue>,
    pub new_values: Option<JsonValue>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityEventType {
    Created,
    Edited,
    Deleted,
    Imported,
}

impl ActivityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityEventType::Created => "created",
            ActivityEventType::Edited => "edited",
            ActivityEventType::Deleted => "deleted",
            ActivityEventType::Imported => "imported",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(ActivityEventType::Created),
            "edited" => Some(ActivityEventType::Edited),
            "deleted" => Some(ActivityEventType::Deleted),
            "imported" => Some(ActivityEventType::Imported),
            _ => None,
        }
    }
}
