// ==========================================
// 采购申请跟踪系统 - 自定义字段登记表
// ==========================================
// 职责: 固定数量的通用槽位（custom_field_1..N），含义由配置决定
// 用途: 表头匹配 / 可映射字段 / 落库白名单 / 搜索字段白名单
// ==========================================

use serde::{Deserialize, Serialize};

/// 登记表容量（槽位数量）
pub const CUSTOM_FIELD_SLOTS: usize = 5;

/// 槽位名: custom_field_{n}，n 从 1 开始
pub fn slot_name(slot: usize) -> String {
    format!("custom_field_{}", slot)
}

/// 全部槽位名
pub fn all_slot_names() -> Vec<String> {
    (1..=CUSTOM_FIELD_SLOTS).map(slot_name).collect()
}

pub fn is_custom_slot(name: &str) -> bool {
    name.strip_prefix("custom_field_")
        .and_then(|n| n.parse::<usize>().ok())
        .map(|n| (1..=CUSTOM_FIELD_SLOTS).contains(&n))
        .unwrap_or(false)
}

// ==========================================
// CustomFieldConfig - 单个槽位配置
// ==========================================
// 对齐: custom_field_config 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldConfig {
    pub slot_name: String,
    pub label: Option<String>,
    pub is_active: bool,
    pub is_searchable: bool,
}

impl CustomFieldConfig {
    pub fn new(slot_name: &str, label: Option<&str>, is_active: bool, is_searchable: bool) -> Self {
        Self {
            slot_name: slot_name.to_string(),
            label: label.map(|s| s.to_string()),
            is_active,
            is_searchable,
        }
    }

    /// 显示名：未配置时由槽位名生成（custom_field_1 → "Custom field 1"）
    pub fn display_label(&self) -> String {
        match self.label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => {
                let spaced = self.slot_name.replace('_', " ");
                let mut chars = spaced.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        }
    }
}

// ==========================================
// CustomFieldRegistry - 登记表快照
// ==========================================
// 每次调用按需加载，不做全局缓存
#[derive(Debug, Clone, Default)]
pub struct CustomFieldRegistry {
    fields: Vec<CustomFieldConfig>,
}

impl CustomFieldRegistry {
    pub fn new(fields: Vec<CustomFieldConfig>) -> Self {
        Self { fields }
    }

    pub fn active(&self) -> Vec<CustomFieldConfig> {
        self.fields.iter().filter(|f| f.is_active).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_fallback() {
        let config = CustomFieldConfig::new("custom_field_2", None, true, false);
        assert_eq!(config.display_label(), "Custom field 2");

        let config = CustomFieldConfig::new("custom_field_1", Some("  B/J "), true, false);
        assert_eq!(config.display_label(), "B/J");
    }

    #[test]
    fn test_slot_names_follow_registry_size() {
        assert_eq!(all_slot_names().len(), CUSTOM_FIELD_SLOTS);
        assert!(is_custom_slot("custom_field_5"));
        assert!(!is_custom_slot("custom_field_6"));
        assert!(!is_custom_slot("custom_field_x"));
    }

    #[test]
    fn test_registry_active_skips_inactive_slots() {
        let registry = CustomFieldRegistry::new(vec![
            CustomFieldConfig::new("custom_field_1", Some("B/J"), true, true),
            CustomFieldConfig::new("custom_field_2", Some("Lokasi"), false, true),
        ]);
        let active: Vec<String> = registry.active().into_iter().map(|f| f.slot_name).collect();
        assert_eq!(active, vec!["custom_field_1".to_string()]);
    }
}
