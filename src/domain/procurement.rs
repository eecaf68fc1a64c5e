// ==========================================
// 采购申请跟踪系统 - 采购明细领域模型
// ==========================================
// 职责: procurement_items 实体 + 可导入字段登记表
// 红线: 对账身份 = (no_pr, nama_barang)，no_pr 本身不唯一
// ==========================================

use crate::domain::custom_field::{is_custom_slot, CustomFieldConfig};
use crate::domain::types::FieldValue;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 必填字段（缺失则整行跳过）
pub const REQUIRED_FIELDS: &[&str] = &["no_pr"];

/// 收单日期字段（决定 execute 的处理顺序）
pub const RECEIPT_DATE_FIELD: &str = "tgl_terima_dokumen";

/// 物资/服务标记所在的自定义槽位
pub const CATEGORY_FIELD: &str = "custom_field_1";
pub const CATEGORY_GOODS: &str = "Barang";
pub const CATEGORY_SERVICES: &str = "Jasa";
/// 显式服务代码（大小写不敏感）
pub const CATEGORY_SERVICES_CODE: &str = "D";

// ==========================================
// LookupDomain - 外键解析域
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupDomain {
    Department,
    Buyer,
    Status,
}

/// 外键字典表中的一条记录（部门 / 采购员 / 状态）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub id: i64,
    pub name: String,
}

// ==========================================
// FieldKind - 字段归一化方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Quantity,
    Currency,
    Date,
    Lookup(LookupDomain),
    /// 紧急标记：保留原文，不转布尔
    Flag,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

/// 标准可导入字段（顺序即映射下拉框顺序）
pub const STANDARD_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "no_pr", label: "No PR", kind: FieldKind::Text },
    FieldSpec { name: "mat_code", label: "Mat Code", kind: FieldKind::Text },
    FieldSpec { name: "nama_barang", label: "Nama Barang", kind: FieldKind::Text },
    FieldSpec { name: "qty", label: "Qty", kind: FieldKind::Quantity },
    FieldSpec { name: "um", label: "UM", kind: FieldKind::Text },
    FieldSpec { name: "pg", label: "PG", kind: FieldKind::Text },
    FieldSpec { name: "user_requester", label: "User", kind: FieldKind::Text },
    FieldSpec { name: "nilai", label: "Nilai", kind: FieldKind::Currency },
    FieldSpec { name: "department_id", label: "Bagian", kind: FieldKind::Lookup(LookupDomain::Department) },
    FieldSpec { name: "tgl_terima_dokumen", label: "Tanggal Terima Dokumen", kind: FieldKind::Date },
    FieldSpec { name: "procx_manual", label: "PROCX/MANUAL", kind: FieldKind::Text },
    FieldSpec { name: "buyer_id", label: "Buyer", kind: FieldKind::Lookup(LookupDomain::Buyer) },
    FieldSpec { name: "status_id", label: "Status", kind: FieldKind::Lookup(LookupDomain::Status) },
    FieldSpec { name: "tgl_status", label: "Tanggal Status", kind: FieldKind::Date },
    FieldSpec { name: "is_emergency", label: "EMERGENCY", kind: FieldKind::Flag },
    FieldSpec { name: "no_po", label: "NO PO", kind: FieldKind::Text },
    FieldSpec { name: "nama_vendor", label: "Nama Vendor", kind: FieldKind::Text },
    FieldSpec { name: "tgl_po", label: "Tanggal PO", kind: FieldKind::Date },
    FieldSpec { name: "tgl_datang", label: "Tanggal Datang", kind: FieldKind::Date },
    FieldSpec { name: "keterangan", label: "Keterangan", kind: FieldKind::Text },
    FieldSpec { name: "item_category", label: "Item Category", kind: FieldKind::Text },
];

/// 查找标准字段定义
pub fn standard_field(name: &str) -> Option<&'static FieldSpec> {
    STANDARD_FIELDS.iter().find(|f| f.name == name)
}

/// 字段归一化方式（自定义槽位一律按文本处理）
pub fn field_kind(name: &str) -> FieldKind {
    standard_field(name).map(|f| f.kind).unwrap_or(FieldKind::Text)
}

/// 可写入 procurement_items 的列（标准字段 + 自定义槽位）
///
/// 字段名会直接拼进 SQL，所有写入路径必须先过这里
pub fn is_writable_column(name: &str) -> bool {
    standard_field(name).is_some() || is_custom_slot(name)
}

/// 归一化后的一行: 列名 → 落库值
pub type ItemFields = BTreeMap<String, FieldValue>;

// ==========================================
// AvailableField - 映射目标字段（供人工改映射）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableField {
    pub value: String,
    pub label: String,
    pub required: bool,
}

/// 标准字段 + 当前启用的自定义字段
pub fn available_fields(active_custom: &[CustomFieldConfig]) -> Vec<AvailableField> {
    let mut fields: Vec<AvailableField> = STANDARD_FIELDS
        .iter()
        .map(|f| AvailableField {
            value: f.name.to_string(),
            label: f.label.to_string(),
            required: REQUIRED_FIELDS.contains(&f.name),
        })
        .collect();

    for config in active_custom.iter().filter(|c| c.is_active) {
        fields.push(AvailableField {
            value: config.slot_name.clone(),
            label: config.display_label(),
            required: false,
        });
    }

    fields
}

// ==========================================
// ProcurementItem - 采购明细
// ==========================================
// 对齐: procurement_items 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementItem {
    pub id: i64,
    pub no_pr: String,
    pub mat_code: Option<String>,
    pub nama_barang: Option<String>,
    pub item_category: Option<String>,
    pub qty: i64,
    pub um: Option<String>,
    pub pg: Option<String>,
    pub user_requester: Option<String>,
    pub nilai: f64,
    pub department_id: Option<i64>,
    pub tgl_terima_dokumen: Option<String>,
    pub procx_manual: Option<String>,
    pub buyer_id: Option<i64>,
    pub status_id: Option<i64>,
    pub tgl_status: Option<String>,
    pub is_emergency: Option<String>,
    pub no_po: Option<String>,
    pub nama_vendor: Option<String>,
    pub tgl_po: Option<String>,
    pub tgl_datang: Option<String>,
    pub keterangan: Option<String>,
    pub custom_fields: Vec<Option<String>>, // custom_field_1..N
    pub version: i64,                       // 同一 no_pr 下的序号（首条为 1）
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProcurementItem {
    /// 读取自定义槽位（slot 从 1 开始）
    pub fn custom_field(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|idx| self.custom_fields.get(idx))
            .and_then(|v| v.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_fields_marks_required_and_appends_active_custom() {
        let custom = vec![
            CustomFieldConfig::new("custom_field_1", Some("B/J"), true, false),
            CustomFieldConfig::new("custom_field_2", None, false, false),
        ];

        let fields = available_fields(&custom);

        assert_eq!(fields.len(), STANDARD_FIELDS.len() + 1);
        assert!(fields.iter().find(|f| f.value == "no_pr").unwrap().required);
        assert!(!fields.iter().find(|f| f.value == "qty").unwrap().required);
        assert_eq!(fields.last().unwrap().label, "B/J");
    }

    #[test]
    fn test_writable_columns_reject_unknown_names() {
        assert!(is_writable_column("nama_vendor"));
        assert!(is_writable_column("custom_field_5"));
        assert!(!is_writable_column("version"));
        assert!(!is_writable_column("no_pr; DROP TABLE procurement_items"));
    }

    #[test]
    fn test_field_kind_defaults_to_text_for_custom_slots() {
        assert_eq!(field_kind("qty"), FieldKind::Quantity);
        assert_eq!(field_kind("buyer_id"), FieldKind::Lookup(LookupDomain::Buyer));
        assert_eq!(field_kind("custom_field_3"), FieldKind::Text);
    }
}
