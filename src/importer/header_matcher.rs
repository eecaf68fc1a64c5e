// ==========================================
// 采购申请跟踪系统 - 表头匹配器
// ==========================================
// 职责: 表头文本 → 标准字段 + 置信度
// 优先级: 标准表精确 → 标准表忽略大小写 → 标准表包含
//         → 启用的自定义字段 → 别名表
// 说明: 置信度只供人工复核参考，不影响匹配结果
// ==========================================

use crate::domain::custom_field::CustomFieldConfig;

/// 模板表头 → 字段（字段为 None 的列永不匹配）
pub const HEADER_TABLE: &[(&str, Option<&str>)] = &[
    ("No PR", Some("no_pr")),
    ("B/J", None),
    ("Acc", None),
    ("Mat Code", Some("mat_code")),
    ("Nama Barang", Some("nama_barang")),
    ("Qty", Some("qty")),
    ("UM", Some("um")),
    ("PG", Some("pg")),
    ("Item Category", Some("item_category")),
    ("User", Some("user_requester")),
    ("Nilai", Some("nilai")),
    ("Bagian", Some("department_id")),
    ("Tanggal Terima Dokumen", Some("tgl_terima_dokumen")),
    ("PROCX/MANUAL", Some("procx_manual")),
    ("Buyer", Some("buyer_id")),
    ("Status", Some("status_id")),
    ("Tanggal Status", Some("tgl_status")),
    ("EMERGENCY", Some("is_emergency")),
    ("NO PO", Some("no_po")),
    ("Nama Vendor", Some("nama_vendor")),
    ("Tanggal PO", Some("tgl_po")),
    ("Tanggal Datang", Some("tgl_datang")),
    ("Keterangan", Some("keterangan")),
];

/// 历史模板 / 常见笔误（不出现在下载模板中）
pub const ALIAS_TABLE: &[(&str, &str)] = &[
    ("Item Categori", "item_category"),
    ("Kategori Item", "item_category"),
    ("Kategori Barang", "item_category"),
    ("Jenis Barang", "item_category"),
];

/// 匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMatch {
    pub field: Option<String>,
    pub confidence: i32,
}

fn contains_either_way(header_lower: &str, label_lower: &str) -> bool {
    header_lower.contains(label_lower) || label_lower.contains(header_lower)
}

/// 标准表/别名表的置信度: 相等 100，表头包含标签 80，其余 60
fn table_confidence(header_lower: &str, label: &str) -> i32 {
    let label_lower = label.to_lowercase();
    if label_lower == header_lower {
        100
    } else if header_lower.contains(&label_lower) {
        80
    } else {
        60
    }
}

// ==========================================
// HeaderMatcher
// ==========================================
pub struct HeaderMatcher {
    /// 仅启用的自定义字段（按登记表顺序）
    custom_fields: Vec<CustomFieldConfig>,
}

impl HeaderMatcher {
    pub fn new(active_custom_fields: Vec<CustomFieldConfig>) -> Self {
        Self {
            custom_fields: active_custom_fields
                .into_iter()
                .filter(|c| c.is_active)
                .collect(),
        }
    }

    /// 识别 + 打分
    pub fn match_header(&self, header: &str) -> HeaderMatch {
        match self.detect_field(header) {
            Some(field) => {
                let confidence = self.confidence(header, &field);
                HeaderMatch {
                    field: Some(field),
                    confidence,
                }
            }
            None => HeaderMatch {
                field: None,
                confidence: 0,
            },
        }
    }

    /// 表头 → 字段（首个命中生效）
    pub fn detect_field(&self, header: &str) -> Option<String> {
        let header = header.trim();
        if header.is_empty() {
            return None;
        }
        let header_lower = header.to_lowercase();

        // 1. 精确匹配
        if let Some(field) = HEADER_TABLE
            .iter()
            .find(|(label, _)| *label == header)
            .and_then(|(_, field)| *field)
        {
            return Some(field.to_string());
        }

        // 2. 忽略大小写
        let mappable = || HEADER_TABLE.iter().filter_map(|(label, field)| field.map(|f| (*label, f)));
        if let Some((_, field)) = mappable().find(|(label, _)| label.to_lowercase() == header_lower) {
            return Some(field.to_string());
        }

        // 3. 双向包含（按表顺序）
        if let Some((_, field)) =
            mappable().find(|(label, _)| contains_either_way(&header_lower, &label.to_lowercase()))
        {
            return Some(field.to_string());
        }

        // 4. 启用的自定义字段: 标签相等，其次双向包含
        for config in &self.custom_fields {
            let label_lower = config.display_label().to_lowercase();
            if label_lower == header_lower || contains_either_way(&header_lower, &label_lower) {
                return Some(config.slot_name.clone());
            }
        }

        // 5. 别名表: 精确 → 忽略大小写 → 双向包含
        ALIAS_TABLE
            .iter()
            .find(|(label, _)| *label == header)
            .or_else(|| ALIAS_TABLE.iter().find(|(label, _)| label.to_lowercase() == header_lower))
            .or_else(|| {
                ALIAS_TABLE
                    .iter()
                    .find(|(label, _)| contains_either_way(&header_lower, &label.to_lowercase()))
            })
            .map(|(_, field)| field.to_string())
    }

    /// 置信度（0..=100）
    ///
    /// 依次取: 标准表中该字段的首个条目 → 别名表首个条目 → 自定义字段 → 50
    pub fn confidence(&self, header: &str, field: &str) -> i32 {
        let header_lower = header.trim().to_lowercase();

        if let Some((label, _)) = HEADER_TABLE.iter().find(|(_, f)| *f == Some(field)) {
            return table_confidence(&header_lower, label);
        }

        if let Some((label, _)) = ALIAS_TABLE.iter().find(|(_, f)| *f == field) {
            return table_confidence(&header_lower, label);
        }

        if let Some(config) = self.custom_fields.iter().find(|c| c.slot_name == field) {
            let label_lower = config.display_label().to_lowercase();
            return if label_lower == header_lower {
                100
            } else if contains_either_way(&header_lower, &label_lower) {
                80
            } else {
                60
            };
        }

        50
    }
}
