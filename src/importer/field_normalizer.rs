// ==========================================
// 采购申请跟踪系统 - 字段归一化器
// ==========================================
// 职责: 映射后的原始值 → 落库值
// - 数量 / 金额: 数值归一化器
// - 日期字段: 日期归一化器
// - 部门 / 采购员 / 状态: 外键解析器
// - custom_field_1: 物资(Barang) / 服务(Jasa) 标记推导
// - 其余文本: 去空白，空白为 NULL
// ==========================================

use crate::domain::import_session::MappedRow;
use crate::domain::procurement::{
    field_kind, is_writable_column, FieldKind, ItemFields, CATEGORY_FIELD, CATEGORY_GOODS,
    CATEGORY_SERVICES, CATEGORY_SERVICES_CODE,
};
use crate::domain::types::{CellValue, FieldValue};
use crate::importer::date_normalizer::normalize_date;
use crate::importer::lookup_resolver::LookupResolver;
use crate::importer::numeric_normalizer::{normalize_currency, normalize_quantity};

pub struct FieldNormalizer<'a> {
    resolver: &'a LookupResolver,
}

impl<'a> FieldNormalizer<'a> {
    pub fn new(resolver: &'a LookupResolver) -> Self {
        Self { resolver }
    }

    /// 归一化一行（只包含已映射的字段 + 物资/服务标记）
    pub fn normalize(&self, row: &MappedRow) -> ItemFields {
        let mut fields = ItemFields::new();

        for (name, cell) in row {
            if !is_writable_column(name) {
                continue;
            }
            fields.insert(name.clone(), self.normalize_field(name, cell));
        }

        fields.insert(CATEGORY_FIELD.to_string(), FieldValue::Text(category_flag(row)));
        fields
    }

    fn normalize_field(&self, name: &str, cell: &CellValue) -> FieldValue {
        match field_kind(name) {
            FieldKind::Quantity => FieldValue::Integer(normalize_quantity(cell)),
            FieldKind::Currency => FieldValue::Decimal(normalize_currency(cell)),
            FieldKind::Date => FieldValue::text_or_null(normalize_date(cell)),
            FieldKind::Lookup(domain) => match self.resolver.resolve(domain, cell) {
                Some(id) => FieldValue::Integer(id),
                None => FieldValue::Null,
            },
            FieldKind::Text | FieldKind::Flag => FieldValue::text_or_null(cell.as_text()),
        }
    }
}

/// 新增记录时未映射的数值列补 0
pub fn apply_insert_defaults(fields: &mut ItemFields) {
    fields
        .entry("qty".to_string())
        .or_insert(FieldValue::Integer(0));
    fields
        .entry("nilai".to_string())
        .or_insert(FieldValue::Decimal(0.0));
}

/// 物资/服务标记
///
/// 显式 "D" → Jasa；空白或未映射 → 有物料编码为 Barang，否则 Jasa；其他显式值原样保留
pub fn category_flag(row: &MappedRow) -> String {
    let explicit = row.get(CATEGORY_FIELD).and_then(CellValue::as_text);
    match explicit {
        Some(value) if value.eq_ignore_ascii_case(CATEGORY_SERVICES_CODE) => {
            CATEGORY_SERVICES.to_string()
        }
        Some(value) => value,
        None => {
            let has_mat_code = row
                .get("mat_code")
                .map(|cell| !cell.is_blank())
                .unwrap_or(false);
            if has_mat_code {
                CATEGORY_GOODS.to_string()
            } else {
                CATEGORY_SERVICES.to_string()
            }
        }
    }
}
