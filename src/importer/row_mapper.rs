// ==========================================
// 采购申请跟踪系统 - 行映射器
// ==========================================
// 职责: 原始行 + 表头 + 列映射 → 字段名 → 原始值
// 红线: 纯函数；只做取值与去空白，不做任何归一化
// ==========================================

use crate::domain::import_session::{ColumnMapping, MappedRow};
use crate::importer::file_parser::RawRow;
use std::collections::HashMap;

pub struct RowMapper<'a> {
    /// 列号 → 目标字段（只保留有目标字段的映射）
    fields_by_column: HashMap<usize, &'a str>,
}

impl<'a> RowMapper<'a> {
    pub fn new(mappings: &'a [ColumnMapping]) -> Self {
        let fields_by_column = mappings
            .iter()
            .filter_map(|m| m.database_field.as_deref().map(|f| (m.column_index, f)))
            .collect();
        Self { fields_by_column }
    }

    /// 映射一行
    ///
    /// 按表头顺序赋值，两列映射到同一字段时后者覆盖前者；空白表头跳过
    pub fn map_row(&self, headers: &[String], row: &RawRow) -> MappedRow {
        let mut data = MappedRow::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                continue;
            }
            if let Some(field) = self.fields_by_column.get(&idx) {
                data.insert(field.to_string(), row.cell(idx).trimmed());
            }
        }
        data
    }
}
