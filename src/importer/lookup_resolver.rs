// ==========================================
// 采购申请跟踪系统 - 外键解析器
// ==========================================
// 职责: 部门 / 采购员 / 状态 的自由文本 → id
// 顺序: 数字 id → 精确名称 → 忽略大小写
//       → (状态) 历史状态名映射 / (采购员) 昵称归一化 后再匹配一次
// 红线: 解析不到返回 None，不报错；字典表由调用方注入，不做全局缓存
// ==========================================

use crate::config::import_config_trait::BuyerAlias;
use crate::domain::procurement::{LookupDomain, LookupEntry};
use crate::domain::types::CellValue;
use crate::importer::numeric_normalizer::plain_number;
use std::collections::HashMap;

// ==========================================
// LookupTable - 单个字典表快照
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
}

impl LookupTable {
    pub fn new(entries: Vec<LookupEntry>) -> Self {
        Self { entries }
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// 精确匹配，其次忽略大小写
    pub fn find_by_name(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .or_else(|| {
                let lower = name.to_lowercase();
                self.entries.iter().find(|e| e.name.to_lowercase() == lower)
            })
            .map(|e| e.id)
    }
}

/// 三张字典表（每次 execute 加载一次）
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    pub departments: LookupTable,
    pub buyers: LookupTable,
    pub statuses: LookupTable,
}

impl LookupTables {
    pub fn table(&self, domain: LookupDomain) -> &LookupTable {
        match domain {
            LookupDomain::Department => &self.departments,
            LookupDomain::Buyer => &self.buyers,
            LookupDomain::Status => &self.statuses,
        }
    }
}

// ==========================================
// LookupResolver
// ==========================================
pub struct LookupResolver {
    tables: LookupTables,
    legacy_status_mapping: HashMap<String, String>,
    buyer_aliases: Vec<BuyerAlias>,
}

impl LookupResolver {
    pub fn new(
        tables: LookupTables,
        legacy_status_mapping: HashMap<String, String>,
        buyer_aliases: Vec<BuyerAlias>,
    ) -> Self {
        Self {
            tables,
            legacy_status_mapping,
            buyer_aliases,
        }
    }

    /// 解析一个外键单元格
    pub fn resolve(&self, domain: LookupDomain, cell: &CellValue) -> Option<i64> {
        let table = self.tables.table(domain);

        let text = match cell {
            CellValue::Empty => return None,
            CellValue::Number(v) => return self.resolve_numeric(domain, *v),
            CellValue::Text(s) => s.trim(),
        };
        if text.is_empty() {
            return None;
        }
        if let Some(v) = plain_number(text) {
            return self.resolve_numeric(domain, v);
        }

        if let Some(id) = table.find_by_name(text) {
            return Some(id);
        }

        match domain {
            LookupDomain::Department => None,
            LookupDomain::Status => self
                .translate_legacy_status(text)
                .and_then(|current| table.find_by_name(current)),
            LookupDomain::Buyer => table.find_by_name(&self.normalize_buyer_name(text)),
        }
    }

    /// 数字视为 id；采购员 id 必须存在于字典表
    fn resolve_numeric(&self, domain: LookupDomain, value: f64) -> Option<i64> {
        if !value.is_finite() {
            return None;
        }
        let id = value.trunc() as i64;
        match domain {
            LookupDomain::Buyer if !self.tables.buyers.contains_id(id) => None,
            _ => Some(id),
        }
    }

    /// 历史状态名 → 当前状态名（精确，其次忽略大小写）
    fn translate_legacy_status(&self, name: &str) -> Option<&str> {
        if let Some(current) = self.legacy_status_mapping.get(name) {
            return Some(current.as_str());
        }
        let lower = name.to_lowercase();
        self.legacy_status_mapping
            .iter()
            .find(|(legacy, _)| legacy.to_lowercase() == lower)
            .map(|(_, current)| current.as_str())
    }

    /// 采购员昵称归一化: 小写后包含某个昵称片段即替换为其全名（按配置顺序）
    pub fn normalize_buyer_name(&self, name: &str) -> String {
        let name = name.trim();
        let lower = name.to_lowercase();
        self.buyer_aliases
            .iter()
            .find(|alias| !alias.token.is_empty() && lower.contains(&alias.token.to_lowercase()))
            .map(|alias| alias.full_name.clone())
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_manager::{default_buyer_aliases, default_legacy_status_mapping};

    fn entries(pairs: &[(i64, &str)]) -> LookupTable {
        LookupTable::new(
            pairs
                .iter()
                .map(|(id, name)| LookupEntry {
                    id: *id,
                    name: name.to_string(),
                })
                .collect(),
        )
    }

    fn resolver() -> LookupResolver {
        LookupResolver::new(
            LookupTables {
                departments: entries(&[(1, "IT"), (2, "Finance")]),
                buyers: entries(&[(10, "Ato Heryanto"), (11, "Dian Sholihat")]),
                statuses: entries(&[(20, "Negosiasi"), (21, "PO/SPK"), (22, "RFQ")]),
            },
            default_legacy_status_mapping(),
            default_buyer_aliases(),
        )
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_department_by_name() {
        let r = resolver();
        assert_eq!(r.resolve(LookupDomain::Department, &text("IT")), Some(1));
        assert_eq!(r.resolve(LookupDomain::Department, &text("finance")), Some(2));
        assert_eq!(r.resolve(LookupDomain::Department, &text("Unknown Dept")), None);
        assert_eq!(r.resolve(LookupDomain::Department, &text(" ")), None);
    }

    #[test]
    fn test_numeric_id_is_used_directly() {
        let r = resolver();
        assert_eq!(r.resolve(LookupDomain::Department, &CellValue::Number(2.0)), Some(2));
        assert_eq!(r.resolve(LookupDomain::Status, &text("21")), Some(21));
    }

    #[test]
    fn test_numeric_buyer_must_exist() {
        let r = resolver();
        assert_eq!(r.resolve(LookupDomain::Buyer, &text("10")), Some(10));
        assert_eq!(r.resolve(LookupDomain::Buyer, &text("99")), None);
    }

    #[test]
    fn test_buyer_nickname_normalization() {
        let r = resolver();
        assert_eq!(r.resolve(LookupDomain::Buyer, &text("Pak Ato")), Some(10));
        assert_eq!(r.resolve(LookupDomain::Buyer, &text("DIAN")), Some(11));
        assert_eq!(r.normalize_buyer_name("  Someone Else "), "Someone Else");
    }

    #[test]
    fn test_legacy_status_alias() {
        let r = resolver();
        assert_eq!(r.resolve(LookupDomain::Status, &text("Auction")), Some(20));
        assert_eq!(r.resolve(LookupDomain::Status, &text("ttd po")), Some(21));
        assert_eq!(r.resolve(LookupDomain::Status, &text("Rebid")), Some(22));
        assert_eq!(r.resolve(LookupDomain::Status, &text("Selesai")), None);
    }
}
