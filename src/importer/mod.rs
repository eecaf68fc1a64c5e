// ==========================================
// 采购申请跟踪系统 - 导入层
// ==========================================
// 职责: 表格上传 → 列映射识别 → 预览 → 对账落库
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod date_normalizer;
pub mod error;
pub mod field_normalizer;
pub mod file_parser;
pub mod header_matcher;
pub mod import_log;
pub mod import_session_service;
pub mod importer_trait;
pub mod lookup_resolver;
pub mod numeric_normalizer;
pub mod row_mapper;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_normalizer::FieldNormalizer;
pub use file_parser::{CsvParser, ExcelParser, RawRow, SheetData, UniversalFileParser};
pub use header_matcher::{HeaderMatch, HeaderMatcher};
pub use import_session_service::ImportSessionService;
pub use lookup_resolver::{LookupResolver, LookupTable, LookupTables};
pub use row_mapper::RowMapper;

// 重导出 Trait 接口
pub use importer_trait::FileParser;
