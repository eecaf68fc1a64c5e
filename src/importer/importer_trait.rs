// ==========================================
// 采购申请跟踪系统 - 导入模块 Trait 定义
// ==========================================
// 职责: 定义导入流程中可替换的接口（不包含实现）
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::file_parser::SheetData;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: ExcelParser, CsvParser
pub trait FileParser: Send + Sync {
    /// 解析首个工作表为表头 + 原始数据行
    ///
    /// # 参数
    /// - file_path: 文件路径
    ///
    /// # 返回
    /// - Ok(SheetData): 表头与数据行（单元格为原始值，非显示格式化值）
    /// - Err: 文件读取错误、格式错误、空表
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<SheetData>;
}
