// ==========================================
// 采购申请跟踪系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 红线: 只读首个工作表；读取原始值，不做显示格式化
// ==========================================

use crate::domain::types::CellValue;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// 支持的扩展名（小写）
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// 一行原始数据
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 数据行序号（表头之后第一行为 1，空白行也占号）
    pub row_number: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    /// 取指定列（越界视为空单元格）
    pub fn cell(&self, column_index: usize) -> CellValue {
        self.cells.get(column_index).cloned().unwrap_or_default()
    }
}

/// 首个工作表的解析结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetData {
    /// 表头（已去首尾空白，空白表头保留为空串以维持列号）
    pub headers: Vec<String>,
    /// 数据行（完全空白的行也保留，由必填校验跳过）
    pub rows: Vec<RawRow>,
}

impl SheetData {
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    fn from_grid(mut grid: impl Iterator<Item = Vec<CellValue>>) -> ImportResult<Self> {
        let headers: Vec<String> = grid
            .next()
            .ok_or(ImportError::EmptyWorkbook)?
            .iter()
            .map(|cell| cell.as_text().unwrap_or_default())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::EmptyWorkbook);
        }

        let rows = grid
            .enumerate()
            .map(|(idx, cells)| RawRow {
                row_number: idx + 1,
                cells,
            })
            .collect();

        Ok(Self { headers, rows })
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// calamine 单元格 → 原始值
///
/// 日期单元格保留序列号（由日期归一化器统一解释）
fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<SheetData> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = extension_of(path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut grid = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let cells: Vec<CellValue> = record
                .iter()
                .enumerate()
                .map(|(col, value)| {
                    // 去掉 UTF-8 BOM
                    let value = if idx == 0 && col == 0 {
                        value.trim_start_matches('\u{feff}')
                    } else {
                        value
                    };
                    if value.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(value.to_string())
                    }
                })
                .collect();
            grid.push(cells);
        }

        SheetData::from_grid(grid.into_iter())
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<SheetData> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = extension_of(path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 打开工作簿（xlsx/xls 自动识别）
        let mut workbook = open_workbook_auto(path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names.first().cloned().ok_or(ImportError::EmptyWorkbook)?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 区域不从 A 列开始时补齐左侧空列，保持列号与表格一致
        let left_pad = range.start().map(|(_, col)| col as usize).unwrap_or(0);
        let grid = range.rows().map(|row| {
            let mut cells = vec![CellValue::Empty; left_pad];
            cells.extend(row.iter().map(cell_from_data));
            cells
        });

        SheetData::from_grid(grid)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 扩展名是否受支持（大小写不敏感）
    pub fn is_supported<P: AsRef<Path>>(file_path: P) -> bool {
        SUPPORTED_EXTENSIONS.contains(&extension_of(file_path.as_ref()).as_str())
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<SheetData> {
        let path = file_path.as_ref();

        match extension_of(path).as_str() {
            "csv" => CsvParser.parse_sheet(path),
            "xlsx" | "xls" => ExcelParser.parse_sheet(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl FileParser for UniversalFileParser {
    fn parse_sheet(&self, file_path: &Path) -> ImportResult<SheetData> {
        self.parse(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&["No PR,Nama Barang,Qty", "PR-1,Widget,5", "PR-2,Gadget,3"]);

        let sheet = CsvParser.parse_sheet(temp_file.path()).unwrap();

        assert_eq!(sheet.headers, vec!["No PR", "Nama Barang", "Qty"]);
        assert_eq!(sheet.total_rows(), 2);
        assert_eq!(sheet.rows[0].cell(0), CellValue::Text("PR-1".to_string()));
        assert_eq!(sheet.rows[1].row_number, 2);
    }

    #[test]
    fn test_csv_parser_keeps_blank_rows_and_pads_short_rows() {
        let temp_file = csv_file(&["No PR,Qty", "PR-1,2", ",", "PR-2"]);

        let sheet = CsvParser.parse_sheet(temp_file.path()).unwrap();

        assert_eq!(sheet.total_rows(), 3);
        assert_eq!(sheet.rows[1].row_number, 2);
        assert!(sheet.rows[1].cells.iter().all(CellValue::is_blank));
        assert_eq!(sheet.rows[2].row_number, 3);
        assert_eq!(sheet.rows[2].cell(1), CellValue::Empty);
    }

    #[test]
    fn test_csv_parser_strips_bom() {
        let temp_file = csv_file(&["\u{feff}No PR", "PR-1"]);
        let sheet = CsvParser.parse_sheet(temp_file.path()).unwrap();
        assert_eq!(sheet.headers, vec!["No PR"]);
    }

    #[test]
    fn test_header_only_file_is_not_empty() {
        let temp_file = csv_file(&["No PR,Qty"]);
        let sheet = CsvParser.parse_sheet(temp_file.path()).unwrap();
        assert_eq!(sheet.total_rows(), 0);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let temp_file = csv_file(&[]);
        let result = CsvParser.parse_sheet(temp_file.path());
        assert!(matches!(result, Err(ImportError::EmptyWorkbook)));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_sheet(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        assert!(UniversalFileParser::is_supported("a.XLSX"));
        assert!(!UniversalFileParser::is_supported("a.pdf"));
        let result = UniversalFileParser.parse("report.pdf");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_cell_from_data_keeps_raw_values() {
        assert_eq!(cell_from_data(&Data::Int(42)), CellValue::Number(42.0));
        assert_eq!(cell_from_data(&Data::Empty), CellValue::Empty);
        assert_eq!(
            cell_from_data(&Data::String("05/03/2024".to_string())),
            CellValue::Text("05/03/2024".to_string())
        );
    }
}
