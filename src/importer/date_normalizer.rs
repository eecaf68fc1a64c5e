// ==========================================
// 采购申请跟踪系统 - 日期归一化器
// ==========================================
// 职责: 原始单元格 → YYYY-MM-DD
// 顺序: 空白 → 表格序列号 → 日/月/年 → 通用文本格式
// 红线: 永不报错；无法解析一律为 None
// 红线: 形如 05/03/2024 的日期按"日/月/年"解释，不回退为"月/日/年"
// ==========================================

use crate::domain::types::CellValue;
use crate::importer::numeric_normalizer::plain_number;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// 输出格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 1900 日期系统中不存在的 1900-02-29
const PHANTOM_LEAP_DAY_SERIAL: i64 = 60;

/// 9999-12-31 对应的序列号
const MAX_SERIAL: f64 = 2_958_465.0;

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("invalid day-month-year regex")
});

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// 单元格 → 日期
pub fn parse_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Empty => None,
        CellValue::Number(serial) => from_serial(*serial),
        CellValue::Text(raw) => {
            let text = raw.trim();
            if text.is_empty() {
                return None;
            }
            if let Some(serial) = plain_number(text) {
                return from_serial(serial);
            }
            if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
                let day = caps[1].parse::<u32>().ok()?;
                let month = caps[2].parse::<u32>().ok()?;
                let year = caps[3].parse::<i32>().ok()?;
                return NaiveDate::from_ymd_opt(year, month, day);
            }
            parse_free_text(text)
        }
    }
}

/// 单元格 → "YYYY-MM-DD" 文本
pub fn normalize_date(cell: &CellValue) -> Option<String> {
    parse_date(cell).map(|d| d.format(DATE_FORMAT).to_string())
}

/// 表格序列号（1900 日期系统）→ 日期，时间部分舍去
///
/// 序列号 1 = 1900-01-01；60 是不存在的 1900-02-29；61 起整体偏移一天
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= MAX_SERIAL + 1.0 {
        return None;
    }
    let days = serial.floor() as i64;
    let base = match days {
        d if d < PHANTOM_LEAP_DAY_SERIAL => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        PHANTOM_LEAP_DAY_SERIAL => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    base.checked_add_signed(Duration::days(days))
}

fn parse_free_text(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}
