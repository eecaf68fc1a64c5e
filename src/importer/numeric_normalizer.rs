// ==========================================
// 采购申请跟踪系统 - 数值归一化器
// ==========================================
// 职责: 数量（整数）与金额（小数）的宽松解析
// 支持: 机器数字 / 印尼格式 (568.453.820 / 1.234,56) / 美式格式 (1,234.56)
// 红线: 永不报错，无法解析时取 0
// ==========================================

use crate::domain::types::CellValue;

/// 文本是否为"纯数字"（符号 / 小数点 / 指数），是则返回数值
///
/// inf / NaN 之类的写法不算数字
pub fn plain_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
    if !trimmed.chars().all(allowed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 数量: 数值单元格截断取整；文本取前导整数（符号 + 数字）
pub fn normalize_quantity(cell: &CellValue) -> i64 {
    match cell {
        CellValue::Empty => 0,
        CellValue::Number(v) if v.is_finite() => v.trunc() as i64,
        CellValue::Number(_) => 0,
        CellValue::Text(s) => leading_integer(s.trim()),
    }
}

fn leading_integer(text: &str) -> i64 {
    let mut end = 0;
    for (idx, c) in text.char_indices() {
        let is_sign = idx == 0 && (c == '+' || c == '-');
        if c.is_ascii_digit() || is_sign {
            end = idx + c.len_utf8();
        } else {
            break;
        }
    }
    // 超出 i64 范围时饱和
    match text[..end].parse::<i64>() {
        Ok(v) => v,
        Err(_) if text[..end].chars().any(|c| c.is_ascii_digit()) => {
            if text.starts_with('-') {
                i64::MIN
            } else {
                i64::MAX
            }
        }
        Err(_) => 0,
    }
}

/// 金额: 数值单元格或纯数字文本直接使用，其余按千分位规则判定
pub fn normalize_currency(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Empty => 0.0,
        CellValue::Number(v) if v.is_finite() => *v,
        CellValue::Number(_) => 0.0,
        CellValue::Text(s) => parse_currency_text(s),
    }
}

/// 文本金额解析
///
/// 点号多于一个、只有点号、或逗号在最后一个点号之后 → 印尼格式（点为千分位，逗号为小数点）；
/// 否则 → 美式格式（逗号为千分位）
pub fn parse_currency_text(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    if let Some(v) = plain_number(text) {
        return v;
    }

    let dot_count = text.matches('.').count();
    let comma_count = text.matches(',').count();
    let comma_after_dot = match (text.rfind(','), text.rfind('.')) {
        (Some(comma), Some(dot)) => comma > dot,
        _ => false,
    };

    let indonesian = dot_count > 1 || (dot_count >= 1 && comma_count == 0) || comma_after_dot;
    let normalized = if indonesian {
        text.replace('.', "").replace(',', ".")
    } else {
        text.replace(',', "")
    };

    let digits: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    leading_decimal(&digits)
}

/// 取前导小数（数字 + 至多一个小数点），无数字时为 0
fn leading_decimal(text: &str) -> f64 {
    let mut end = 0;
    let mut seen_dot = false;
    for (idx, c) in text.char_indices() {
        if c == '.' && !seen_dot {
            seen_dot = true;
        } else if !c.is_ascii_digit() {
            break;
        }
        end = idx + 1;
    }
    let prefix = text[..end].trim_end_matches('.');
    if prefix.is_empty() || prefix == "." {
        return 0.0;
    }
    prefix.parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_currency_indonesian_thousands() {
        assert_eq!(normalize_currency(&text("568.453.820")), 568_453_820.0);
        assert_eq!(normalize_currency(&text("1.234,56")), 1234.56);
        assert_eq!(normalize_currency(&text("Rp 1.500.000")), 1_500_000.0);
    }

    #[test]
    fn test_currency_us_format() {
        assert_eq!(normalize_currency(&text("1,234.56")), 1234.56);
        assert_eq!(normalize_currency(&text("2,500")), 2500.0);
    }

    #[test]
    fn test_currency_plain_numbers() {
        assert_eq!(normalize_currency(&text("10")), 10.0);
        assert_eq!(normalize_currency(&text("1234.56")), 1234.56);
        assert_eq!(normalize_currency(&text("1e3")), 1000.0);
        assert_eq!(normalize_currency(&CellValue::Number(99.5)), 99.5);
    }

    #[test]
    fn test_currency_garbage_is_zero() {
        assert_eq!(normalize_currency(&text("n/a")), 0.0);
        assert_eq!(normalize_currency(&text("   ")), 0.0);
        assert_eq!(normalize_currency(&CellValue::Empty), 0.0);
        assert_eq!(normalize_currency(&text("inf")), 0.0);
    }

    #[test]
    fn test_quantity() {
        assert_eq!(normalize_quantity(&CellValue::Number(7.9)), 7);
        assert_eq!(normalize_quantity(&text("12 pcs")), 12);
        assert_eq!(normalize_quantity(&text("3.7")), 3);
        assert_eq!(normalize_quantity(&text("-4")), -4);
        assert_eq!(normalize_quantity(&text("pcs")), 0);
        assert_eq!(normalize_quantity(&CellValue::Empty), 0);
    }

    #[test]
    fn test_plain_number_detection() {
        assert_eq!(plain_number(" 45356 "), Some(45356.0));
        assert_eq!(plain_number("NaN"), None);
        assert_eq!(plain_number("1.234,56"), None);
        assert_eq!(plain_number("05/03/2024"), None);
    }
}
