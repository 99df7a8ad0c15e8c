use serde_json::Value;

/// Значение одной ячейки листа
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) => false,
        }
    }

    /// Текст ячейки без пробелов по краям; пустая ячейка -> None
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) => Some(format_number_cell(*n)),
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&Value> for CellValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

fn format_number_cell(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Одна строка листа в том виде, в котором ее отдал источник
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Номер строки в листе (с 1), для сообщений в логе
    pub number: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    pub fn new(number: usize, cells: Vec<CellValue>) -> Self {
        Self { number, cells }
    }

    /// Ячейка по позиции; хвостовые пустые ячейки источник не присылает
    pub fn cell(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }
}

// ============================================================================
// Приведение значений ячеек
// ============================================================================

/// id: целое > 0. "12", 12, "12.0" подходят; "12.5", "0", "-1", "abc" не подходят
pub fn parse_id(cell: Option<&CellValue>) -> Option<i64> {
    let value = match cell? {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(id) => return (id > 0).then_some(id),
                Err(_) => s.parse::<f64>().ok()?,
            }
        }
        CellValue::Empty | CellValue::Bool(_) => return None,
    };
    if value.is_finite() && value.fract() == 0.0 && value > 0.0 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Цена: неотрицательное конечное число; разделители тысяч отбрасываются
pub fn parse_price(cell: Option<&CellValue>) -> Option<f64> {
    let value = match cell? {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => normalize_decimal(s)?.parse::<f64>().ok()?,
        CellValue::Empty | CellValue::Bool(_) => return None,
    };
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Остаток: целое >= 0, дробная часть отбрасывается; все непонятное -> 0
pub fn parse_stock(cell: Option<&CellValue>) -> i64 {
    let value = match cell {
        Some(CellValue::Number(n)) => Some(*n),
        Some(CellValue::Text(s)) => normalize_decimal(s).and_then(|s| s.parse::<f64>().ok()),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() && v > 0.0 && v < i64::MAX as f64 => v.trunc() as i64,
        _ => 0,
    }
}

/// Приводит запись числа к виду, понятному `str::parse::<f64>`.
///
/// Пробелы (в том числе неразрывные), апострофы и подчеркивания считаются
/// разделителями тысяч. Для `,` и `.`:
/// - оба знака: десятичный тот, что правее ("1.234,56", "1,234.56");
/// - одна запятая и после нее не ровно три цифры: десятичная ("9,99");
/// - иначе запятые и повторяющиеся точки считаются разделителями тысяч ("1,234", "1.234.567").
pub fn normalize_decimal(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{00A0}' | '\u{202F}' | '\'' | '_'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(comma), None) => {
            let single = cleaned.matches(',').count() == 1;
            let fraction_len = cleaned.len() - comma - 1;
            if single && fraction_len != 3 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_cell_from_json() {
        assert_eq!(CellValue::from(&serde_json::json!(null)), CellValue::Empty);
        assert_eq!(CellValue::from(&serde_json::json!(5)), CellValue::Number(5.0));
        assert_eq!(CellValue::from(&serde_json::json!("x")), text("x"));
        assert_eq!(CellValue::from(&serde_json::json!(true)), CellValue::Bool(true));
    }

    #[test]
    fn test_as_text() {
        assert_eq!(text("  Mug ").as_text().as_deref(), Some("Mug"));
        assert_eq!(text("   ").as_text(), None);
        assert_eq!(CellValue::Number(42.0).as_text().as_deref(), Some("42"));
        assert_eq!(CellValue::Number(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(CellValue::Empty.as_text(), None);
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some(&text("12"))), Some(12));
        assert_eq!(parse_id(Some(&text(" 7 "))), Some(7));
        assert_eq!(parse_id(Some(&text("12.0"))), Some(12));
        assert_eq!(parse_id(Some(&CellValue::Number(3.0))), Some(3));
        assert_eq!(parse_id(Some(&text("12.5"))), None);
        assert_eq!(parse_id(Some(&text("0"))), None);
        assert_eq!(parse_id(Some(&text("-4"))), None);
        assert_eq!(parse_id(Some(&text("abc"))), None);
        assert_eq!(parse_id(Some(&text(""))), None);
        assert_eq!(parse_id(Some(&CellValue::Empty)), None);
        assert_eq!(parse_id(None), None);
    }

    #[test]
    fn test_normalize_decimal() {
        assert_eq!(normalize_decimal("9,99").as_deref(), Some("9.99"));
        assert_eq!(normalize_decimal("1,234").as_deref(), Some("1234"));
        assert_eq!(normalize_decimal("1,234,567").as_deref(), Some("1234567"));
        assert_eq!(normalize_decimal("1.234,56").as_deref(), Some("1234.56"));
        assert_eq!(normalize_decimal("1,234.56").as_deref(), Some("1234.56"));
        assert_eq!(normalize_decimal("1.234.567").as_deref(), Some("1234567"));
        assert_eq!(normalize_decimal("1 299.00").as_deref(), Some("1299.00"));
        assert_eq!(normalize_decimal("5.00").as_deref(), Some("5.00"));
        assert_eq!(normalize_decimal("  "), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(Some(&text("9,99"))), Some(9.99));
        assert_eq!(parse_price(Some(&text("5.00"))), Some(5.0));
        assert_eq!(parse_price(Some(&text("1,299"))), Some(1299.0));
        assert_eq!(parse_price(Some(&CellValue::Number(19.5))), Some(19.5));
        assert_eq!(parse_price(Some(&text("free"))), None);
        assert_eq!(parse_price(Some(&text("NaN"))), None);
        assert_eq!(parse_price(Some(&text("-3"))), None);
        assert_eq!(parse_price(Some(&CellValue::Empty)), None);
    }

    #[test]
    fn test_parse_stock() {
        assert_eq!(parse_stock(Some(&text("15"))), 15);
        assert_eq!(parse_stock(Some(&text("3.7"))), 3);
        assert_eq!(parse_stock(Some(&text("1,200"))), 1200);
        assert_eq!(parse_stock(Some(&CellValue::Number(8.0))), 8);
        assert_eq!(parse_stock(Some(&text("many"))), 0);
        assert_eq!(parse_stock(Some(&text("-2"))), 0);
        assert_eq!(parse_stock(None), 0);
    }

    #[test]
    fn test_blank_row() {
        let row = RawRow::new(3, vec![CellValue::Empty, text("  ")]);
        assert!(row.is_blank());
        let row = RawRow::new(4, vec![CellValue::Empty, text("x")]);
        assert!(!row.is_blank());
    }
}
