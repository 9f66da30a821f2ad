// ==========================================
// VZD 数据导入 - 字段类型转换器
// ==========================================
// 职责: 按声明的列类型把一条原始定位记录解码为强类型行
// 规则:
// - 表头/标记行（首字段为 #KODS# 标记）全部按字符串处理
// - 空串 → NULL（bool 列除外，空串走布尔映射）
// - bool: 仅 "Y" / "1" 为真，其余一律为假
// - date: `YYYY.MM.DD...` 换分隔符；`DD.MM.YYYY` 改写为 `YYYY-MM-DD`；其他形态拒绝
// ==========================================

use crate::domain::{Column, ColumnType, FieldValue, Row};
use crate::importer::error::{ImportError, ImportResult};
use csv::StringRecord;
use once_cell::sync::Lazy;
use regex::Regex;

/// 表头标记（含 UTF-8 BOM 前缀及去引号后的形态）
pub const HEADER_MARKERS: [&str; 4] = ["\u{feff}#KODS#", "#KODS#", "\u{feff}KODS", "KODS"];

static RE_LEADING_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}").expect("Invalid regex"));
static RE_DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d\d)\.(\d\d)\.(\d{4})").expect("Invalid regex"));

/// 判断首字段是否为表头标记
pub fn is_marker_field(first: &str) -> bool {
    HEADER_MARKERS.contains(&first)
}

/// 日期规整；无法识别的形态返回 None
pub fn normalize_date(value: &str) -> Option<String> {
    if RE_LEADING_YEAR.is_match(value) {
        return Some(value.replace('.', "-"));
    }
    if RE_DAY_MONTH_YEAR.is_match(value) {
        return Some(
            RE_DAY_MONTH_YEAR
                .replace_all(value, "${3}-${2}-${1}")
                .into_owned(),
        );
    }
    None
}

/// 布尔映射（封闭集合）
pub fn parse_flag(value: &str) -> bool {
    matches!(value, "Y" | "1")
}

/// 单字段转换
///
/// # 参数
/// - ty: 声明的列类型
/// - value: 原始文本
/// - field: 列名（用于错误信息）
/// - row_number: 行号（用于错误信息）
pub fn coerce_field(
    ty: ColumnType,
    value: &str,
    field: &str,
    row_number: usize,
) -> ImportResult<FieldValue> {
    if value.is_empty() && ty != ColumnType::Bool {
        return Ok(FieldValue::Null);
    }

    match ty {
        ColumnType::Int => value
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| ImportError::malformed(row_number, field, value, "无法解析为整数")),
        ColumnType::Float => value
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| ImportError::malformed(row_number, field, value, "无法解析为浮点数")),
        ColumnType::Bool => Ok(FieldValue::Bool(parse_flag(value))),
        ColumnType::Date => normalize_date(value)
            .map(FieldValue::Date)
            .ok_or_else(|| ImportError::malformed(row_number, field, value, "日期格式无法识别")),
        ColumnType::String => Ok(FieldValue::Text(value.to_string())),
    }
}

// ==========================================
// FieldCoercer - 整行解码
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct FieldCoercer<'a> {
    columns: &'a [Column],
}

impl<'a> FieldCoercer<'a> {
    pub fn new(columns: &'a [Column]) -> Self {
        Self { columns }
    }

    /// 解码一条记录
    ///
    /// # 参数
    /// - record: 原始定位字段
    /// - row_number: 记录序号（表头为 0）
    ///
    /// # 返回
    /// - Ok(Row): 按声明顺序的强类型行
    /// - Err: 字段缺失或格式错误
    pub fn decode(&self, record: &StringRecord, row_number: usize) -> ImportResult<Row> {
        let is_marker = record.get(0).map(is_marker_field).unwrap_or(false);

        let mut row = Row::with_capacity(self.columns.len());
        for (idx, column) in self.columns.iter().enumerate() {
            let value = match record.get(idx) {
                Some(value) => value,
                // 表头行字段数不足时按空处理
                None if is_marker => "",
                None => {
                    return Err(ImportError::malformed(row_number, column.name, "", "字段缺失"))
                }
            };

            let ty = if is_marker { ColumnType::String } else { column.ty };
            row.push(column.name, coerce_field(ty, value, column.name, row_number)?);
        }

        Ok(row)
    }

    /// 惰性解码记录流（每次调用得到新的序列；首个元素为表头，由调用方丢弃）
    pub fn decode_rows<I>(&self, records: I) -> DecodedRows<'a, I>
    where
        I: Iterator<Item = Result<StringRecord, csv::Error>>,
    {
        DecodedRows {
            coercer: *self,
            records,
            row_number: 0,
        }
    }
}

/// 惰性解码迭代器
pub struct DecodedRows<'a, I> {
    coercer: FieldCoercer<'a>,
    records: I,
    row_number: usize,
}

impl<'a, I> DecodedRows<'a, I> {
    /// 最近一次产出的记录序号
    pub fn row_number(&self) -> usize {
        self.row_number.saturating_sub(1)
    }
}

impl<'a, I> Iterator for DecodedRows<'a, I>
where
    I: Iterator<Item = Result<StringRecord, csv::Error>>,
{
    type Item = ImportResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let row_number = self.row_number;
        self.row_number += 1;

        Some(
            record
                .map_err(ImportError::from)
                .and_then(|r| self.coercer.decode(&r, row_number)),
        )
    }
}
