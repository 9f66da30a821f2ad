// ==========================================
// VZD 数据导入 - 领域类型定义
// ==========================================
// 职责: 列语义类型、字段值、行、坐标点
// 红线: 行一经解码即不可变
// ==========================================

use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 列语义类型 (Column Type)
// ==========================================
// 封闭集合: int / float / bool / date / string
// 数据集声明均为静态表，未知类型在编译期即被拒绝
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Date,
    String,
}

impl ColumnType {
    /// 对应的 SQLite 列类型
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Int => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Bool => "BOOLEAN",
            ColumnType::Date => "TEXT",
            ColumnType::String => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => write!(f, "int"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Bool => write!(f, "bool"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::String => write!(f, "string"),
        }
    }
}

// ==========================================
// 字段值 (Field Value)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    /// 已规整为 `YYYY-MM-DD...` 的日期文本
    Date(String),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) | FieldValue::Date(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Date(v) | FieldValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::Text).unwrap_or(FieldValue::Null)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map(FieldValue::Int).unwrap_or(FieldValue::Null)
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            FieldValue::Null => Value::Null,
            FieldValue::Int(v) => Value::Integer(*v),
            FieldValue::Float(v) => Value::Real(*v),
            FieldValue::Bool(v) => Value::Integer(i64::from(*v)),
            FieldValue::Date(v) | FieldValue::Text(v) => Value::Text(v.clone()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

// ==========================================
// 行 (Row)
// ==========================================
// 列名 → 字段值，保持声明顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    cells: Vec<(&'static str, FieldValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// 追加一列（构造期使用）
    pub fn push(&mut self, column: &'static str, value: FieldValue) {
        self.cells.push((column, value));
    }

    /// 链式追加一列
    pub fn with(mut self, column: &'static str, value: FieldValue) -> Self {
        self.push(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.cells
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.cells.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ==========================================
// 坐标点 (WGS84)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

/// 坐标参考系: WGS84
pub const SRID_WGS84: u32 = 4326;

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// EWKT 表示（`SRID=4326;POINT(lng lat)`）
    pub fn to_ewkt(&self) -> String {
        format!("SRID={};POINT({} {})", SRID_WGS84, self.lng, self.lat)
    }
}
