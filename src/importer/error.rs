// ==========================================
// VZD 数据导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================
// 分类:
// - 配置错误: 数据集声明不完整 / 环境变量取值非法（I/O 之前即中止）
// - 输入格式错误: 数值/日期字段无法解析（整个文件回滚）
// - 字典表竞争: 唯一约束冲突后重读仍未命中
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv/.xml）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("XML 解析失败: {0}")]
    XmlParseError(String),

    #[error("文件为空（缺少表头行）: {0}")]
    EmptyFile(String),

    #[error("数据包解压失败: {0}")]
    ArchiveError(String),

    // ===== 数据解码错误 =====
    #[error("字段格式错误 (行 {row}, 字段 {field}): {message}, 实际值 {value:?}")]
    MalformedField {
        row: usize,
        field: String,
        value: String,
        message: String,
    },

    // ===== 配置错误 =====
    #[error("配置错误 (key: {key}): {message}")]
    ConfigError { key: String, message: String },

    // ===== 数据库错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("字典表 {table} 无法解析描述 {description:?}")]
    LookupUnresolved { table: String, description: String },
}

impl ImportError {
    pub fn malformed(row: usize, field: &str, value: &str, message: impl Into<String>) -> Self {
        ImportError::MalformedField {
            row,
            field: field.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<quick_xml::Error>
impl From<quick_xml::Error> for ImportError {
    fn from(err: quick_xml::Error) -> Self {
        ImportError::XmlParseError(err.to_string())
    }
}

// 实现 From<zip::result::ZipError>
impl From<zip::result::ZipError> for ImportError {
    fn from(err: zip::result::ZipError) -> Self {
        ImportError::ArchiveError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
