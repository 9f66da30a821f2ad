// ==========================================
// VZD 数据导入 - CSV 读取器
// ==========================================
// 格式: 字段分隔符 `;`，引号字符 `#`，首行为表头/标记行
// 说明: 流式读取，不预先加载整文件；表头不由读取器跳过
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::{Reader, ReaderBuilder};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 字段分隔符
pub const FIELD_DELIMITER: u8 = b';';

/// 引号字符
pub const QUOTE_CHAR: u8 = b'#';

// ==========================================
// VzdCsvReader
// ==========================================
pub struct VzdCsvReader;

impl VzdCsvReader {
    /// 打开 CSV 文件（校验存在性与扩展名）
    pub fn open(path: &Path) -> ImportResult<Reader<File>> {
        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }

    /// 从任意字节源构造读取器
    pub fn from_reader<R: Read>(source: R) -> Reader<R> {
        ReaderBuilder::new()
            .delimiter(FIELD_DELIMITER)
            .quote(QUOTE_CHAR)
            .has_headers(false) // 表头作为首条记录交给调用方
            .flexible(true) // 允许行长度不一致，缺字段由解码器报错
            .from_reader(source)
    }
}
