// ==========================================
// VZD 数据导入 - 运行配置
// ==========================================
// 职责: 从环境变量（或任意键值来源）加载一次运行的配置
// 默认值:
// - 数据库: 用户数据目录/vzd-import/vzd.db
// - 数据目录: ./data
// - 数据包: aw_csv.zip
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const DB_PATH: &str = "VZD_DB_PATH";
    pub const DATA_PATH: &str = "VZD_DATA_PATH";
    pub const ARCHIVE: &str = "VZD_ARCHIVE";
    pub const SKIP_EXTRACT: &str = "VZD_SKIP_EXTRACT";
    pub const ONLY: &str = "VZD_ONLY";
}

pub const DEFAULT_DATA_PATH: &str = "./data";
pub const DEFAULT_ARCHIVE: &str = "aw_csv.zip";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub db_path: PathBuf,
    pub data_path: PathBuf,
    /// 数据目录内的数据包文件名
    pub archive: String,
    pub skip_extract: bool,
    /// 非空时仅处理列出的文件（小写比较）
    pub only: Vec<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            archive: DEFAULT_ARCHIVE.to_string(),
            skip_extract: false,
            only: Vec::new(),
        }
    }
}

impl ImportSettings {
    /// 从进程环境变量加载
    pub fn from_env() -> ImportResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载（空白值视为未设置）
    pub fn from_lookup<F>(lookup: F) -> ImportResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self::default();
        if let Some(path) = get(config_keys::DB_PATH) {
            settings.db_path = PathBuf::from(path);
        }
        if let Some(path) = get(config_keys::DATA_PATH) {
            settings.data_path = PathBuf::from(path);
        }
        if let Some(archive) = get(config_keys::ARCHIVE) {
            settings.archive = archive;
        }
        if let Some(flag) = get(config_keys::SKIP_EXTRACT) {
            settings.skip_extract = parse_switch(config_keys::SKIP_EXTRACT, &flag)?;
        }
        if let Some(only) = get(config_keys::ONLY) {
            settings.only = only
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(settings)
    }

    /// 数据包完整路径
    pub fn archive_path(&self) -> PathBuf {
        self.data_path.join(&self.archive)
    }

    /// 文件是否在本次处理范围内
    pub fn includes(&self, file_name: &str) -> bool {
        self.only.is_empty() || self.only.iter().any(|f| f == &file_name.to_lowercase())
    }
}

fn parse_switch(key: &str, value: &str) -> ImportResult<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "y" | "yes" => Ok(true),
        "0" | "false" | "n" | "no" => Ok(false),
        _ => Err(ImportError::ConfigError {
            key: key.to_string(),
            message: format!("无法识别的开关值: {}", value),
        }),
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 用户数据目录/vzd-import/vzd.db；无法获取数据目录时回退 ./vzd.db
pub fn default_db_path() -> PathBuf {
    match dirs::data_dir() {
        Some(data_dir) => data_dir.join("vzd-import").join("vzd.db"),
        None => PathBuf::from("./vzd.db"),
    }
}
