// ==========================================
// VZD 数据导入 - 配置层
// ==========================================
// 职责: 运行配置加载（环境变量 + 默认值）
// ==========================================

pub mod import_settings;

pub use import_settings::{config_keys, default_db_path, ImportSettings};
