// ==========================================
// VZD 数据导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 地址/地籍开放数据的对账式批量导入（单写入方）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 类型与数据集声明
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 解码与对账
pub mod importer;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// 应用层 - 运行编排
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use app::{AppState, ImportRunner};
pub use config::ImportSettings;
pub use domain::{ImportSummary, RunReport};
pub use importer::{DatasetImporter, ImportError, ImportResult};
pub use repository::{ReconcileRepository, SqliteReconcileRepository};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "VZD 数据导入";
