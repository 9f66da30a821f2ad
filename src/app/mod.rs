// ==========================================
// VZD 数据导入 - 应用层
// ==========================================
// 职责: 连接状态装配与目录级运行编排
// ==========================================

pub mod runner;
pub mod state;

// 重导出
pub use runner::ImportRunner;
pub use state::AppState;
