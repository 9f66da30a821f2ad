// ==========================================
// VZD 数据导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含导入流程逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有值使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod reconcile_repo;
pub mod reconcile_repo_impl;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use reconcile_repo::{ReconcileRepository, ViewRefresh};
pub use reconcile_repo_impl::SqliteReconcileRepository;
