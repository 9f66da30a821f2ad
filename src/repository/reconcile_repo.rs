// ==========================================
// VZD 数据导入 - 对账仓储 Trait
// ==========================================
// 职责: 定义导入引擎消费的存储能力（不包含实现）
// 能力: 参数化执行 / 显式事务 / 冲突 upsert / 索引增删 / 物化视图刷新
// 红线: 不含导入流程逻辑
// ==========================================

use crate::domain::{GeoPoint, Row};
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;

/// 物化视图刷新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRefresh {
    Refreshed,
    /// 视图不存在（可选特性缺失，非错误）
    Absent,
}

// ==========================================
// ReconcileRepository Trait
// ==========================================
// 用途: 导入器唯一的存储入口
// 实现者: SqliteReconcileRepository
pub trait ReconcileRepository {
    // ===== 事务控制 =====

    /// 开启事务
    fn begin(&self) -> RepositoryResult<()>;

    /// 提交事务
    fn commit(&self) -> RepositoryResult<()>;

    /// 回滚事务（无活动事务时为空操作）
    fn rollback(&self) -> RepositoryResult<()>;

    /// 是否处于活动事务中
    fn in_transaction(&self) -> RepositoryResult<bool>;

    /// 进度检查点: 提交已完成的工作并立即开启新事务
    fn checkpoint(&self) -> RepositoryResult<()>;

    // ===== 标记-清扫对账 =====

    /// 标记阶段: 目标表全部行置 `updated = false`
    fn mark_all_stale(&self, table: &str) -> RepositoryResult<usize>;

    /// 写入一行并置 `updated = true`；业务主键冲突时覆盖全部列（含几何）
    fn upsert_marked(
        &self,
        table: &str,
        key_column: &str,
        row: &Row,
        geometry: Option<GeoPoint>,
    ) -> RepositoryResult<()>;

    /// 清扫阶段: 删除仍为 `updated = false` 的行
    fn sweep_stale(&self, table: &str) -> RepositoryResult<usize>;

    // ===== 索引与视图 =====

    fn drop_index(&self, index: &str) -> RepositoryResult<()>;

    fn create_spatial_index(&self, index: &str, table: &str, column: &str)
        -> RepositoryResult<()>;

    fn refresh_materialized_view(&self, view: &str) -> RepositoryResult<ViewRefresh>;

    // ===== 层级数据写入 =====

    /// 主键冲突时覆盖全部列
    fn upsert(&self, table: &str, key_columns: &[&str], row: &Row) -> RepositoryResult<()>;

    /// 已存在则忽略
    fn insert_or_ignore(&self, table: &str, row: &Row) -> RepositoryResult<()>;

    // ===== 字典表 (id, description) =====

    /// 读取整张字典表: description → id
    fn load_lookup(&self, table: &str) -> RepositoryResult<HashMap<String, i64>>;

    fn find_lookup_id(&self, table: &str, description: &str) -> RepositoryResult<Option<i64>>;

    /// 插入新描述并返回代理键；重复描述返回 UniqueConstraintViolation
    fn insert_lookup(&self, table: &str, description: &str) -> RepositoryResult<i64>;
}
