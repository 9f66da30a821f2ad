// ==========================================
// VZD 数据导入 - 导入器 Trait
// ==========================================
// 职责: 定义单文件导入入口（不包含实现）
// 约定: 事务由调用方开启与提交；process 返回 Err 时调用方回滚
// ==========================================

use crate::domain::ImportSummary;
use crate::importer::error::ImportResult;

// ==========================================
// DatasetImporter Trait
// ==========================================
// 实现者: FlatFileImporter, HierarchicalImporter
pub trait DatasetImporter {
    /// 数据集名（日志/报告用）
    fn dataset_name(&self) -> &str;

    /// 执行完整的导入/对账流程
    ///
    /// # 返回
    /// - Ok(ImportSummary): 导入汇总
    /// - Err: 任意失败；调用方须回滚当前事务
    fn process(&mut self) -> ImportResult<ImportSummary>;
}
