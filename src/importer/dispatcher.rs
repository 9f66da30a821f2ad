// ==========================================
// VZD 数据导入 - 数据集分派
// ==========================================
// 规则:
// - .csv: 小写文件名 → 平面数据集
// - .xml: 根元素本地名（去命名空间）→ 层级数据集
// - 其他/未登记: None，由调用方决定告警或失败
// ==========================================

use crate::domain::{FlatDataset, XmlDataset};
use crate::importer::error::ImportResult;
use crate::importer::flat_importer::FlatFileImporter;
use crate::importer::hierarchical_importer::HierarchicalImporter;
use crate::importer::importer_trait::DatasetImporter;
use crate::importer::schema_registry::{flat_dataset_for, xml_dataset_for};
use crate::importer::xml_tree::sniff_root_tag;
use crate::repository::ReconcileRepository;
use std::path::Path;

/// 选中的导入器类别
#[derive(Debug, Clone, Copy)]
pub enum ImporterKind {
    Flat(&'static FlatDataset),
    Hierarchical(&'static XmlDataset),
}

impl ImporterKind {
    pub fn table(&self) -> &'static str {
        match self {
            ImporterKind::Flat(d) => d.table,
            ImporterKind::Hierarchical(d) => d.table,
        }
    }

    /// 构造导入器实例
    pub fn build<'r, R>(
        self,
        repo: &'r R,
        path: &Path,
    ) -> ImportResult<Box<dyn DatasetImporter + 'r>>
    where
        R: ReconcileRepository,
    {
        Ok(match self {
            ImporterKind::Flat(dataset) => Box::new(FlatFileImporter::new(repo, dataset, path)?),
            ImporterKind::Hierarchical(dataset) => {
                Box::new(HierarchicalImporter::new(repo, dataset, path)?)
            }
        })
    }
}

/// 按文件名匹配平面数据集（纯函数）
pub fn select_by_file_name(file_name: &str) -> Option<ImporterKind> {
    flat_dataset_for(file_name).map(ImporterKind::Flat)
}

/// 按根标签匹配层级数据集（纯函数）
pub fn select_by_root_tag(root_tag: &str) -> Option<ImporterKind> {
    xml_dataset_for(root_tag).map(ImporterKind::Hierarchical)
}

/// 为文件选择导入器
///
/// # 返回
/// - Ok(Some): 已识别的数据集
/// - Ok(None): 未登记的文件（含扩展名不支持）
/// - Err: XML 根元素读取失败
pub fn select_importer(path: &Path) -> ImportResult<Option<ImporterKind>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => Ok(path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(select_by_file_name)),
        "xml" => Ok(sniff_root_tag(path)?
            .as_deref()
            .and_then(select_by_root_tag)),
        _ => Ok(None),
    }
}
