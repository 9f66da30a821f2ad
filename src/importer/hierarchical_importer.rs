// ==========================================
// VZD 数据导入 - 层级记录导入器 (XML FullData)
// ==========================================
// 职责: 流式读取 `<X>ItemList/<X>ItemData` 条目，展开为子表行并 upsert
// 流程:
// 1. 构造时一次性加载数据集用到的字典表
// 2. 逐条目计算基础关系键 (cadastre_nr, object_type)
// 3. 按数据集展开规则生成子表行 (Marks / Single / Ownerships)
// 4. 按主键 upsert；每 1000 个条目提交一次检查点
// ==========================================
// 说明: 层级数据集只 upsert，不做标记-清扫（多个文件可写同一张表）
// ==========================================

use crate::domain::{
    FieldValue, Flattening, ImportMode, ImportSummary, Row, XmlDataset, XmlField,
};
use crate::importer::error::ImportResult;
use crate::importer::field_coercer::coerce_field;
use crate::importer::importer_trait::DatasetImporter;
use crate::importer::lookup_cache::LookupCache;
use crate::importer::schema_registry::{CADASTRE_NR_PATH, OBJECT_TYPE_PATH};
use crate::importer::xml_tree::{ItemStream, XmlNode};
use crate::repository::ReconcileRepository;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// 检查点间隔（条目）
pub const CHECKPOINT_INTERVAL: usize = 1_000;

/// 基础关系键: 缺少地籍号时两列均为 NULL（孤立子记录仍写入）
pub fn base_relation_key(item: &XmlNode) -> Row {
    match item.text_at(CADASTRE_NR_PATH) {
        Some(cadastre_nr) => Row::new()
            .with("cadastre_nr", FieldValue::Text(cadastre_nr.to_string()))
            .with(
                "object_type",
                FieldValue::from(item.text_at(OBJECT_TYPE_PATH).map(str::to_string)),
            ),
        None => Row::new()
            .with("cadastre_nr", FieldValue::Null)
            .with("object_type", FieldValue::Null),
    }
}

/// 按字段声明投影深路径值
fn project_fields(
    node: &XmlNode,
    fields: &[XmlField],
    row: &mut Row,
    item_number: usize,
) -> ImportResult<()> {
    for field in fields {
        let value = node.value_at(field.path, FieldValue::Null, |text| {
            coerce_field(field.ty, text, field.column, item_number)
        })?;
        row.push(field.column, value);
    }
    Ok(())
}

// ==========================================
// HierarchicalImporter
// ==========================================
pub struct HierarchicalImporter<'r, R>
where
    R: ReconcileRepository,
{
    repo: &'r R,
    dataset: &'static XmlDataset,
    path: PathBuf,
    /// 字典表名 → 缓存
    lookups: HashMap<&'static str, LookupCache>,
    /// 本次运行已写入的标记类型
    seen_mark_types: HashSet<String>,
}

impl<'r, R> HierarchicalImporter<'r, R>
where
    R: ReconcileRepository,
{
    /// 创建导入器并预加载字典表
    pub fn new(
        repo: &'r R,
        dataset: &'static XmlDataset,
        path: impl AsRef<Path>,
    ) -> ImportResult<Self> {
        let mut lookups = HashMap::new();
        for table in dataset.lookup_tables() {
            lookups.insert(table, LookupCache::load(repo, table)?);
        }

        Ok(Self {
            repo,
            dataset,
            path: path.as_ref().to_path_buf(),
            lookups,
            seen_mark_types: HashSet::new(),
        })
    }

    /// 描述 → 代理键（描述缺失为 NULL）
    fn resolve_lookup(
        &mut self,
        table: &'static str,
        description: Option<&str>,
    ) -> ImportResult<FieldValue> {
        let Some(description) = description else {
            return Ok(FieldValue::Null);
        };
        let repo = self.repo;
        let cache = match self.lookups.entry(table) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(LookupCache::load(repo, table)?),
        };
        cache.resolve(repo, description).map(FieldValue::Int)
    }

    /// 标记类型字典: 已存在则不覆盖描述
    fn record_mark_type(
        &mut self,
        table: &'static str,
        mark_type: &str,
        description: Option<&str>,
    ) -> ImportResult<()> {
        if !self.seen_mark_types.insert(mark_type.to_string()) {
            return Ok(());
        }
        let row = Row::new()
            .with("mark_type", FieldValue::Text(mark_type.to_string()))
            .with("description", FieldValue::from(description.map(str::to_string)));
        self.repo.insert_or_ignore(table, &row)?;
        Ok(())
    }

    /// 单条目 → 子表行
    pub fn flatten(&mut self, item: &XmlNode, item_number: usize) -> ImportResult<Vec<Row>> {
        let base = base_relation_key(item);

        match self.dataset.flattening {
            Flattening::Single { fields } => {
                let mut row = base;
                project_fields(item, fields, &mut row, item_number)?;
                Ok(vec![row])
            }
            Flattening::Marks {
                entries_path,
                fields,
                type_path,
                description_path,
                lookup_table,
            } => {
                let mut rows = Vec::new();
                for mark in item.children_at(entries_path) {
                    let mut row = base.clone();
                    project_fields(mark, fields, &mut row, item_number)?;
                    if let Some(mark_type) = mark.text_at(type_path) {
                        self.record_mark_type(
                            lookup_table,
                            mark_type,
                            mark.text_at(description_path),
                        )?;
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            Flattening::Ownerships {
                entries_path,
                status_path,
                person_status_path,
                status_table,
                person_status_table,
            } => {
                let mut rows = Vec::new();
                for entry in item.children_at(entries_path) {
                    let status_id = self.resolve_lookup(status_table, entry.text_at(status_path))?;
                    let person_id =
                        self.resolve_lookup(person_status_table, entry.text_at(person_status_path))?;
                    rows.push(
                        base.clone()
                            .with("ownership_status_id", status_id)
                            .with("person_status_id", person_id),
                    );
                }
                Ok(rows)
            }
        }
    }
}

impl<'r, R> DatasetImporter for HierarchicalImporter<'r, R>
where
    R: ReconcileRepository,
{
    fn dataset_name(&self) -> &str {
        self.dataset.name
    }

    #[instrument(skip(self), fields(dataset = %self.dataset.name, table = %self.dataset.table, file = %self.path.display()))]
    fn process(&mut self) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();
        let table = self.dataset.table;
        let key_columns = self.dataset.key_columns;
        let mut summary = ImportSummary::new(self.dataset.name, table, ImportMode::Upsert);

        let items = ItemStream::open(
            &self.path,
            &self.dataset.list_tag(),
            &self.dataset.item_tag(),
        )?;

        for (idx, item) in items.enumerate() {
            let item_number = idx + 1;
            let item = item?;
            summary.rows_read += 1;

            for row in self.flatten(&item, item_number)? {
                self.repo.upsert(table, key_columns, &row)?;
                summary.rows_written += 1;
            }

            if item_number % CHECKPOINT_INTERVAL == 0 {
                self.repo.checkpoint()?;
                debug!(items = item_number, rows = summary.rows_written, "检查点已提交");
            }
        }

        summary.elapsed_ms = start_time.elapsed().as_millis();
        info!(
            items = summary.rows_read,
            written = summary.rows_written,
            elapsed_ms = summary.elapsed_ms,
            "层级导入完成"
        );

        Ok(summary)
    }
}
