// ==========================================
// VZD 数据导入 - 平面文件对账导入器
// ==========================================
// 职责: 流式解码 CSV，对目标表执行全表 标记 → upsert → 清扫
// 流程:
// 1. 标记: 全表 updated = false
// 2. 带几何时删除空间索引
// 3. 流式解码，丢弃表头行
// 4. 逐行 upsert（经度为空的行跳过；经度存在而纬度为空视为格式错误）
// 5. 清扫: 删除仍为 updated = false 的行
// 6. 带几何时重建空间索引
// 7. 数据集后处理（失败仅记录）
// ==========================================
// 红线: 全部步骤在调用方的同一事务内；任一行失败即整体回滚
// ==========================================

use crate::domain::{
    FieldValue, FlatDataset, GeoPoint, ImportMode, ImportSummary, Postprocess, Row,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_coercer::{is_marker_field, FieldCoercer};
use crate::importer::file_parser::VzdCsvReader;
use crate::importer::importer_trait::DatasetImporter;
use crate::repository::reconcile_repo_impl::GEOMETRY_COLUMN;
use crate::repository::{ReconcileRepository, ViewRefresh};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// 进度日志间隔（行）
pub const PROGRESS_INTERVAL: usize = 10_000;

/// 几何装配
///
/// # 返回
/// - Ok(None): 经度为空（源记录不完整，整行不写入）
/// - Ok(Some(point)): 经纬度齐全
/// - Err(MalformedField): 经度存在而纬度为空
fn geometry_of(row: &Row, row_number: usize) -> ImportResult<Option<GeoPoint>> {
    let Some(lng) = row.get("lng").and_then(FieldValue::as_f64) else {
        return Ok(None);
    };
    let lat = row
        .get("lat")
        .and_then(FieldValue::as_f64)
        .ok_or_else(|| ImportError::malformed(row_number, "lat", "", "经度存在而纬度为空"))?;
    Ok(Some(GeoPoint::new(lng, lat)))
}

// ==========================================
// FlatFileImporter
// ==========================================
pub struct FlatFileImporter<'r, R>
where
    R: ReconcileRepository,
{
    repo: &'r R,
    dataset: &'static FlatDataset,
    key_column: &'static str,
    path: PathBuf,
}

impl<'r, R> FlatFileImporter<'r, R>
where
    R: ReconcileRepository,
{
    /// 创建导入器（校验数据集声明，不做任何 I/O）
    ///
    /// # 参数
    /// - repo: 处于活动事务中的对账仓储
    /// - dataset: 数据集声明
    /// - path: 已解压的 CSV 文件路径
    pub fn new(
        repo: &'r R,
        dataset: &'static FlatDataset,
        path: impl AsRef<Path>,
    ) -> ImportResult<Self> {
        let key_column = dataset.key_column().ok_or_else(|| ImportError::ConfigError {
            key: dataset.table.to_string(),
            message: "数据集未声明任何列".to_string(),
        })?;

        if dataset.has_geometry {
            for required in ["lat", "lng"] {
                if !dataset.columns.iter().any(|c| c.name == required) {
                    return Err(ImportError::ConfigError {
                        key: dataset.table.to_string(),
                        message: format!("几何数据集缺少 {} 列", required),
                    });
                }
            }
        }

        Ok(Self {
            repo,
            dataset,
            key_column,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// 后处理钩子（失败记录后吞掉）
    fn postprocess(&self) {
        match self.dataset.postprocess {
            Postprocess::None => {}
            Postprocess::RefreshMaterializedView(view) => {
                match self.repo.refresh_materialized_view(view) {
                    Ok(ViewRefresh::Refreshed) => info!(view = %view, "物化视图已刷新"),
                    Ok(ViewRefresh::Absent) => debug!(view = %view, "无物化视图需要刷新"),
                    Err(e) => warn!(view = %view, error = %e, "物化视图刷新失败，已忽略"),
                }
            }
        }
    }
}

impl<'r, R> DatasetImporter for FlatFileImporter<'r, R>
where
    R: ReconcileRepository,
{
    fn dataset_name(&self) -> &str {
        self.dataset.file_name
    }

    #[instrument(skip(self), fields(table = %self.dataset.table, file = %self.path.display()))]
    fn process(&mut self) -> ImportResult<ImportSummary> {
        let start_time = Instant::now();
        let table = self.dataset.table;
        let mut summary = ImportSummary::new(self.dataset.file_name, table, ImportMode::Reconcile);

        let mut reader = VzdCsvReader::open(&self.path)?;

        // === 步骤 1: 标记 ===
        let marked = self.repo.mark_all_stale(table)?;
        debug!(rows = marked, "已标记 updated = false");

        // === 步骤 2: 删除空间索引 ===
        if self.dataset.has_geometry {
            debug!("删除几何索引");
            self.repo.drop_index(&self.dataset.geometry_index())?;
        }

        // === 步骤 3: 流式解码 ===
        debug!("读取 CSV 文件");
        let coercer = FieldCoercer::new(self.dataset.columns);
        let mut rows = coercer.decode_rows(reader.records());

        // 跳过表头
        let header = rows
            .next()
            .ok_or_else(|| ImportError::EmptyFile(self.path.display().to_string()))??;
        let has_marker = header
            .values()
            .next()
            .and_then(FieldValue::as_str)
            .map(is_marker_field)
            .unwrap_or(false);
        if !has_marker {
            warn!("首行不是表头标记，仍按表头丢弃");
        }

        // === 步骤 4: 逐行 upsert ===
        debug!("写入数据行");
        for (idx, decoded) in rows.enumerate() {
            let row_number = idx + 1;
            let row = decoded?;
            summary.rows_read += 1;

            let geometry = if self.dataset.has_geometry {
                match geometry_of(&row, row_number) {
                    Ok(Some(point)) => Some(point),
                    Ok(None) => {
                        summary.rows_skipped += 1;
                        continue;
                    }
                    Err(e) => {
                        error!(row = row_number, values = ?row, error = %e, "几何装配失败");
                        return Err(e);
                    }
                }
            } else {
                None
            };

            if let Err(e) = self
                .repo
                .upsert_marked(table, self.key_column, &row, geometry)
            {
                error!(row = row_number, values = ?row, error = %e, "写入行失败");
                return Err(e.into());
            }
            summary.rows_written += 1;

            if row_number % PROGRESS_INTERVAL == 0 {
                debug!(rows = row_number, "行已写入");
            }
        }
        debug!(
            rows = summary.rows_read,
            written = summary.rows_written,
            skipped = summary.rows_skipped,
            "数据行写入完成"
        );

        // === 步骤 5: 清扫 ===
        summary.rows_swept = self.repo.sweep_stale(table)?;
        debug!(rows = summary.rows_swept, "已删除陈旧行");

        // === 步骤 6: 重建空间索引 ===
        if self.dataset.has_geometry {
            debug!("创建几何索引");
            self.repo
                .create_spatial_index(&self.dataset.geometry_index(), table, GEOMETRY_COLUMN)?;
        }

        // === 步骤 7: 后处理 ===
        self.postprocess();

        summary.elapsed_ms = start_time.elapsed().as_millis();
        info!(
            read = summary.rows_read,
            written = summary.rows_written,
            skipped = summary.rows_skipped,
            swept = summary.rows_swept,
            elapsed_ms = summary.elapsed_ms,
            "对账导入完成"
        );

        Ok(summary)
    }
}
