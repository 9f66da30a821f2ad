// ==========================================
// VZD 数据导入 - 目录级导入运行
// ==========================================
// 流程:
// 1. 解压数据包到数据目录（可跳过；数据包不存在时跳过）
// 2. 按文件名排序遍历数据目录
// 3. only 过滤 → 分派 → 单文件事务导入
// 4. 汇总为 RunReport
// ==========================================
// 红线: 每个文件一个事务；任一文件失败即回滚该文件并中止整个运行
// ==========================================

use crate::config::ImportSettings;
use crate::domain::{ImportSummary, RunReport};
use crate::importer::dispatcher::{select_importer, ImporterKind};
use crate::importer::error::ImportResult;
use crate::repository::ReconcileRepository;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

pub struct ImportRunner<'a, R>
where
    R: ReconcileRepository,
{
    repo: &'a R,
    settings: &'a ImportSettings,
}

impl<'a, R> ImportRunner<'a, R>
where
    R: ReconcileRepository,
{
    pub fn new(repo: &'a R, settings: &'a ImportSettings) -> Self {
        Self { repo, settings }
    }

    /// 解压数据包
    ///
    /// # 返回
    /// - 解压的条目数；跳过时为 0
    pub fn extract_archive(&self) -> ImportResult<usize> {
        if self.settings.skip_extract {
            debug!("已配置跳过解压");
            return Ok(0);
        }

        let archive_path = self.settings.archive_path();
        if !archive_path.exists() {
            warn!(archive = %archive_path.display(), "数据包不存在，跳过解压");
            return Ok(0);
        }

        let file = File::open(&archive_path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let entries = archive.len();
        archive.extract(&self.settings.data_path)?;
        info!(archive = %archive_path.display(), entries, "数据包已解压");
        Ok(entries)
    }

    /// 数据目录内的候选文件（排序，不含数据包本身）
    pub fn collect_files(&self) -> ImportResult<Vec<PathBuf>> {
        let archive_path = self.settings.archive_path();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.settings.data_path)? {
            let path = entry?.path();
            if path.is_file() && path != archive_path {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// 单文件事务导入
    pub fn import_file(&self, kind: ImporterKind, path: &Path) -> ImportResult<ImportSummary> {
        info!(file = %path.display(), table = kind.table(), "开始导入文件");
        self.repo.begin()?;

        let result = kind
            .build(self.repo, path)
            .and_then(|mut importer| importer.process());

        match result {
            Ok(summary) => {
                self.repo.commit()?;
                Ok(summary)
            }
            Err(e) => {
                error!(file = %path.display(), error = %e, "导入失败，回滚事务");
                if let Err(rollback_err) = self.repo.rollback() {
                    error!(error = %rollback_err, "回滚失败");
                }
                Err(e)
            }
        }
    }

    /// 执行一次完整运行
    pub fn run(&self) -> ImportResult<RunReport> {
        let mut report = RunReport::start();
        info!(
            run_id = %report.run_id,
            data_path = %self.settings.data_path.display(),
            "开始导入运行"
        );

        self.extract_archive()?;

        for path in self.collect_files()? {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if !self.settings.includes(&file_name) {
                debug!(file = %file_name, "不在 only 列表中，跳过");
                report.skipped.push(file_name);
                continue;
            }

            match select_importer(&path)? {
                Some(kind) => report.files.push(self.import_file(kind, &path)?),
                None => {
                    warn!(file = %file_name, "未识别的数据文件，跳过");
                    report.skipped.push(file_name);
                }
            }
        }

        report.finish();
        info!(
            run_id = %report.run_id,
            files = report.files.len(),
            skipped = report.skipped.len(),
            written = report.total_written(),
            "导入运行完成"
        );
        Ok(report)
    }
}
