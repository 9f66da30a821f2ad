// ==========================================
// VZD 数据导入 - 导入结果报告
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 导入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMode {
    /// 标记-清扫全表对账
    Reconcile,
    /// 仅 upsert（不清扫）
    Upsert,
}

/// 单文件导入汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub dataset: String,
    pub table: String,
    pub mode: ImportMode,
    /// 读取的数据行数（CSV）或条目数（XML）
    pub rows_read: usize,
    /// 写入（upsert）的行数，含子表行
    pub rows_written: usize,
    /// 因几何缺失跳过的行数
    pub rows_skipped: usize,
    /// 清扫阶段删除的陈旧行数
    pub rows_swept: usize,
    pub elapsed_ms: u128,
}

impl ImportSummary {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>, mode: ImportMode) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
            mode,
            rows_read: 0,
            rows_written: 0,
            rows_skipped: 0,
            rows_swept: 0,
            elapsed_ms: 0,
        }
    }
}

/// 一次目录级导入运行的报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub files: Vec<ImportSummary>,
    /// 未识别或被过滤掉的文件
    pub skipped: Vec<String>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            files: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total_written(&self) -> usize {
        self.files.iter().map(|f| f.rows_written).sum()
    }
}
