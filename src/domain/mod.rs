// ==========================================
// VZD 数据导入 - 领域模型层
// ==========================================
// 职责: 定义类型、数据集声明、导入报告
// 红线: 不含数据访问逻辑,不含导入流程
// ==========================================

pub mod dataset;
pub mod report;
pub mod types;

// 重导出核心类型
pub use dataset::{Column, FlatDataset, Flattening, Postprocess, XmlDataset, XmlField};
pub use report::{ImportMode, ImportSummary, RunReport};
pub use types::{ColumnType, FieldValue, GeoPoint, Row, SRID_WGS84};
