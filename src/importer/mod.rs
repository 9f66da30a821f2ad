// ==========================================
// VZD 数据导入 - 导入层
// ==========================================
// 职责: 源文件解码、数据集分派、对账/层级导入
// 支持: CSV（`;` 分隔，`#` 引号）, XML FullData
// ==========================================

// 模块声明
pub mod dispatcher;
pub mod error;
pub mod field_coercer;
pub mod file_parser;
pub mod flat_importer;
pub mod hierarchical_importer;
pub mod importer_trait;
pub mod lookup_cache;
pub mod schema_registry;
pub mod xml_tree;

// 重导出核心类型
pub use dispatcher::{select_importer, ImporterKind};
pub use error::{ImportError, ImportResult};
pub use field_coercer::FieldCoercer;
pub use file_parser::VzdCsvReader;
pub use flat_importer::FlatFileImporter;
pub use hierarchical_importer::HierarchicalImporter;
pub use importer_trait::DatasetImporter;
pub use lookup_cache::LookupCache;
pub use xml_tree::{ItemStream, XmlNode};
