// ==========================================
// VZD 数据导入 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 按数据集注册表生成目标表/字典表/索引（幂等）
// ==========================================
// 说明: 物化视图 aw_full_addresses 属于外部对象，不在此创建；
//       缺失时刷新结果为 ViewRefresh::Absent
// ==========================================

use crate::domain::{FlatDataset, Flattening, XmlDataset};
use crate::importer::schema_registry::{FLAT_DATASETS, XML_DATASETS};
use crate::repository::reconcile_repo_impl::{null_safe_key, GEOMETRY_COLUMN, MARKER_COLUMN};
use rusqlite::Connection;
use std::time::Duration;
use tracing::debug;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 平面数据集建表语句（首列唯一，附几何列与对账标记列）
pub fn flat_table_ddl(dataset: &FlatDataset) -> String {
    let mut columns: Vec<String> = dataset
        .columns
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            if idx == 0 {
                format!("{} {} NOT NULL UNIQUE", c.name, c.ty.sql_type())
            } else {
                format!("{} {}", c.name, c.ty.sql_type())
            }
        })
        .collect();
    if dataset.has_geometry {
        columns.push(format!("{} TEXT", GEOMETRY_COLUMN));
    }
    columns.push(format!("{} BOOLEAN NOT NULL DEFAULT 0", MARKER_COLUMN));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        dataset.table,
        columns.join(",\n    ")
    )
}

/// 层级数据集建表语句（业务键唯一性由 `xml_key_index_ddl` 保证）
pub fn xml_table_ddl(dataset: &XmlDataset) -> String {
    let mut columns: Vec<String> = vec![
        "cadastre_nr TEXT".to_string(),
        "object_type TEXT".to_string(),
    ];
    match dataset.flattening {
        Flattening::Single { fields } | Flattening::Marks { fields, .. } => {
            columns.extend(
                fields
                    .iter()
                    .map(|f| format!("{} {}", f.column, f.ty.sql_type())),
            );
        }
        Flattening::Ownerships {
            status_table,
            person_status_table,
            ..
        } => {
            columns.push(format!(
                "ownership_status_id INTEGER REFERENCES {}(id)",
                status_table
            ));
            columns.push(format!(
                "person_status_id INTEGER REFERENCES {}(id)",
                person_status_table
            ));
        }
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        dataset.table,
        columns.join(",\n    ")
    )
}

/// 层级数据集业务键唯一索引（键列的 NULL 按空串参与唯一性比较）
pub fn xml_key_index_ddl(dataset: &XmlDataset) -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({});",
        dataset.key_index(),
        dataset.table,
        null_safe_key(dataset.key_columns)
    )
}

/// 字典表建表语句
pub fn lookup_table_ddl(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    description TEXT NOT NULL UNIQUE\n);",
        table
    )
}

/// 创建全部已注册的表与索引（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    for dataset in FLAT_DATASETS.iter() {
        conn.execute_batch(&flat_table_ddl(dataset))?;
        if dataset.has_geometry {
            conn.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                dataset.geometry_index(),
                dataset.table,
                GEOMETRY_COLUMN
            ))?;
        }
    }

    for dataset in XML_DATASETS.iter() {
        for table in dataset.lookup_tables() {
            conn.execute_batch(&lookup_table_ddl(table))?;
        }
        if let Flattening::Marks { lookup_table, .. } = dataset.flattening {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    mark_type TEXT PRIMARY KEY,\n    description TEXT\n);",
                lookup_table
            ))?;
        }
        conn.execute_batch(&xml_table_ddl(dataset))?;
        conn.execute_batch(&xml_key_index_ddl(dataset))?;
    }

    debug!(
        flat = FLAT_DATASETS.len(),
        hierarchical = XML_DATASETS.len(),
        "数据库表结构已就绪"
    );
    Ok(())
}
