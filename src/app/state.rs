// ==========================================
// VZD 数据导入 - 应用状态
// ==========================================
// 职责: 持有共享连接与对账仓储（单写入方）
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::importer::error::ImportResult;
use crate::repository::{RepositoryError, SqliteReconcileRepository};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: PathBuf,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 对账仓储
    pub repo: Arc<SqliteReconcileRepository>,
}

impl AppState {
    /// 打开数据库、应用 PRAGMA 并确保表结构存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（父目录不存在时自动创建）
    pub fn new(db_path: &Path) -> ImportResult<Self> {
        tracing::info!(db_path = %db_path.display(), "初始化AppState");

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = open_sqlite_connection(&db_path.to_string_lossy()).map_err(RepositoryError::from)?;
        ensure_schema(&conn).map_err(RepositoryError::from)?;

        Ok(Self::from_connection(db_path.to_path_buf(), conn))
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> ImportResult<Self> {
        let conn = Connection::open_in_memory().map_err(RepositoryError::from)?;
        configure_sqlite_connection(&conn).map_err(RepositoryError::from)?;
        ensure_schema(&conn).map_err(RepositoryError::from)?;

        Ok(Self::from_connection(PathBuf::from(":memory:"), conn))
    }

    fn from_connection(db_path: PathBuf, conn: Connection) -> Self {
        let conn = Arc::new(Mutex::new(conn));
        let repo = Arc::new(SqliteReconcileRepository::new(conn.clone()));
        Self { db_path, conn, repo }
    }
}
