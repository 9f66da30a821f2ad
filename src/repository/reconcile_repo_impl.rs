// ==========================================
// VZD 数据导入 - 对账仓储 SQLite 实现
// ==========================================
// 职责: 实现对账所需数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 值一律参数化；表名/列名来自静态数据集声明
// ==========================================
// 说明:
// - 事务以显式 BEGIN/COMMIT/ROLLBACK 控制，便于导入中途检查点提交
// - 几何列存 EWKT 文本，空间索引退化为普通索引
// - 物化视图以 `<view>` 表 + `<view>_source` 视图模拟
// ==========================================

use crate::domain::{FieldValue, GeoPoint, Row};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::reconcile_repo::{ReconcileRepository, ViewRefresh};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// 几何列名
pub const GEOMETRY_COLUMN: &str = "geom";

/// 对账标记列名
pub const MARKER_COLUMN: &str = "updated";

/// 键列的空值安全表达式列表: `IFNULL(col, '')`
///
/// 层级表的唯一索引与 upsert 冲突目标必须使用同一表达式。
pub fn null_safe_key(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|c| format!("IFNULL({c}, '')"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ==========================================
// SqliteReconcileRepository
// ==========================================
pub struct SqliteReconcileRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReconcileRepository {
    /// 创建新的对账仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn object_exists(conn: &Connection, kind: &str, name: &str) -> RepositoryResult<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2 LIMIT 1",
                params![kind, name],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(found)
    }

    fn placeholders(count: usize) -> String {
        (1..=count)
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn excluded_assignments<'a>(columns: impl Iterator<Item = &'a str>) -> String {
        columns
            .map(|c| format!("{c} = excluded.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// 构造带标记列的 upsert 语句
    fn marked_upsert_sql(table: &str, key_column: &str, columns: &[&str]) -> String {
        format!(
            "INSERT INTO {table} ({cols}, {marker}) VALUES ({ph}, 1) \
             ON CONFLICT ({key_column}) DO UPDATE SET {sets}, {marker} = 1",
            cols = columns.join(", "),
            marker = MARKER_COLUMN,
            ph = Self::placeholders(columns.len()),
            sets = Self::excluded_assignments(columns.iter().copied()),
        )
    }

    /// 构造业务键冲突覆盖语句（冲突目标为空值安全的键索引）
    fn upsert_sql(table: &str, key_columns: &[&str], columns: &[&str]) -> String {
        format!(
            "INSERT INTO {table} ({cols}) VALUES ({ph}) \
             ON CONFLICT ({keys}) DO UPDATE SET {sets}",
            cols = columns.join(", "),
            ph = Self::placeholders(columns.len()),
            keys = null_safe_key(key_columns),
            sets = Self::excluded_assignments(columns.iter().copied()),
        )
    }
}

impl ReconcileRepository for SqliteReconcileRepository {
    fn begin(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch("BEGIN")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn commit(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch("COMMIT")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn rollback(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        if conn.is_autocommit() {
            return Ok(());
        }
        conn.execute_batch("ROLLBACK")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn in_transaction(&self) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Ok(!conn.is_autocommit())
    }

    fn checkpoint(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        if conn.is_autocommit() {
            return Ok(());
        }
        conn.execute_batch("COMMIT; BEGIN")
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    fn mark_all_stale(&self, table: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let sql = format!("UPDATE {table} SET {MARKER_COLUMN} = 0");
        conn.execute(&sql, [])
            .map_err(|e| RepositoryError::statement(&sql, e))
    }

    fn upsert_marked(
        &self,
        table: &str,
        key_column: &str,
        row: &Row,
        geometry: Option<GeoPoint>,
    ) -> RepositoryResult<()> {
        if row.is_empty() {
            return Err(RepositoryError::EmptyRow(table.to_string()));
        }

        let mut columns: Vec<&str> = row.columns().collect();
        let mut values: Vec<FieldValue> = row.values().cloned().collect();
        if let Some(point) = geometry {
            columns.push(GEOMETRY_COLUMN);
            values.push(FieldValue::Text(point.to_ewkt()));
        }

        let sql = Self::marked_upsert_sql(table, key_column, &columns);
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| RepositoryError::statement(&sql, e))?;
        stmt.execute(params_from_iter(values.iter()))
            .map_err(|e| RepositoryError::statement(&sql, e))?;
        Ok(())
    }

    fn sweep_stale(&self, table: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let sql = format!("DELETE FROM {table} WHERE {MARKER_COLUMN} = 0");
        conn.execute(&sql, [])
            .map_err(|e| RepositoryError::statement(&sql, e))
    }

    fn drop_index(&self, index: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let sql = format!("DROP INDEX IF EXISTS {index}");
        conn.execute_batch(&sql)
            .map_err(|e| RepositoryError::statement(&sql, e))
    }

    fn create_spatial_index(
        &self,
        index: &str,
        table: &str,
        column: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let sql = format!("CREATE INDEX IF NOT EXISTS {index} ON {table} ({column})");
        conn.execute_batch(&sql)
            .map_err(|e| RepositoryError::statement(&sql, e))
    }

    fn refresh_materialized_view(&self, view: &str) -> RepositoryResult<ViewRefresh> {
        let conn = self.get_conn()?;
        let source = format!("{view}_source");
        if !Self::object_exists(&conn, "table", view)?
            || !Self::object_exists(&conn, "view", &source)?
        {
            return Ok(ViewRefresh::Absent);
        }

        let sql = format!(
            "SAVEPOINT refresh_view; \
             DELETE FROM {view}; \
             INSERT INTO {view} SELECT * FROM {source}; \
             RELEASE refresh_view;"
        );
        if let Err(e) = conn.execute_batch(&sql) {
            debug!(view = %view, error = %e, "视图刷新失败，回退保存点");
            // 保存点可能未建立，回退失败不覆盖原始错误
            if let Err(rollback_err) =
                conn.execute_batch("ROLLBACK TO refresh_view; RELEASE refresh_view;")
            {
                debug!(
                    view = %view,
                    error = %rollback_err,
                    in_transaction = !conn.is_autocommit(),
                    "保存点回退失败"
                );
            }
            return Err(RepositoryError::statement(&sql, e));
        }
        Ok(ViewRefresh::Refreshed)
    }

    fn upsert(&self, table: &str, key_columns: &[&str], row: &Row) -> RepositoryResult<()> {
        if row.is_empty() {
            return Err(RepositoryError::EmptyRow(table.to_string()));
        }

        let columns: Vec<&str> = row.columns().collect();
        let sql = Self::upsert_sql(table, key_columns, &columns);
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| RepositoryError::statement(&sql, e))?;
        stmt.execute(params_from_iter(row.values()))
            .map_err(|e| RepositoryError::statement(&sql, e))?;
        Ok(())
    }

    fn insert_or_ignore(&self, table: &str, row: &Row) -> RepositoryResult<()> {
        if row.is_empty() {
            return Err(RepositoryError::EmptyRow(table.to_string()));
        }

        let columns: Vec<&str> = row.columns().collect();
        let sql = format!(
            "INSERT OR IGNORE INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            Self::placeholders(columns.len())
        );
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| RepositoryError::statement(&sql, e))?;
        stmt.execute(params_from_iter(row.values()))
            .map_err(|e| RepositoryError::statement(&sql, e))?;
        Ok(())
    }

    fn load_lookup(&self, table: &str) -> RepositoryResult<HashMap<String, i64>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT id, description FROM {table}");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| RepositoryError::statement(&sql, e))?;

        let entries = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(entries)
    }

    fn find_lookup_id(&self, table: &str, description: &str) -> RepositoryResult<Option<i64>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT id FROM {table} WHERE description = ?1");
        let id = conn
            .query_row(&sql, params![description], |row| row.get::<_, i64>(0))
            .optional()
            .map_err(|e| RepositoryError::statement(&sql, e))?;
        Ok(id)
    }

    fn insert_lookup(&self, table: &str, description: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let sql = format!("INSERT INTO {table} (description) VALUES (?1)");
        conn.execute(&sql, params![description])
            .map_err(|e| RepositoryError::statement(&sql, e))?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_repo() -> (Arc<Mutex<Connection>>, SqliteReconcileRepository) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE places (
                code TEXT PRIMARY KEY,
                name TEXT,
                geom TEXT,
                updated BOOLEAN NOT NULL DEFAULT 0
            );
            CREATE TABLE statuses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL UNIQUE
            );
            CREATE TABLE parcels (
                nr TEXT,
                kind TEXT,
                value INTEGER
            );
            CREATE UNIQUE INDEX parcels_key_idx ON parcels (IFNULL(nr, ''), IFNULL(kind, ''));
            "#,
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let repo = SqliteReconcileRepository::new(conn.clone());
        (conn, repo)
    }

    fn place(code: &str, name: &str) -> Row {
        Row::new()
            .with("code", FieldValue::Text(code.to_string()))
            .with("name", FieldValue::Text(name.to_string()))
    }

    #[test]
    fn test_upsert_marked_overwrites_on_conflict() {
        let (conn, repo) = setup_repo();

        repo.upsert_marked("places", "code", &place("A", "old"), None)
            .unwrap();
        repo.mark_all_stale("places").unwrap();
        let point = GeoPoint { lng: 24.1, lat: 56.9 };
        repo.upsert_marked("places", "code", &place("A", "new"), Some(point))
            .unwrap();

        let conn = conn.lock().unwrap();
        let (name, geom, updated): (String, String, bool) = conn
            .query_row("SELECT name, geom, updated FROM places WHERE code = 'A'", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(name, "new");
        assert_eq!(geom, "SRID=4326;POINT(24.1 56.9)");
        assert!(updated);
    }

    #[test]
    fn test_upsert_with_null_key_overwrites() {
        let (conn, repo) = setup_repo();
        let keys = ["nr", "kind"];
        let parcel = |kind: FieldValue, value: i64| {
            Row::new()
                .with("nr", FieldValue::Text("0100".to_string()))
                .with("kind", kind)
                .with("value", FieldValue::Int(value))
        };

        repo.upsert("parcels", &keys, &parcel(FieldValue::Null, 1)).unwrap();
        repo.upsert("parcels", &keys, &parcel(FieldValue::Null, 2)).unwrap();
        repo.upsert("parcels", &keys, &parcel(FieldValue::Text("LAND".to_string()), 3))
            .unwrap();
        repo.upsert("parcels", &keys, &parcel(FieldValue::Text("LAND".to_string()), 4))
            .unwrap();

        let conn = conn.lock().unwrap();
        let rows: Vec<(Option<String>, i64)> = conn
            .prepare("SELECT kind, value FROM parcels ORDER BY kind")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows, vec![(None, 2), (Some("LAND".to_string()), 4)]);
    }

    #[test]
    fn test_null_safe_key_expression() {
        assert_eq!(null_safe_key(&["a", "b"]), "IFNULL(a, ''), IFNULL(b, '')");
    }

    #[test]
    fn test_sweep_removes_only_stale_rows() {
        let (conn, repo) = setup_repo();

        repo.upsert_marked("places", "code", &place("A", "a"), None)
            .unwrap();
        repo.upsert_marked("places", "code", &place("B", "b"), None)
            .unwrap();
        repo.mark_all_stale("places").unwrap();
        repo.upsert_marked("places", "code", &place("A", "a"), None)
            .unwrap();

        assert_eq!(repo.sweep_stale("places").unwrap(), 1);
        let conn = conn.lock().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM places", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_statement_failure_carries_sql() {
        let (_conn, repo) = setup_repo();
        let row = Row::new().with("missing_column", FieldValue::Int(1));

        let err = repo
            .upsert_marked("places", "code", &row, None)
            .unwrap_err();
        match err {
            RepositoryError::StatementFailed { sql, .. } => {
                assert!(sql.contains("INSERT INTO places"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_lookup_insert_duplicate_is_unique_violation() {
        let (_conn, repo) = setup_repo();

        let id = repo.insert_lookup("statuses", "Īpašums").unwrap();
        assert_eq!(repo.find_lookup_id("statuses", "Īpašums").unwrap(), Some(id));

        let err = repo.insert_lookup("statuses", "Īpašums").unwrap_err();
        assert!(err.is_unique_violation());

        let all = repo.load_lookup("statuses").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("Īpašums"), Some(&id));
    }

    #[test]
    fn test_transaction_and_checkpoint() {
        let (conn, repo) = setup_repo();

        assert!(!repo.in_transaction().unwrap());
        repo.begin().unwrap();
        assert!(repo.in_transaction().unwrap());
        repo.upsert_marked("places", "code", &place("A", "a"), None)
            .unwrap();
        repo.checkpoint().unwrap();
        assert!(repo.in_transaction().unwrap());
        repo.upsert_marked("places", "code", &place("B", "b"), None)
            .unwrap();
        repo.rollback().unwrap();
        assert!(!repo.in_transaction().unwrap());

        let conn = conn.lock().unwrap();
        let codes: Vec<String> = conn
            .prepare("SELECT code FROM places ORDER BY code")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(codes, vec!["A".to_string()]);
    }

    #[test]
    fn test_refresh_view_absent_and_present() {
        let (conn, repo) = setup_repo();
        assert_eq!(
            repo.refresh_materialized_view("place_names").unwrap(),
            ViewRefresh::Absent
        );

        conn.lock()
            .unwrap()
            .execute_batch(
                r#"
                CREATE TABLE place_names (code TEXT, name TEXT);
                CREATE VIEW place_names_source AS SELECT code, name FROM places;
                "#,
            )
            .unwrap();
        repo.upsert_marked("places", "code", &place("A", "a"), None)
            .unwrap();

        assert_eq!(
            repo.refresh_materialized_view("place_names").unwrap(),
            ViewRefresh::Refreshed
        );
        let count: i64 = conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM place_names", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
