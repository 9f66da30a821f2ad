// ==========================================
// VZD 数据导入 - 字典表缓存
// ==========================================
// 规则: 先查本地缓存 → 未命中则插入 → 唯一约束冲突时重读一次
// 红线: 同一次运行内每个描述至多一个代理键
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::repository::ReconcileRepository;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct LookupCache {
    table: &'static str,
    ids: HashMap<String, i64>,
}

impl LookupCache {
    /// 从存储层一次性加载整张字典表
    pub fn load<R: ReconcileRepository + ?Sized>(
        repo: &R,
        table: &'static str,
    ) -> ImportResult<Self> {
        let ids = repo.load_lookup(table)?;
        debug!(table = %table, entries = ids.len(), "字典表已加载");
        Ok(Self { table, ids })
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 描述 → 代理键
    pub fn resolve<R: ReconcileRepository + ?Sized>(
        &mut self,
        repo: &R,
        description: &str,
    ) -> ImportResult<i64> {
        if let Some(id) = self.ids.get(description) {
            return Ok(*id);
        }

        let id = match repo.insert_lookup(self.table, description) {
            Ok(id) => id,
            Err(e) if e.is_unique_violation() => {
                warn!(table = %self.table, description = %description, "字典表插入冲突，重读");
                repo.find_lookup_id(self.table, description)?
                    .ok_or_else(|| ImportError::LookupUnresolved {
                        table: self.table.to_string(),
                        description: description.to_string(),
                    })?
            }
            Err(e) => return Err(e.into()),
        };

        debug!(table = %self.table, description = %description, id, "新增字典项");
        self.ids.insert(description.to_string(), id);
        Ok(id)
    }
}
