// ==========================================
// VZD 数据导入 - 数据集声明
// ==========================================
// 职责: 声明式描述每个数据集（列、目标表、几何、后处理）
// 红线: 首列即业务主键（冲突目标）
// ==========================================

use crate::domain::types::ColumnType;

// ==========================================
// 平面文件列定义
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

impl Column {
    pub const fn new(name: &'static str, ty: ColumnType) -> Self {
        Self { name, ty }
    }
}

/// 导入完成后的数据集专属后处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Postprocess {
    None,
    /// 刷新派生物化视图（不存在时记录并忽略）
    RefreshMaterializedView(&'static str),
}

// ==========================================
// 平面文件数据集 (CSV)
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct FlatDataset {
    /// 小写文件名，如 `aw_eka.csv`
    pub file_name: &'static str,
    pub table: &'static str,
    /// 按源文件位置排序的列
    pub columns: &'static [Column],
    /// 是否带 lat/lng 几何
    pub has_geometry: bool,
    pub postprocess: Postprocess,
}

impl FlatDataset {
    /// 业务主键列（首列）
    pub fn key_column(&self) -> Option<&'static str> {
        self.columns.first().map(|c| c.name)
    }

    /// 几何空间索引名
    pub fn geometry_index(&self) -> String {
        format!("{}_geom_idx", self.table)
    }
}

// ==========================================
// 层级数据集 (XML FullData)
// ==========================================

/// 深路径字段投影
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlField {
    pub column: &'static str,
    /// 点分隔的标签路径（相对于条目节点）
    pub path: &'static str,
    pub ty: ColumnType,
}

impl XmlField {
    pub const fn new(column: &'static str, path: &'static str, ty: ColumnType) -> Self {
        Self { column, path, ty }
    }
}

/// 条目 → 子表行的展开规则
#[derive(Debug, Clone, Copy)]
pub enum Flattening {
    /// 每个 `<Mark>` 一行，并维护标记类型字典
    Marks {
        entries_path: &'static str,
        fields: &'static [XmlField],
        type_path: &'static str,
        description_path: &'static str,
        lookup_table: &'static str,
    },
    /// 每个条目一行
    Single { fields: &'static [XmlField] },
    /// 每个 `<OwnershipStatusKind>` 一行，文本经字典表换成代理键
    Ownerships {
        entries_path: &'static str,
        status_path: &'static str,
        person_status_path: &'static str,
        status_table: &'static str,
        person_status_table: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct XmlDataset {
    /// 数据集名，如 `Mark`（根标签 `MarkFullData`）
    pub name: &'static str,
    pub table: &'static str,
    /// 主键列（基础关系键 + 子记录判别列）
    pub key_columns: &'static [&'static str],
    pub flattening: Flattening,
}

impl XmlDataset {
    pub fn root_tag(&self) -> String {
        format!("{}FullData", self.name)
    }

    pub fn list_tag(&self) -> String {
        format!("{}ItemList", self.name)
    }

    pub fn item_tag(&self) -> String {
        format!("{}ItemData", self.name)
    }

    /// 业务键唯一索引名
    pub fn key_index(&self) -> String {
        format!("{}_key_idx", self.table)
    }

    /// 该数据集使用的字典表（建表/预加载用）
    pub fn lookup_tables(&self) -> Vec<&'static str> {
        match self.flattening {
            Flattening::Ownerships {
                status_table,
                person_status_table,
                ..
            } => vec![status_table, person_status_table],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DEMO: XmlDataset = XmlDataset {
        name: "Mark",
        table: "vzd_marks",
        key_columns: &["cadastre_nr", "object_type", "mark_type"],
        flattening: Flattening::Single { fields: &[] },
    };

    #[test]
    fn test_xml_naming_convention() {
        assert_eq!(DEMO.root_tag(), "MarkFullData");
        assert_eq!(DEMO.list_tag(), "MarkItemList");
        assert_eq!(DEMO.item_tag(), "MarkItemData");
        assert_eq!(DEMO.key_index(), "vzd_marks_key_idx");
    }

    #[test]
    fn test_flat_key_column_is_first() {
        static COLUMNS: [Column; 2] = [
            Column::new("code", ColumnType::Int),
            Column::new("name", ColumnType::String),
        ];
        let dataset = FlatDataset {
            file_name: "demo.csv",
            table: "demo",
            columns: &COLUMNS,
            has_geometry: false,
            postprocess: Postprocess::None,
        };
        assert_eq!(dataset.key_column(), Some("code"));
        assert_eq!(dataset.geometry_index(), "demo_geom_idx");
    }
}
