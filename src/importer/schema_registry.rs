// ==========================================
// VZD 数据导入 - 数据集注册表
// ==========================================
// 职责: 数据集标识（文件名 / XML 根标签）→ 列声明、目标表、几何与字典行为
// 红线: 列顺序 = 源文件字段顺序；首列为业务主键
// ==========================================

use crate::domain::types::ColumnType::{Bool, Date, Float, Int, String as Text};
use crate::domain::{Column, FlatDataset, Flattening, Postprocess, XmlDataset, XmlField};

// ==========================================
// 地址对象 CSV (AW_*.CSV)
// ==========================================

pub static CITIES: FlatDataset = FlatDataset {
    file_name: "aw_pilseta.csv",
    table: "aw_pilseta",
    columns: &[
        Column::new("code", Int),
        Column::new("type", Int),
        Column::new("name", Text),
        Column::new("parent_code", Int),
        Column::new("parent_type", Int),
        Column::new("approved", Bool),
        Column::new("approve_degree", Int),
        Column::new("status", Text),
        Column::new("sort_name", Text),
        Column::new("created_at", Date),
        Column::new("modified_at", Date),
        Column::new("deleted_at", Date),
        Column::new("atvk", Bool),
        Column::new("full_name", Text),
    ],
    has_geometry: false,
    postprocess: Postprocess::None,
};

pub static COUNTIES: FlatDataset = FlatDataset {
    file_name: "aw_novads.csv",
    table: "aw_novads",
    columns: &[
        Column::new("code", Int),
        Column::new("type", Int),
        Column::new("name", Text),
        Column::new("parent_code", Int),
        Column::new("parent_type", Int),
        Column::new("approved", Bool),
        Column::new("approve_degree", Int),
        Column::new("status", Text),
        Column::new("sort_name", Text),
        Column::new("created_at", Date),
        Column::new("modified_at", Date),
        Column::new("deleted_at", Date),
        Column::new("atvk", Bool),
        Column::new("full_name", Text),
    ],
    has_geometry: false,
    postprocess: Postprocess::None,
};

pub static VILLAGES: FlatDataset = FlatDataset {
    file_name: "aw_ciems.csv",
    table: "aw_ciems",
    columns: &[
        Column::new("code", Int),
        Column::new("type", Int),
        Column::new("name", Text),
        Column::new("parent_code", Int),
        Column::new("parent_type", Int),
        Column::new("approved", Bool),
        Column::new("approve_degree", Int),
        Column::new("status", Text),
        Column::new("sort_name", Text),
        Column::new("created_at", Date),
        Column::new("modified_at", Date),
        Column::new("deleted_at", Date),
        Column::new("is_small", Bool),
        Column::new("full_name", Text),
    ],
    has_geometry: false,
    postprocess: Postprocess::None,
};

pub static PARISHES: FlatDataset = FlatDataset {
    file_name: "aw_pagasts.csv",
    table: "aw_pagasts",
    columns: &[
        Column::new("code", Int),
        Column::new("type", Int),
        Column::new("name", Text),
        Column::new("parent_code", Int),
        Column::new("parent_type", Int),
        Column::new("approved", Bool),
        Column::new("approve_degree", Int),
        Column::new("status", Text),
        Column::new("sort_name", Text),
        Column::new("created_at", Date),
        Column::new("modified_at", Date),
        Column::new("deleted_at", Date),
        Column::new("atvk", Text),
        Column::new("full_name", Text),
    ],
    has_geometry: false,
    postprocess: Postprocess::None,
};

pub static STREETS: FlatDataset = FlatDataset {
    file_name: "aw_iela.csv",
    table: "aw_iela",
    columns: &[
        Column::new("code", Int),
        Column::new("type", Int),
        Column::new("name", Text),
        Column::new("parent_code", Int),
        Column::new("parent_type", Int),
        Column::new("approved", Bool),
        Column::new("approve_degree", Int),
        Column::new("status", Text),
        Column::new("sort_name", Text),
        Column::new("created_at", Date),
        Column::new("modified_at", Date),
        Column::new("deleted_at", Date),
        Column::new("attr", Text),
        Column::new("full_name", Text),
    ],
    has_geometry: false,
    postprocess: Postprocess::None,
};

/// 完整地址派生视图（依赖 aw_eka）
pub const FULL_ADDRESSES_VIEW: &str = "aw_full_addresses";

pub static HOUSES: FlatDataset = FlatDataset {
    file_name: "aw_eka.csv",
    table: "aw_eka",
    columns: &[
        Column::new("code", Int),
        Column::new("type", Int),
        Column::new("status", Text),
        Column::new("approved", Bool),
        Column::new("approve_degree", Int),
        Column::new("parent_code", Int),
        Column::new("parent_type", Int),
        Column::new("name", Text),
        Column::new("sort_name", Text),
        Column::new("postal_code", Text),
        Column::new("postal_office_area_code", Int),
        Column::new("created_at", Date),
        Column::new("modified_at", Date),
        Column::new("deleted_at", Date),
        Column::new("for_build", Bool),
        Column::new("planned_address", Bool),
        Column::new("full_name", Text),
        Column::new("x", Float),
        Column::new("y", Float),
        Column::new("lat", Float),
        Column::new("lng", Float),
    ],
    has_geometry: true,
    postprocess: Postprocess::RefreshMaterializedView(FULL_ADDRESSES_VIEW),
};

pub static FLAT_DATASETS: [&FlatDataset; 6] =
    [&CITIES, &COUNTIES, &VILLAGES, &PARISHES, &STREETS, &HOUSES];

// ==========================================
// 地籍 FullData XML
// ==========================================

/// 基础关系键路径
pub const CADASTRE_NR_PATH: &str = "ObjectRelation.ObjectCadastreNr";
pub const OBJECT_TYPE_PATH: &str = "ObjectRelation.ObjectType";

pub static MARKS: XmlDataset = XmlDataset {
    name: "Mark",
    table: "vzd_marks",
    key_columns: &["cadastre_nr", "object_type", "mark_type"],
    flattening: Flattening::Marks {
        entries_path: "MarkList.Mark",
        fields: &[
            XmlField::new("mark_type", "MarkType", Text),
            XmlField::new("date", "MarkDate", Date),
        ],
        type_path: "MarkType",
        description_path: "MarkDescription",
        lookup_table: "mark_types",
    },
};

pub static VALUATIONS: XmlDataset = XmlDataset {
    name: "Valuation",
    table: "vzd_valuations",
    key_columns: &["cadastre_nr", "object_type"],
    flattening: Flattening::Single {
        fields: &[
            XmlField::new("cadastral_value", "CadastralValue", Int),
            XmlField::new("value_date", "CadastralValueDate", Date),
            XmlField::new("land_value", "ValueParts.LandValue", Int),
            XmlField::new("building_value", "ValueParts.BuildingValue", Int),
        ],
    },
};

pub static ADDRESSES: XmlDataset = XmlDataset {
    name: "Address",
    table: "vzd_addresses",
    key_columns: &["cadastre_nr", "object_type"],
    flattening: Flattening::Single {
        fields: &[
            XmlField::new("address_code", "AddressData.ARCode", Int),
            XmlField::new("address", "AddressData.Address", Text),
            XmlField::new("postal_code", "AddressData.PostIndex", Text),
        ],
    },
};

pub static OWNERSHIPS: XmlDataset = XmlDataset {
    name: "Ownership",
    table: "vzd_ownerships",
    key_columns: &[
        "cadastre_nr",
        "object_type",
        "ownership_status_id",
        "person_status_id",
    ],
    flattening: Flattening::Ownerships {
        entries_path: "OwnershipStatusKindList.OwnershipStatusKind",
        status_path: "OwnershipStatus",
        person_status_path: "PersonStatus",
        status_table: "ownership_statuses",
        person_status_table: "person_statuses",
    },
};

pub static XML_DATASETS: [&XmlDataset; 4] = [&MARKS, &VALUATIONS, &ADDRESSES, &OWNERSHIPS];

// ==========================================
// 查询
// ==========================================

/// 按小写文件名查找 CSV 数据集
pub fn flat_dataset_for(file_name: &str) -> Option<&'static FlatDataset> {
    let lowered = file_name.to_lowercase();
    FLAT_DATASETS
        .iter()
        .copied()
        .find(|d| d.file_name == lowered)
}

/// 按根标签（已去命名空间）查找 XML 数据集
pub fn xml_dataset_for(root_tag: &str) -> Option<&'static XmlDataset> {
    XML_DATASETS
        .iter()
        .copied()
        .find(|d| d.root_tag() == root_tag)
}
