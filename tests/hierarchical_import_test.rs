// ==========================================
// 集成测试 - 层级记录导入 (XML FullData)
// ==========================================
// 测试目标: 展开规则、字典去重、标记类型不覆盖、孤立记录、检查点
// 覆盖范围: HierarchicalImporter + LookupCache + SqliteReconcileRepository
// ==========================================


use std::path::Path;
use test_helpers::*;
use vzd_import::domain::XmlDataset;
use vzd_import::importer::schema_registry::{MARKS, OWNERSHIPS, VALUATIONS};
use vzd_import::importer::{DatasetImporter, HierarchicalImporter};
use vzd_import::repository::ReconcileRepository;
use vzd_import::{logging, AppState, ImportSummary};

// ==========================================
// 测试辅助函数
// ==========================================

fn import(state: &AppState, dataset: &'static XmlDataset, path: &Path) -> ImportSummary {
    let repo = state.repo.as_ref();
    repo.begin().unwrap();
    let summary = HierarchicalImporter::new(repo, dataset, path)
        .unwrap()
        .process()
        .unwrap();
    repo.commit().unwrap();
    summary
}

fn relation(cadastre_nr: &str) -> String {
    format!(
        "<ObjectRelation><ObjectCadastreNr>{}</ObjectCadastreNr><ObjectType>LAND</ObjectType></ObjectRelation>",
        cadastre_nr
    )
}

fn document(name: &str, items: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<{name}FullData xmlns="urn:vzd:{name}">
  <{name}ItemList>
    {items}
  </{name}ItemList>
</{name}FullData>
"#,
        name = name,
        items = items.join("\n    ")
    )
}

fn ownership_item(cadastre_nr: &str, entries: &[(&str, &str)]) -> String {
    let kinds: String = entries
        .iter()
        .map(|(status, person)| {
            format!(
                "<OwnershipStatusKind><OwnershipStatus>{}</OwnershipStatus><PersonStatus>{}</PersonStatus></OwnershipStatusKind>",
                status, person
            )
        })
        .collect();
    format!(
        "<OwnershipItemData>{}<OwnershipStatusKindList>{}</OwnershipStatusKindList></OwnershipItemData>",
        relation(cadastre_nr),
        kinds
    )
}

fn valuation_item(cadastre_nr: &str, value: i64) -> String {
    format!(
        "<ValuationItemData>{}<CadastralValue>{}</CadastralValue><CadastralValueDate>2024.01.01</CadastralValueDate></ValuationItemData>",
        relation(cadastre_nr),
        value
    )
}

// ==========================================
// 测试用例
// ==========================================

#[test]
fn test_ownership_lookup_dedup_across_run() {
    logging::init_test();
    let (dir, state) = create_test_state();

    let path = write_text(
        dir.path(),
        "ownership.xml",
        &document(
            "Ownership",
            &[
                ownership_item("0100", &[("Īpašums", "Fiziska persona")]),
                ownership_item("0200", &[("Īpašums", "Juridiska persona")]),
            ],
        ),
    );

    let summary = import(&state, &OWNERSHIPS, &path);
    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.rows_written, 2);

    assert_eq!(count_rows(&state.conn, "ownership_statuses"), 1);
    assert_eq!(count_rows(&state.conn, "person_statuses"), 2);

    let distinct_ids: i64 = state
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT COUNT(DISTINCT ownership_status_id) FROM vzd_ownerships",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(distinct_ids, 1);

    // 第二次运行: 预加载字典，不再新增
    import(&state, &OWNERSHIPS, &path);
    assert_eq!(count_rows(&state.conn, "ownership_statuses"), 1);
    assert_eq!(count_rows(&state.conn, "vzd_ownerships"), 2);
}

#[test]
fn test_marks_keep_existing_type_description() {
    logging::init_test();
    let (dir, state) = create_test_state();

    state
        .conn
        .lock()
        .unwrap()
        .execute(
            "INSERT INTO mark_types (mark_type, description) VALUES ('A1', 'Sākotnējais apraksts')",
            [],
        )
        .unwrap();

    let item = format!(
        "<MarkItemData>{}<MarkList>\
           <Mark><MarkType>A1</MarkType><MarkDate>03.02.2020</MarkDate><MarkDescription>Cits apraksts</MarkDescription></Mark>\
           <Mark><MarkType>B2</MarkType><MarkDescription>Ceļa servitūts</MarkDescription></Mark>\
         </MarkList></MarkItemData>",
        relation("0100")
    );
    let path = write_text(dir.path(), "marks.xml", &document("Mark", &[item]));

    let summary = import(&state, &MARKS, &path);
    assert_eq!(summary.rows_written, 2);

    let conn = state.conn.lock().unwrap();
    let description: String = conn
        .query_row(
            "SELECT description FROM mark_types WHERE mark_type = 'A1'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(description, "Sākotnējais apraksts");

    let date: String = conn
        .query_row(
            "SELECT date FROM vzd_marks WHERE cadastre_nr = '0100' AND mark_type = 'A1'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(date, "2020-02-03");

    let types: i64 = conn
        .query_row("SELECT COUNT(*) FROM mark_types", [], |r| r.get(0))
        .unwrap();
    assert_eq!(types, 2);
}

#[test]
fn test_valuation_upsert_overwrites_by_key() {
    logging::init_test();
    let (dir, state) = create_test_state();

    let first = write_text(
        dir.path(),
        "valuation.xml",
        &document("Valuation", &[valuation_item("0100", 1000)]),
    );
    import(&state, &VALUATIONS, &first);

    let second = write_text(
        dir.path(),
        "valuation.xml",
        &document(
            "Valuation",
            &[valuation_item("0100", 2500), valuation_item("0200", 700)],
        ),
    );
    let summary = import(&state, &VALUATIONS, &second);
    assert_eq!(summary.rows_swept, 0);

    let value: i64 = state
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT cadastral_value FROM vzd_valuations WHERE cadastre_nr = '0100'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(value, 2500);
    assert_eq!(count_rows(&state.conn, "vzd_valuations"), 2);
}

#[test]
fn test_valuation_reimport_is_idempotent() {
    logging::init_test();
    let (dir, state) = create_test_state();

    let orphan = "<ValuationItemData><CadastralValue>10</CadastralValue></ValuationItemData>".to_string();
    let no_type = "<ValuationItemData><ObjectRelation><ObjectCadastreNr>0300</ObjectCadastreNr></ObjectRelation>\
                   <CadastralValue>30</CadastralValue></ValuationItemData>"
        .to_string();
    let path = write_text(
        dir.path(),
        "valuation.xml",
        &document("Valuation", &[valuation_item("0100", 1000), orphan, no_type]),
    );

    import(&state, &VALUATIONS, &path);
    let before = table_snapshot(&state.conn, "vzd_valuations");
    assert_eq!(before.len(), 3);

    import(&state, &VALUATIONS, &path);
    import(&state, &VALUATIONS, &path);
    assert_eq!(table_snapshot(&state.conn, "vzd_valuations"), before);
}

#[test]
fn test_marks_reimport_is_idempotent() {
    logging::init_test();
    let (dir, state) = create_test_state();

    let item = format!(
        "<MarkItemData>{}<MarkList>\
           <Mark><MarkType>A1</MarkType><MarkDate>2020.02.03</MarkDate></Mark>\
           <Mark><MarkDate>2021.03.04</MarkDate></Mark>\
         </MarkList></MarkItemData>",
        relation("0100")
    );
    let orphan = "<MarkItemData><MarkList><Mark><MarkType>B2</MarkType></Mark></MarkList></MarkItemData>"
        .to_string();
    let path = write_text(dir.path(), "marks.xml", &document("Mark", &[item, orphan]));

    import(&state, &MARKS, &path);
    let before = table_snapshot(&state.conn, "vzd_marks");
    let types_before = table_snapshot(&state.conn, "mark_types");
    assert_eq!(before.len(), 3);

    import(&state, &MARKS, &path);
    assert_eq!(table_snapshot(&state.conn, "vzd_marks"), before);
    assert_eq!(table_snapshot(&state.conn, "mark_types"), types_before);
}

#[test]
fn test_ownerships_reimport_is_idempotent() {
    logging::init_test();
    let (dir, state) = create_test_state();

    let partial = "<OwnershipItemData><ObjectRelation><ObjectCadastreNr>0200</ObjectCadastreNr>\
                   <ObjectType>LAND</ObjectType></ObjectRelation><OwnershipStatusKindList>\
                   <OwnershipStatusKind><OwnershipStatus>Īpašums</OwnershipStatus></OwnershipStatusKind>\
                   <OwnershipStatusKind><PersonStatus>Fiziska persona</PersonStatus></OwnershipStatusKind>\
                   </OwnershipStatusKindList></OwnershipItemData>"
        .to_string();
    let path = write_text(
        dir.path(),
        "ownership.xml",
        &document(
            "Ownership",
            &[
                ownership_item("0100", &[("Īpašums", "Juridiska persona")]),
                partial,
            ],
        ),
    );

    import(&state, &OWNERSHIPS, &path);
    let before = table_snapshot(&state.conn, "vzd_ownerships");
    assert_eq!(before.len(), 3);

    import(&state, &OWNERSHIPS, &path);
    assert_eq!(table_snapshot(&state.conn, "vzd_ownerships"), before);
    assert_eq!(count_rows(&state.conn, "ownership_statuses"), 1);
    assert_eq!(count_rows(&state.conn, "person_statuses"), 2);
}

#[test]
fn test_orphan_item_is_written_with_null_relation() {
    logging::init_test();
    let (dir, state) = create_test_state();

    let orphan = "<ValuationItemData><CadastralValue>10</CadastralValue></ValuationItemData>".to_string();
    let path = write_text(dir.path(), "valuation.xml", &document("Valuation", &[orphan]));
    import(&state, &VALUATIONS, &path);

    let nulls: i64 = state
        .conn
        .lock()
        .unwrap()
        .query_row(
            "SELECT COUNT(*) FROM vzd_valuations WHERE cadastre_nr IS NULL AND object_type IS NULL",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(nulls, 1);
}

#[test]
fn test_checkpoint_keeps_transaction_open() {
    logging::init_test();
    let (dir, state) = create_test_state();

    let items: Vec<String> = (0..1_001)
        .map(|i| valuation_item(&format!("{:011}", i), i))
        .collect();
    let path = write_text(dir.path(), "valuation.xml", &document("Valuation", &items));

    let repo = state.repo.as_ref();
    repo.begin().unwrap();
    let summary = HierarchicalImporter::new(repo, &VALUATIONS, &path)
        .unwrap()
        .process()
        .unwrap();
    assert_eq!(summary.rows_read, 1_001);
    assert!(repo.in_transaction().unwrap());

    // 回滚只撤销最后一个检查点之后的条目
    repo.rollback().unwrap();
    assert_eq!(count_rows(&state.conn, "vzd_valuations"), 1_000);
}
