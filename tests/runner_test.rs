// ==========================================
// 集成测试 - 目录级导入运行
// ==========================================
// 测试目标: 数据包解压、排序遍历、未知文件跳过、only 过滤、失败中止
// 覆盖范围: ImportRunner + 分派 + 两类导入器
// ==========================================


use std::fs::File;
use std::io::Write;
use test_helpers::*;
use vzd_import::domain::ImportMode;
use vzd_import::{logging, ImportError, ImportRunner, ImportSettings};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn settings_for(dir: &std::path::Path) -> ImportSettings {
    ImportSettings {
        data_path: dir.to_path_buf(),
        skip_extract: true,
        ..ImportSettings::default()
    }
}

fn valuation_document() -> String {
    r#"<?xml version="1.0"?>
<ValuationFullData>
  <ValuationItemList>
    <ValuationItemData>
      <ObjectRelation><ObjectCadastreNr>0100</ObjectCadastreNr><ObjectType>LAND</ObjectType></ObjectRelation>
      <CadastralValue>500</CadastralValue>
    </ValuationItemData>
  </ValuationItemList>
</ValuationFullData>
"#
    .to_string()
}

#[test]
fn test_run_routes_known_files_and_skips_unknown() {
    logging::init_test();
    let (dir, state) = create_test_state();
    let data = tempfile::tempdir().unwrap();

    write_lines(
        data.path(),
        "AW_IELA.CSV",
        &[STREET_HEADER.to_string(), street_line(101, "Alfa iela")],
    );
    write_text(data.path(), "valuation_1.xml", &valuation_document());
    write_text(data.path(), "aw_dziv.csv", "#KODS#;#X#\n1;2\n");
    write_text(data.path(), "readme.txt", "nothing to import");
    write_text(data.path(), "other.xml", "<SomethingFullData/>");

    let settings = settings_for(data.path());
    let report = ImportRunner::new(state.repo.as_ref(), &settings)
        .run()
        .unwrap();

    let tables: Vec<&str> = report.files.iter().map(|f| f.table.as_str()).collect();
    assert_eq!(tables, vec!["aw_iela", "vzd_valuations"]);
    assert_eq!(report.files[0].mode, ImportMode::Reconcile);
    assert_eq!(report.files[1].mode, ImportMode::Upsert);
    assert_eq!(report.skipped, vec!["aw_dziv.csv", "other.xml", "readme.txt"]);
    assert!(report.finished_at.is_some());
    assert_eq!(report.total_written(), 2);

    assert_eq!(count_rows(&state.conn, "aw_iela"), 1);
    assert_eq!(count_rows(&state.conn, "vzd_valuations"), 1);
    drop(dir);
}

#[test]
fn test_only_filter_limits_processed_files() {
    logging::init_test();
    let (_dir, state) = create_test_state();
    let data = tempfile::tempdir().unwrap();

    write_lines(
        data.path(),
        "aw_iela.csv",
        &[STREET_HEADER.to_string(), street_line(101, "Alfa iela")],
    );
    write_text(data.path(), "valuation_1.xml", &valuation_document());

    let settings = ImportSettings {
        only: vec!["valuation_1.xml".to_string()],
        ..settings_for(data.path())
    };
    let report = ImportRunner::new(state.repo.as_ref(), &settings)
        .run()
        .unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(report.skipped, vec!["aw_iela.csv"]);
    assert_eq!(count_rows(&state.conn, "aw_iela"), 0);
}

#[test]
fn test_archive_is_extracted_before_processing() {
    logging::init_test();
    let (_dir, state) = create_test_state();
    let data = tempfile::tempdir().unwrap();

    let archive = File::create(data.path().join("aw_csv.zip")).unwrap();
    let mut zip = ZipWriter::new(archive);
    zip.start_file("AW_IELA.CSV", SimpleFileOptions::default())
        .unwrap();
    let content = format!("{}\n{}\n", STREET_HEADER, street_line(777, "Zip iela"));
    zip.write_all(content.as_bytes()).unwrap();
    zip.finish().unwrap();

    let settings = ImportSettings {
        skip_extract: false,
        ..settings_for(data.path())
    };
    let runner = ImportRunner::new(state.repo.as_ref(), &settings);
    let report = runner.run().unwrap();

    assert!(data.path().join("AW_IELA.CSV").exists());
    assert_eq!(report.files.len(), 1);
    // 数据包本身不计入跳过列表
    assert!(report.skipped.is_empty());
    assert_eq!(
        codes_and_names(&state.conn, "aw_iela"),
        vec![(777, "Zip iela".to_string())]
    );
}

#[test]
fn test_failed_file_aborts_run_and_keeps_committed_files() {
    logging::init_test();
    let (_dir, state) = create_test_state();
    let data = tempfile::tempdir().unwrap();

    // 排序: aw_iela.csv 先于 aw_pilseta.csv
    write_lines(
        data.path(),
        "aw_iela.csv",
        &[STREET_HEADER.to_string(), street_line(101, "Alfa iela")],
    );
    write_text(
        data.path(),
        "aw_pilseta.csv",
        "#KODS#;#TIPS_CD#;#NOSAUKUMS#\nnot-a-code;104;#Rīga#\n",
    );

    let settings = settings_for(data.path());
    let result = ImportRunner::new(state.repo.as_ref(), &settings).run();

    assert!(matches!(result, Err(ImportError::MalformedField { .. })));
    assert_eq!(count_rows(&state.conn, "aw_iela"), 1);
    assert_eq!(count_rows(&state.conn, "aw_pilseta"), 0);
}
