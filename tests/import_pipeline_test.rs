// ==========================================
// 品类导入管道集成测试
// ==========================================
// 测试目标: 上传 CSV → 校验 → Upsert → 键索引 / 批次记录
// ==========================================


use catalog_portal::api::{error_code, ApiError};
use catalog_portal::config::config_keys;
use catalog_portal::domain::{CellValue, FailureReason};
use catalog_portal::logging;
use test_helpers::{cable_csv, cable_descriptor, create_test_state, light_descriptor};

#[tokio::test]
async fn test_import_reports_row_level_failures() {
    logging::init_test();
    let (_tmp, _db_path, state) = create_test_state(&[cable_descriptor()]).unwrap();

    let report = state
        .import_api
        .import_csv("cable", b"part_number,length_mm\nCBL-001,500\nCBL-002,abc".to_vec())
        .await
        .unwrap();

    assert_eq!(report.category, "cable");
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.failed.len(), 1);

    let failure = &report.failed[0];
    assert_eq!(failure.row, 2);
    assert_eq!(failure.column.as_deref(), Some("length_mm"));
    assert_eq!(failure.raw_value.as_deref(), Some("abc"));
    assert_eq!(failure.reason, FailureReason::NotNumeric);

    let json = serde_json::to_value(failure).unwrap();
    assert_eq!(json["reason"], "not numeric");
    assert_eq!(json["row"], 2);

    // 失败行不落库，成功行可按编号解析
    assert!(state.catalog_api.resolve("CBL-002").await.unwrap().is_none());
    let resolved = state.catalog_api.resolve("CBL-001").await.unwrap().unwrap();
    assert_eq!(
        resolved.record.fields.get("length_mm"),
        Some(&CellValue::Number(500.0))
    );
}

#[tokio::test]
async fn test_reimport_identical_file_is_idempotent() {
    let (_tmp, _db_path, state) = create_test_state(&[cable_descriptor()]).unwrap();

    let first = state.import_api.import_csv("cable", cable_csv(3)).await.unwrap();
    assert_eq!((first.inserted, first.updated, first.unchanged), (3, 0, 0));

    let second = state.import_api.import_csv("cable", cable_csv(3)).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 3);
    assert_eq!(second.unchanged, 3);
    assert!(second.failed.is_empty());

    let batches = state
        .import_api
        .list_recent_batches(Some("cable".to_string()), 10)
        .await
        .unwrap();
    assert_eq!(batches.len(), 2);
    assert!(batches.iter().all(|b| b.category == "cable"));
}

#[tokio::test]
async fn test_reimport_overwrites_full_row() {
    let (_tmp, _db_path, state) = create_test_state(&[light_descriptor()]).unwrap();

    state
        .import_api
        .import_csv(
            "light",
            b"Part Number,Name,Color,Wattage\nLGT-1,Ring Light,White,12\n".to_vec(),
        )
        .await
        .unwrap();
    let report = state
        .import_api
        .import_csv("light", b"Part Number,Name,Color,Wattage\nLGT-1,Ring Light,,\n".to_vec())
        .await
        .unwrap();
    assert_eq!((report.inserted, report.updated, report.unchanged), (0, 1, 0));

    let record = state
        .catalog_api
        .resolve("LGT-1")
        .await
        .unwrap()
        .unwrap()
        .record;
    // 整行覆盖: 空单元格清空旧值，而不是保留
    assert_eq!(record.fields.get("color"), Some(&CellValue::Null));
    assert!(!record.specifications.contains_key("wattage"));
}

#[tokio::test]
async fn test_batch_import_runs_categories_concurrently() {
    let (_tmp, _db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();

    let items = state
        .import_api
        .batch_import(vec![
            ("cable".to_string(), cable_csv(20)),
            (
                "light".to_string(),
                b"Part Number,Name,Color,Wattage\nLGT-1,Ring,White,12\nLGT-2,Bar,Red,8\n".to_vec(),
            ),
            ("drone".to_string(), b"part_number\nX-1\n".to_vec()),
        ])
        .await
        .unwrap();

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].category, "cable");
    assert_eq!(items[0].report.as_ref().unwrap().inserted, 20);
    assert_eq!(items[1].report.as_ref().unwrap().inserted, 2);
    assert!(items[2].report.is_none());
    assert_eq!(items[2].error.as_ref().unwrap().code, "NOT_FOUND");

    assert_eq!(state.key_index.len(), 22);
}

#[tokio::test]
async fn test_row_limit_rejects_whole_file_before_writes() {
    let (_tmp, _db_path, state) = create_test_state(&[cable_descriptor()]).unwrap();
    state
        .config_manager
        .update_config(config_keys::IMPORT_MAX_ROWS, "2")
        .unwrap();

    let err = state
        .import_api
        .import_csv("cable", cable_csv(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
    assert!(state.catalog_api.resolve("CBL-001").await.unwrap().is_none());

    // 未超限时正常导入
    let report = state.import_api.import_csv("cable", cable_csv(2)).await.unwrap();
    assert_eq!(report.inserted, 2);
}

#[tokio::test]
async fn test_file_size_limit() {
    let (_tmp, _db_path, state) = create_test_state(&[cable_descriptor()]).unwrap();
    state
        .config_manager
        .update_config(config_keys::IMPORT_MAX_FILE_BYTES, "16")
        .unwrap();

    let err = state
        .import_api
        .import_csv("cable", cable_csv(5))
        .await
        .unwrap_err();
    assert_eq!(error_code(&err), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_structural_errors() {
    let (_tmp, _db_path, state) = create_test_state(&[cable_descriptor()]).unwrap();

    // 未知品类
    let err = state
        .import_api
        .import_csv("drone", b"part_number\nX-1\n".to_vec())
        .await
        .unwrap_err();
    assert_eq!(error_code(&err), "NOT_FOUND");

    // 表头字段数不符
    let err = state
        .import_api
        .import_csv("cable", b"part_number,length_mm,extra\nCBL-001,1,2\n".to_vec())
        .await
        .unwrap_err();
    assert_eq!(error_code(&err), "VALIDATION_ERROR");

    // 空文件
    let err = state
        .import_api
        .import_csv("cable", Vec::new())
        .await
        .unwrap_err();
    assert_eq!(error_code(&err), "VALIDATION_ERROR");

    // 整文件失败不记录批次
    let batches = state.import_api.list_recent_batches(None, 10).await.unwrap();
    assert!(batches.is_empty());
}

#[tokio::test]
async fn test_missing_key_and_short_rows_are_reported() {
    let (_tmp, _db_path, state) = create_test_state(&[cable_descriptor()]).unwrap();

    let report = state
        .import_api
        .import_csv(
            "cable",
            b"part_number,length_mm\n,100\nCBL-009\nCBL-010,250\n".to_vec(),
        )
        .await
        .unwrap();

    assert_eq!(report.inserted, 1);
    let reasons: Vec<(usize, FailureReason)> =
        report.failed.iter().map(|f| (f.row, f.reason)).collect();
    assert_eq!(
        reasons,
        vec![
            (1, FailureReason::MissingNaturalKey),
            (2, FailureReason::WrongFieldCount)
        ]
    );
}
