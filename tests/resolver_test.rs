// ==========================================
// 跨品类解析集成测试
// ==========================================
// 测试目标: 按编号查找（索引命中 / 探测 / 歧义 / 外部写入的重复键 / 失效索引 / 重启预热）
// ==========================================


use catalog_portal::app::AppState;
use catalog_portal::db::open_sqlite_connection;
use catalog_portal::engine::OwnerSource;
use catalog_portal::logging;
use test_helpers::{cable_descriptor, capture_warnings, create_test_state, light_descriptor};

const LIGHT_HEADER: &str = "Part Number,Name,Color,Wattage\n";

#[tokio::test]
async fn test_unknown_key_is_absent_not_error() {
    let (_tmp, _db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();

    assert!(state.catalog_api.resolve("NOPE-404").await.unwrap().is_none());
    assert!(state.catalog_api.resolve("   ").await.is_err());
}

#[tokio::test]
async fn test_resolve_after_import_returns_flat_record() {
    logging::init_test();
    let (_tmp, _db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();

    state
        .import_api
        .import_csv("cable", b"part_number,length_mm\nCBL-001,500\nCBL-002,abc".to_vec())
        .await
        .unwrap();

    let resolution = state.catalog_api.resolve("CBL-001").await.unwrap().unwrap();
    assert_eq!(resolution.owner_source, OwnerSource::Index);
    assert!(resolution.ambiguous_with.is_empty());

    let json = serde_json::to_value(&resolution.record).unwrap();
    assert_eq!(json["category"], "cable");
    assert_eq!(json["part_number"], "CBL-001");
    assert_eq!(json["length_mm"], 500);
}

#[tokio::test]
async fn test_duplicate_key_prefers_last_writer() {
    let (_tmp, db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();

    state
        .import_api
        .import_csv("cable", b"part_number,length_mm\nDUP-1,100\n".to_vec())
        .await
        .unwrap();
    state
        .import_api
        .import_csv("light", format!("{}DUP-1,Ring,White,12\n", LIGHT_HEADER).into_bytes())
        .await
        .unwrap();

    let resolution = state.catalog_api.resolve("DUP-1").await.unwrap().unwrap();
    assert_eq!(resolution.record.category, "light");
    assert_eq!(resolution.owner_source, OwnerSource::Index);
    assert_eq!(resolution.ambiguous_with, vec!["cable".to_string()]);

    // 重启后索引从持久化条目预热，归属不变
    drop(state);
    let restarted = AppState::new(db_path).unwrap();
    let resolution = restarted.catalog_api.resolve("DUP-1").await.unwrap().unwrap();
    assert_eq!(resolution.record.category, "light");
    assert_eq!(resolution.owner_source, OwnerSource::Index);
}

#[tokio::test]
async fn test_duplicate_written_outside_import_is_reported() {
    let (_tmp, db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();

    // cable 表中的 DUP-1 由外部直接写入，不经过导入管道
    let conn = open_sqlite_connection(&db_path).unwrap();
    conn.execute(
        "INSERT INTO cable_products (part_number, length_mm, specifications, created_at, updated_at)
         VALUES ('DUP-1', 100, '{}', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
        [],
    )
    .unwrap();
    state
        .import_api
        .import_csv("light", format!("{}DUP-1,Ring,White,12\n", LIGHT_HEADER).into_bytes())
        .await
        .unwrap();
    assert!(!state.key_index.lookup("DUP-1").unwrap().is_ambiguous());

    let (_guard, logs) = capture_warnings();
    let resolution = state.catalog_api.resolve("DUP-1").await.unwrap().unwrap();
    assert_eq!(resolution.record.category, "light");
    assert_eq!(resolution.owner_source, OwnerSource::Index);
    assert_eq!(resolution.ambiguous_with, vec!["cable".to_string()]);

    let output = logs.contents();
    assert!(output.contains("WARN"), "{}", output);
    assert!(output.contains("key=DUP-1"), "{}", output);
    assert!(output.contains("owner=light"), "{}", output);
    assert!(output.contains("also_in=[\"cable\"]"), "{}", output);

    // 外部归属补录进索引，owner 不变
    let ownership = state.key_index.lookup("DUP-1").unwrap();
    assert_eq!(ownership.owner, "light");
    assert_eq!(ownership.others, vec!["cable".to_string()]);
}

#[tokio::test]
async fn test_unambiguous_key_logs_no_warning() {
    let (_tmp, _db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();
    state
        .import_api
        .import_csv("cable", b"part_number,length_mm\nCBL-001,500\n".to_vec())
        .await
        .unwrap();

    let (_guard, logs) = capture_warnings();
    let resolution = state.catalog_api.resolve("CBL-001").await.unwrap().unwrap();
    assert!(resolution.ambiguous_with.is_empty());
    assert!(!logs.contents().contains("also_in"));
}

#[tokio::test]
async fn test_stale_index_entry_falls_back_to_probe() {
    let (_tmp, _db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();

    state
        .import_api
        .import_csv("cable", b"part_number,length_mm\nCBL-001,500\n".to_vec())
        .await
        .unwrap();

    // 索引指向 light，但 light 表中并无该键
    state.key_index.record_write("CBL-001", "light");
    let resolution = state.catalog_api.resolve("CBL-001").await.unwrap().unwrap();
    assert_eq!(resolution.record.category, "cable");
    assert_eq!(resolution.owner_source, OwnerSource::Probe);

    // 失效条目被清理，之后重新走索引
    assert_eq!(state.key_index.lookup("CBL-001").unwrap().owner, "cable");
    let again = state.catalog_api.resolve("CBL-001").await.unwrap().unwrap();
    assert_eq!(again.owner_source, OwnerSource::Index);

    // 指向不存在记录的孤立条目: 探测无果后返回 None
    state.key_index.record_write("GHOST-1", "cable");
    assert!(state.catalog_api.resolve("GHOST-1").await.unwrap().is_none());
    assert!(state.key_index.lookup("GHOST-1").is_none());
}

#[tokio::test]
async fn test_key_missing_from_index_is_found_by_probe() {
    let (_tmp, _db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();

    state
        .import_api
        .import_csv("light", format!("{}LGT-7,Bar,Red,8\n", LIGHT_HEADER).into_bytes())
        .await
        .unwrap();
    state.key_index.forget("LGT-7", "light");
    assert!(state.key_index.lookup("LGT-7").is_none());

    let resolution = state.catalog_api.resolve("LGT-7").await.unwrap().unwrap();
    assert_eq!(resolution.record.category, "light");
    assert_eq!(resolution.owner_source, OwnerSource::Probe);
    assert_eq!(state.key_index.lookup("LGT-7").unwrap().owner, "light");
}

#[tokio::test]
async fn test_probe_skips_category_without_physical_table() {
    let (_tmp, db_path, state) =
        create_test_state(&[cable_descriptor(), light_descriptor()]).unwrap();

    state
        .import_api
        .import_csv("light", format!("{}LGT-8,Spot,White,5\n", LIGHT_HEADER).into_bytes())
        .await
        .unwrap();
    state.key_index.forget("LGT-8", "light");

    let conn = open_sqlite_connection(&db_path).unwrap();
    conn.execute("DROP TABLE cable_products", []).unwrap();

    let resolution = state.catalog_api.resolve("LGT-8").await.unwrap().unwrap();
    assert_eq!(resolution.record.category, "light");
    assert_eq!(resolution.owner_source, OwnerSource::Probe);

    assert!(state.catalog_api.resolve("NOPE-1").await.unwrap().is_none());
}
