// ==========================================
// API 层集成测试
// ==========================================
// 测试目标: 品类列表 / 表格配置 / 元数据刷新 / 错误信封
// ==========================================


use catalog_portal::api::{error_code, map_api_error, ApiError, ErrorResponse};
use catalog_portal::engine::ColumnAlign;
use catalog_portal::repository::MetadataRepository;
use std::sync::{Arc, Mutex};
use test_helpers::{
    cable_descriptor, create_test_db, create_test_state, lens_descriptor, light_descriptor,
};

#[test]
fn test_list_categories_in_metadata_order() {
    let (_tmp, _db_path, state) =
        create_test_state(&[light_descriptor(), cable_descriptor()]).unwrap();

    let ids: Vec<String> = state
        .catalog_api
        .list_categories()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, vec!["light", "cable"]);
}

#[test]
fn test_grid_config_for_category() {
    let (_tmp, _db_path, state) = create_test_state(&[light_descriptor()]).unwrap();

    let grid = state.catalog_api.grid_config("light").unwrap();
    assert_eq!(grid.display_name, "Lights");

    let fields: Vec<&str> = grid.columns.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(
        fields,
        vec!["part_number", "name", "color", "specifications.wattage"]
    );
    assert_eq!(grid.columns[3].header, "Wattage (W)");
    assert_eq!(grid.columns[3].align, ColumnAlign::Right);
    assert!(!grid.columns[3].sortable);

    // 停用的筛选器不出现在表格配置中
    assert_eq!(grid.filters.len(), 1);
    assert_eq!(grid.filters[0].field, "color");

    let err = state.catalog_api.grid_config("drone").unwrap_err();
    assert_eq!(error_code(&err), "NOT_FOUND");
}

#[tokio::test]
async fn test_refresh_picks_up_new_category() {
    let (_tmp, db_path, state) = create_test_state(&[cable_descriptor()]).unwrap();
    assert!(state.catalog_api.grid_config("lens").is_err());

    // 管理端写入新品类
    let conn = catalog_portal::db::open_sqlite_connection(&db_path).unwrap();
    let admin_repo = MetadataRepository::from_connection(Arc::new(Mutex::new(conn)));
    admin_repo.upsert_category(&lens_descriptor(), 2).unwrap();

    let count = state.catalog_api.refresh_metadata().unwrap();
    assert_eq!(count, 2);
    assert!(state.catalog_api.grid_config("lens").is_ok());

    // 刷新时已补齐物理表，可直接导入
    let report = state
        .import_api
        .import_csv(
            "lens",
            b"Part Number,Name,Focal Length,Motorized\nLEN-16,Fixed 16mm,16,no\n".to_vec(),
        )
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn test_invalidate_reloads_on_next_read() {
    let (_tmp, db_path, state) = create_test_state(&[cable_descriptor()]).unwrap();

    let conn = catalog_portal::db::open_sqlite_connection(&db_path).unwrap();
    let admin_repo = MetadataRepository::from_connection(Arc::new(Mutex::new(conn)));
    admin_repo.upsert_category(&light_descriptor(), 2).unwrap();

    // 刷新间隔内不会自动看到新品类
    assert_eq!(state.catalog_api.list_categories().len(), 1);

    state.registry.invalidate();
    assert_eq!(state.catalog_api.list_categories().len(), 2);
}

#[test]
fn test_empty_database_starts_without_categories() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let state = catalog_portal::app::AppState::new(db_path).unwrap();
    assert!(state.catalog_api.list_categories().is_empty());
}

#[test]
fn test_error_envelope() {
    let err = ApiError::NotFound("drone".to_string());
    let response = ErrorResponse::from_error(&err);
    assert_eq!(response.code, "NOT_FOUND");
    assert!(response.message.contains("drone"));

    let json: serde_json::Value =
        serde_json::from_str(&map_api_error(ApiError::DatabaseError("locked".to_string())))
            .unwrap();
    assert_eq!(json["code"], "DATABASE_ERROR");
}
