//! Loading catalogs from disk

use sitesnap::{CatalogError, TargetCatalog};

mod common;

#[tokio::test]
async fn loads_catalog_file_in_order() {
    let dir = common::create_test_dir().unwrap();
    let path = dir.path().join("targets.json");
    std::fs::write(
        &path,
        r#"[
            {"id": "landing", "url": "https://shop.example/"},
            {"id": "checkout", "url": "https://shop.example/checkout"},
            {"id": "faq", "url": "https://shop.example/help/faq"}
        ]"#,
    )
    .unwrap();

    let catalog = TargetCatalog::from_json_file(&path).await.unwrap();
    let ids: Vec<_> = catalog.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["landing", "checkout", "faq"]);
}

#[tokio::test]
async fn duplicate_id_in_file_is_rejected_before_any_run() {
    let dir = common::create_test_dir().unwrap();
    let path = dir.path().join("targets.json");
    std::fs::write(
        &path,
        r#"[
            {"id": "home", "url": "https://a.example/"},
            {"id": "home", "url": "https://b.example/"}
        ]"#,
    )
    .unwrap();

    let err = TargetCatalog::from_json_file(&path).await.unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateId(ref id) if id == "home"));
    assert_eq!(err.to_string(), "duplicate target id 'home'");
}

#[tokio::test]
async fn missing_file_reports_path() {
    let dir = common::create_test_dir().unwrap();
    let path = dir.path().join("nope.json");

    let err = TargetCatalog::from_json_file(&path).await.unwrap_err();
    assert!(matches!(err, CatalogError::Read { .. }));
    assert!(err.to_string().contains("nope.json"));
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let dir = common::create_test_dir().unwrap();
    let path = dir.path().join("targets.json");
    std::fs::write(&path, r#"{"id": "home"}"#).unwrap();

    let err = TargetCatalog::from_json_file(&path).await.unwrap_err();
    assert!(matches!(err, CatalogError::Parse { .. }));
}
