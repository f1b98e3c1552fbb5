use cutsheet::domain::model::{FailureReason, StoredObject};
use cutsheet::domain::ports::{DrawingStore, ObjectPattern};
use cutsheet::{
    read_drawing, AssetLibrary, ComposeEngine, ComposePipeline, ComposeRequest, CutsheetError,
    HttpStore, TomlConfig,
};
use dxf::entities::{Circle, Entity, EntityType};
use dxf::{Drawing, Point};
use httpmock::prelude::*;
use tempfile::TempDir;

fn circle_dxf(r: f64) -> Vec<u8> {
    let mut drawing = Drawing::new();
    let circle = Circle::new(Point::new(0.0, 0.0, 0.0), r);
    drawing.add_entity(Entity::new(EntityType::Circle(circle)));
    let mut bytes = Vec::new();
    drawing.save(&mut bytes).unwrap();
    bytes
}

#[tokio::test]
async fn test_resolve_picks_matching_object() {
    let server = MockServer::start_async().await;
    let list_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/folders/orders/objects")
                .query_param("prefix", "A1");
            then.status(200).json_body(serde_json::json!([
                { "id": "obj-3", "name": "A1_preview.png" },
                { "id": "obj-2", "name": "A1_cut_v2.dxf" },
                { "id": "obj-1", "name": "A1_cut.dxf" }
            ]));
        })
        .await;

    let store = HttpStore::new(&server.base_url(), ObjectPattern::new("_cut", "dxf")).unwrap();
    let object = store.resolve("orders", "A1").await.unwrap();

    list_mock.assert_async().await;
    assert_eq!(object.id, "obj-1");
    assert_eq!(object.name, "A1_cut.dxf");
}

#[tokio::test]
async fn test_missing_folder_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/folders/gone/objects");
            then.status(404);
        })
        .await;

    let store = HttpStore::new(&server.base_url(), ObjectPattern::default()).unwrap();
    let err = store.resolve("gone", "A1").await.unwrap_err();

    assert!(matches!(err, CutsheetError::ObjectNotFound { .. }));
}

#[tokio::test]
async fn test_fetch_and_upload() {
    let server = MockServer::start_async().await;
    let content_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/objects/obj-1/content");
            then.status(200).body(b"DXF BYTES");
        })
        .await;
    let upload_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/folders/out/objects")
                .query_param("name", "Plan 01.dxf")
                .body("DOC");
            then.status(201).json_body(serde_json::json!({
                "id": "doc-9",
                "url": "https://files.example.com/doc-9"
            }));
        })
        .await;

    let store = HttpStore::new(&server.base_url(), ObjectPattern::default()).unwrap();
    let object = StoredObject {
        id: "obj-1".to_string(),
        name: "A1.dxf".to_string(),
    };

    assert_eq!(store.fetch(&object).await.unwrap(), b"DXF BYTES");
    let receipt = store.upload("out", "Plan 01.dxf", b"DOC").await.unwrap();

    content_mock.assert_async().await;
    upload_mock.assert_async().await;
    assert_eq!(receipt.id, "doc-9");
    assert_eq!(receipt.url, "https://files.example.com/doc-9");
}

#[tokio::test]
async fn test_compose_through_http_store() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/folders/orders/objects")
                .query_param("prefix", "A1");
            then.status(200)
                .json_body(serde_json::json!([{ "id": "obj-1", "name": "A1.dxf" }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/folders/orders/objects")
                .query_param("prefix", "A2");
            then.status(200)
                .json_body(serde_json::json!([{ "id": "obj-2", "name": "A2.dxf" }]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/objects/obj-1/content");
            then.status(200).body(circle_dxf(50.0));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/objects/obj-2/content");
            then.status(500);
        })
        .await;
    let upload_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/folders/out/objects")
                .query_param("name", "sheet.dxf");
            then.status(200).json_body(serde_json::json!({
                "id": "doc-1",
                "url": "https://files.example.com/doc-1"
            }));
        })
        .await;

    let request = ComposeRequest::from_json(
        r#"{
            "plans": [{
                "name": "01",
                "source_folder": "orders",
                "items": [
                    { "item_id": "A1", "sku": "PLAC-3010-2FH-AC-DOU-070-00001" },
                    { "item_id": "A2", "sku": "PLAC-3010-2FH-AC-DOU-070-00002" }
                ]
            }],
            "destination_folder": "out",
            "output_filename": "sheet"
        }"#,
    )
    .unwrap();

    let assets_dir = TempDir::new().unwrap();
    let config = TomlConfig::default();
    let assets = AssetLibrary::new(assets_dir.path(), "separator.dxf", config.fallback);
    let store = HttpStore::new(&server.base_url(), config.storage.pattern()).unwrap();
    let pipeline = ComposePipeline::new(store, config, request, assets).await;

    let report = ComposeEngine::new(pipeline).run().await.unwrap();

    upload_mock.assert_async().await;
    assert_eq!(report.destination.url, "https://files.example.com/doc-1");
    assert_eq!(report.placed_items(), 1);
    assert_eq!(report.failed_ids(), vec!["A2"]);
    assert_eq!(report.failed_items[0].reason, FailureReason::FetchFailed);
    assert!((report.width - 100.0).abs() < 1e-6);
    assert!((report.height - 100.0).abs() < 1e-6);

    // the circle itself survives as valid DXF
    assert_eq!(read_drawing(&circle_dxf(50.0)).unwrap().len(), 1);
}
