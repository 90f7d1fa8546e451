//! Integration tests for the status, health and HTML routes.

mod common;

use common::TestHarness;

#[tokio::test]
async fn health_reports_version_and_devices() {
    let (h, addr) = TestHarness::with_server().await;
    h.inject("10.0.0.1", 1, 0, false, b"x");

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key("x-request-id"));
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["devices"], 1);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn device_listing_reports_counters() {
    let (h, addr) = TestHarness::with_server().await;
    h.inject_frame("192.168.168.55", 1, &common::fake_jpeg(3 * 1020 + 500, 1));
    h.inject("192.168.168.56", 7, 0, false, &[0u8; 10]);

    let resp = reqwest::get(format!("http://{addr}/api/devices")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let devices: serde_json::Value = resp.json().await.unwrap();
    let devices = devices.as_array().unwrap();
    assert_eq!(devices.len(), 2);

    assert_eq!(devices[0]["id"], "192.168.168.55");
    assert_eq!(devices[0]["rx_frames"], 1);
    assert_eq!(devices[0]["rx_bytes"], 3 * 1020 + 500);
    assert_eq!(devices[0]["lost_chunks"], 0);
    assert!(devices[0]["last_frame_time"].is_string());

    assert_eq!(devices[1]["id"], "192.168.168.56");
    assert_eq!(devices[1]["rx_frames"], 0);
    assert!(devices[1]["last_frame_time"].is_null());
}

#[tokio::test]
async fn single_device_and_default_alias() {
    let (h, addr) = TestHarness::with_server().await;
    h.inject("10.0.0.3", 1, 0, true, b"a");
    h.inject("10.0.0.2", 1, 0, true, b"b");

    let json: serde_json::Value = reqwest::get(format!("http://{addr}/api/devices/10.0.0.2"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["id"], "10.0.0.2");

    let json: serde_json::Value = reqwest::get(format!("http://{addr}/api/devices/default"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["id"], "10.0.0.3");
}

#[tokio::test]
async fn lost_chunks_are_reported() {
    let (h, addr) = TestHarness::with_server().await;
    h.inject("10.0.0.4", 1, 0, false, &[1; 1020]);
    h.inject("10.0.0.4", 1, 1, false, &[2; 1020]);
    h.inject("10.0.0.4", 1, 3, false, &[4; 1020]);
    h.inject("10.0.0.4", 1, 4, true, &[5; 10]);

    let json: serde_json::Value = reqwest::get(format!("http://{addr}/api/devices/10.0.0.4"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["lost_chunks"], 1);
    assert_eq!(json["rx_frames"], 1);
}

#[tokio::test]
async fn unknown_device_is_404_and_not_created() {
    let (h, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/api/devices/10.9.9.9"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "not_found");
    assert!(json["request_id"].is_string());

    let resp = reqwest::get(format!("http://{addr}/api/devices/default"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert!(h.ctx.registry.is_empty());
}

#[tokio::test]
async fn status_and_index_pages() {
    let (h, addr) = TestHarness::with_server().await;
    h.inject("10.0.0.5", 1, 0, true, b"jpeg");

    let status: serde_json::Value = reqwest::get(format!("http://{addr}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["10.0.0.5"]["rx_frames"], 1);

    let resp = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("Available streams"));
    assert!(html.contains("src/default/"));
    assert!(html.contains("src/10.0.0.5/"));
    assert!(html.contains("\"rx_frames\": 1"));
}

#[tokio::test]
async fn viewer_page_requires_known_device() {
    let (h, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!("http://{addr}/src/10.0.0.6/")).await.unwrap();
    assert_eq!(resp.status(), 404);

    h.inject("10.0.0.6", 1, 0, false, b"x");
    let resp = reqwest::get(format!("http://{addr}/src/10.0.0.6/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "<img src='frame.mjpg'>");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (_h, addr) = TestHarness::with_server().await;
    let json: serde_json::Value = reqwest::get(format!("http://{addr}/api-docs/openapi.json"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(json["paths"]["/health"].is_object());
    assert!(json["components"]["schemas"]["DeviceSnapshot"].is_object());
}
