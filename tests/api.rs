//! End-to-end tests for the ingest API: the router is bound to an ephemeral
//! port and driven with a real HTTP client, with the extractor in stub mode.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use dart_ingest::config::ConfigStore;
use dart_ingest::extractor::{Extractor, ParseExtractClient};
use dart_ingest::server::{AppState, routes::create_router};
use dart_ingest::storage::SqliteStorage;

struct TestApp {
    base_url: String,
    client: reqwest::Client,
    // keeps config.json and data.db alive for the test's duration
    _dir: tempfile::TempDir,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with_config(json!({"stub": true})).await
}

async fn spawn_app_with_config(config_json: Value) -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let config = Arc::new(ConfigStore::new(dir.path().join("config.json")));
    config.merge(&config_json).unwrap();

    let db_path = dir.path().join("data.db");
    let storage = Arc::new(Mutex::new(
        SqliteStorage::new(db_path.to_str().unwrap()).unwrap(),
    ));
    let extractor: Arc<dyn Extractor> = Arc::new(ParseExtractClient::new());

    let router = create_router(AppState {
        storage,
        extractor,
        config,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        _dir: dir,
    }
}

fn image_form() -> Form {
    let part = Part::bytes(vec![0xFF, 0xD8, 0xFF])
        .file_name("board.jpg")
        .mime_str("image/jpeg")
        .unwrap();
    Form::new().part("image", part)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;

    let body: Value = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn config_merge_roundtrip() {
    let app = spawn_app().await;

    let current: Value = app
        .client
        .get(app.url("/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(current["stub"], true);
    assert_eq!(current["api_key"], Value::Null);

    let merged: Value = app
        .client
        .post(app.url("/config"))
        .json(&json!({"api_key": "secret", "extra_params": {"lang": "de"}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(merged["api_key"], "secret");
    assert_eq!(merged["extra_params"]["lang"], "de");
    // untouched fields survive the merge
    assert_eq!(merged["stub"], true);

    let reloaded: Value = app
        .client
        .get(app.url("/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reloaded, merged);
}

#[tokio::test]
async fn config_rejects_wrongly_typed_payload() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/config"))
        .json(&json!({"stub": "not-a-bool"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn upload_extracts_normalizes_and_persists() {
    let app = spawn_app().await;

    let form = image_form()
        .text("player_names", "Anna, Ben,,Anna")
        .text("bust", "yes")
        .text("meta", r#"{"mode": "501"}"#);
    let response = app
        .client
        .post(app.url("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let id = body["id"].as_i64().unwrap();
    assert_eq!(body["filename"], "board.jpg");
    assert_eq!(body["raw"]["stub"], true);

    let players = body["normalized"]["players"].as_array().unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0]["playerName"], "Anna");
    assert_eq!(players[1]["playerName"], "Ben");
    assert_eq!(players[0]["bust"], true);
    // the stub payload carries two round tokens
    let visits = players[0]["legs"][0]["visits"].as_array().unwrap();
    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0]["scoreOfVisit"], 60);
    assert_eq!(body["normalized"]["meta"]["mode"], "501");

    // listing projection
    let listed: Value = app
        .client
        .get(app.url("/ingests"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"].as_i64().unwrap(), id);
    assert_eq!(listed[0]["filename"], "board.jpg");
    assert_eq!(listed[0]["playerNames"], json!(["Anna", "Ben"]));
    assert_eq!(listed[0]["bust"], true);
    assert!(listed[0].get("raw").is_none());

    // full record
    let record: Value = app
        .client
        .get(app.url(&format!("/ingests/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["raw"]["engine"], "demo");
    assert_eq!(record["meta"], json!({"mode": "501"}));
    assert_eq!(record["normalized"], body["normalized"]);

    // delete, then both get and delete 404
    let deleted: Value = app
        .client
        .delete(app.url(&format!("/ingests/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted, json!({"deleted": true}));

    let missing = app
        .client
        .get(app.url(&format!("/ingests/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body, json!({"detail": "Not found"}));

    let missing_delete = app
        .client
        .delete(app.url(&format!("/ingests/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_delete.status(), 404);
}

#[tokio::test]
async fn upload_without_names_defaults_to_player_1() {
    let app = spawn_app().await;

    let body: Value = app
        .client
        .post(app.url("/upload"))
        .multipart(image_form())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let players = body["normalized"]["players"].as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["playerName"], "Player 1");
    assert_eq!(players[0]["bust"], false);
    assert_eq!(body["normalized"]["meta"], json!({}));
}

#[tokio::test]
async fn upload_tolerates_malformed_meta() {
    let app = spawn_app().await;

    let form = image_form().text("meta", "{not json");
    let body: Value = app
        .client
        .post(app.url("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["normalized"]["meta"], json!({}));
}

#[tokio::test]
async fn upload_without_image_is_rejected() {
    let app = spawn_app().await;

    let form = Form::new().text("player_names", "Anna");
    let response = app
        .client
        .post(app.url("/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No image file provided");
}

#[tokio::test]
async fn upload_maps_extraction_failure_to_502() {
    // live mode with no api key configured anywhere
    let app = spawn_app_with_config(json!({"stub": false})).await;

    let response = app
        .client
        .post(app.url("/upload"))
        .multipart(image_form())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("api_key"));

    // the failed upload left nothing behind
    let listed: Value = app
        .client
        .get(app.url("/ingests"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn upload_with_empty_filename_is_rejected() {
    let app = spawn_app().await;

    let part = Part::bytes(vec![0xFF, 0xD8])
        .file_name("")
        .mime_str("image/jpeg")
        .unwrap();
    let response = app
        .client
        .post(app.url("/upload"))
        .multipart(Form::new().part("image", part))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No image file selected");
}

#[tokio::test]
async fn list_respects_limit_parameter() {
    let app = spawn_app().await;

    for _ in 0..3 {
        let response = app
            .client
            .post(app.url("/upload"))
            .multipart(image_form())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let listed: Value = app
        .client
        .get(app.url("/ingests?limit=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    // newest first
    assert!(listed[0]["id"].as_i64().unwrap() > listed[1]["id"].as_i64().unwrap());
}
