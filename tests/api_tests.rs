//! HTTP API integration tests: auth gate, CRUD scenario, error mapping, PATCH policy.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{bearer, http, spawn_api, CountingStore, DeletedUnderfootStore, DownStore};
use strata::config::PatchPolicy;
use strata::identity::{mint_token, ServiceAccount, StaticTokenVerifier};
use strata::server::AppState;
use strata::storage::SharedStore;

async fn api() -> String {
    spawn_api(SharedStore::in_memory(), PatchPolicy::RequireExisting).await
}

#[tokio::test]
async fn health_is_public_text() {
    let base = api().await;
    let resp = http().get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn create_get_delete_scenario() {
    let base = api().await;
    let c = http();

    let resp = c.post(format!("{base}/projects")).header("authorization", bearer()).json(&json!({"name": "Demo"})).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 20);
    assert_eq!(body.as_object().unwrap().len(), 1);

    let resp = c.get(format!("{base}/projects/{id}")).header("authorization", bearer()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: Value = resp.json().await.unwrap();
    assert_eq!(doc["id"], json!(id));
    assert_eq!(doc["name"], json!("Demo"));
    assert!(chrono::DateTime::parse_from_rfc3339(doc["createdAt"].as_str().unwrap()).is_ok());
    assert!(doc.get("description").is_none());

    let resp = c.delete(format!("{base}/projects/{id}")).header("authorization", bearer()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"ok": true}));

    let resp = c.get(format!("{base}/projects/{id}")).header("authorization", bearer()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err, json!({"status": "error", "code": "not_found", "message": "Not found"}));

    // deleting again is still fine
    let resp = c.delete(format!("{base}/projects/{id}")).header("authorization", bearer()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_requests_never_reach_the_store() {
    let (store, calls) = CountingStore::new();
    let base = spawn_api(SharedStore::new(store), PatchPolicy::RequireExisting).await;
    let c = http();

    let other_issuer = ServiceAccount { project_id: Some("elsewhere".into()), client_email: None, signing_key: "integration-key".into() };
    let foreign = mint_token(&other_issuer, "tester", Duration::from_secs(60)).unwrap();
    let headers: Vec<Option<String>> = vec![
        None,
        Some(common::token()),
        Some(format!("Basic {}", common::token())),
        Some("Bearer ".into()),
        Some("Bearer not.a.token".into()),
        Some(format!("Bearer {foreign}")),
    ];

    for h in headers {
        for (method, path) in [("GET", "/projects"), ("POST", "/projects"), ("GET", "/projects/x"), ("PATCH", "/projects/x"), ("DELETE", "/projects/x")] {
            let mut req = c.request(method.parse().unwrap(), format!("{base}{path}")).body(r#"{"name":"x"}"#);
            if let Some(v) = &h {
                req = req.header("authorization", v);
            }
            let resp = req.send().await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {path} with {h:?}");
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body, json!({"status": "error", "code": "unauthorized", "message": "Unauthorized"}));
        }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_create_is_rejected_before_the_store() {
    let (store, calls) = CountingStore::new();
    let base = spawn_api(SharedStore::new(store), PatchPolicy::RequireExisting).await;
    let c = http();

    let resp = c.post(format!("{base}/projects")).header("authorization", bearer()).json(&json!({"name": ""})).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "validation_failed");
    assert_eq!(body["fields"][0]["field"], "name");
    assert_eq!(body["fields"][0]["code"], "too_short");

    let resp = c.post(format!("{base}/projects")).header("authorization", bearer()).json(&json!({"description": 3})).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["fields"].as_array().unwrap().len(), 2);

    let resp = c.post(format!("{base}/projects")).header("authorization", bearer()).body("{not json").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_json");

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn patch_requires_existing_project_by_default() {
    let (store, calls) = CountingStore::new();
    let base = spawn_api(SharedStore::new(store), PatchPolicy::RequireExisting).await;
    let c = http();

    let resp = c.patch(format!("{base}/projects/ghost")).header("authorization", bearer()).json(&json!({"name": "x"})).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    // one conditional update, nothing written
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let resp = c.get(format!("{base}/projects/ghost")).header("authorization", bearer()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = c.post(format!("{base}/projects")).header("authorization", bearer()).json(&json!({"name": "Before"})).send().await.unwrap();
    let id = resp.json::<Value>().await.unwrap()["id"].as_str().unwrap().to_string();
    let resp = c
        .patch(format!("{base}/projects/{id}"))
        .header("authorization", bearer())
        .json(&json!({"name": "After", "meta": {"tags": ["a"]}, "createdAt": "1970-01-01T00:00:00.000Z"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"ok": true}));

    let doc: Value = c.get(format!("{base}/projects/{id}")).header("authorization", bearer()).send().await.unwrap().json().await.unwrap();
    assert_eq!(doc["name"], "After");
    assert_eq!(doc["meta"], json!({"tags": ["a"]}));
    assert_ne!(doc["createdAt"], "1970-01-01T00:00:00.000Z");

    let resp = c.patch(format!("{base}/projects/{id}")).header("authorization", bearer()).json(&json!(["not", "an", "object"])).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_upserts_when_configured() {
    let base = spawn_api(SharedStore::in_memory(), PatchPolicy::Upsert).await;
    let c = http();

    let resp = c.patch(format!("{base}/projects/ghost")).header("authorization", bearer()).json(&json!({"status": "draft"})).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: Value = c.get(format!("{base}/projects/ghost")).header("authorization", bearer()).send().await.unwrap().json().await.unwrap();
    assert_eq!(doc, json!({"id": "ghost", "status": "draft"}));
}

#[tokio::test]
async fn list_is_newest_first_and_capped() {
    let store = SharedStore::in_memory();
    for i in 0..55 {
        store.projects().create(strata::model::NewProject::new(format!("P{i}"), None)).unwrap();
    }
    let base = spawn_api(store, PatchPolicy::RequireExisting).await;
    let body: Value = http().get(format!("{base}/projects")).header("authorization", bearer()).send().await.unwrap().json().await.unwrap();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 50);
    assert_eq!(data[0]["name"], "P54");
    assert_eq!(data[49]["name"], "P5");
    for d in data {
        assert!(d["id"].is_string());
    }
}

#[tokio::test]
async fn store_outage_maps_to_503() {
    let base = spawn_api(SharedStore::new(DownStore), PatchPolicy::RequireExisting).await;
    let resp = http().get(format!("{base}/projects")).header("authorization", bearer()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "store_unavailable");
    assert!(!body["message"].as_str().unwrap().contains("offline"));
}

#[tokio::test]
async fn cors_headers_are_present() {
    let base = api().await;
    let resp = http().get(format!("{base}/health")).header("origin", "http://example.test").send().await.unwrap();
    assert!(resp.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn persisted_store_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = strata::config::StoreConfig::default().with_data_dir(tmp.path().to_str().unwrap());

    let base = spawn_api(cfg.open().unwrap(), PatchPolicy::RequireExisting).await;
    let resp = http().post(format!("{base}/projects")).header("authorization", bearer()).json(&json!({"name": "Kept", "description": "d"})).send().await.unwrap();
    let id = resp.json::<Value>().await.unwrap()["id"].as_str().unwrap().to_string();

    let base = spawn_api(cfg.open().unwrap(), PatchPolicy::RequireExisting).await;
    let doc: Value = http().get(format!("{base}/projects/{id}")).header("authorization", bearer()).send().await.unwrap().json().await.unwrap();
    assert_eq!(doc["name"], "Kept");
    assert_eq!(doc["description"], "d");
}

#[tokio::test]
async fn static_verifier_for_offline_demos() {
    let verifier = StaticTokenVerifier::new().with_token("demo-token", "demo-user");
    let base = common::spawn_state(AppState::new(SharedStore::in_memory(), verifier, PatchPolicy::RequireExisting)).await;
    let c = http();

    let resp = c.get(format!("{base}/projects")).header("authorization", "Bearer demo-token").send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"data": []}));

    let resp = c.get(format!("{base}/projects")).header("authorization", bearer()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patch_racing_delete_does_not_recreate_project() {
    let store = SharedStore::new(DeletedUnderfootStore { inner: strata::storage::MemoryStore::in_memory() });
    let id = store.projects().create(strata::model::NewProject::new("A", None)).unwrap();
    let base = spawn_api(store.clone(), PatchPolicy::RequireExisting).await;

    let resp = http().patch(format!("{base}/projects/{id}")).header("authorization", bearer()).json(&json!({"name": "B"})).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(store.projects().get(&id).unwrap().is_none());
}
