use std::sync::Arc;

use base64::Engine;
use serde_json::{json, Value};

use kb_ingest::server::{router, AppState};
use kb_ingest_core::store::memory::InMemoryStore;
use pretty_assertions::assert_eq;

async fn spawn_api() -> (String, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let app = router(AppState {
        store: store.clone(),
        extractor: None,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), store)
}

fn conversation(id: &str, platform: &str, category: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Conversation {}", id),
        "platform": platform,
        "startDate": "2024-01-01T00:00:00Z",
        "endDate": "2024-01-01T00:01:00Z",
        "messages": [{
            "id": format!("{}_m0", id),
            "timestamp": "2024-01-01T00:00:00Z",
            "role": "human",
            "content": format!("hello from {}", platform),
            "platform": platform
        }],
        "metadata": { "category": category, "source": "manual" }
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let (base, _) = spawn_api().await;
    let body: Value = reqwest::get(format!("{}/api/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn insert_list_filter_delete() {
    let (base, store) = spawn_api().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/conversations", base);

    let resp = client
        .post(&url)
        .json(&json!([
            conversation("a", "ChatGPT", "Work"),
            conversation("b", "Claude", "Personal")
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "insertedCount": 2 }));
    assert_eq!(store.len(), 2);

    // Re-posting an existing id inserts nothing.
    let body: Value = client
        .post(&url)
        .json(&json!([conversation("a", "ChatGPT", "Work")]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["insertedCount"], 0);

    let all: Vec<Value> = client
        .get(format!("{}?platform=all&category=", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let claude: Vec<Value> = client
        .get(format!("{}?platform=claude", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(claude.len(), 1);
    assert_eq!(claude[0]["id"], "b");

    let hits: Vec<Value> = client
        .get(format!("{}?q=HELLO%20FROM%20chatgpt", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["id"], "a");

    let body: Value = client
        .delete(&url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "success": true, "deletedCount": 2 }));
    assert!(store.is_empty());
}

#[tokio::test]
async fn insert_rejects_bad_payloads() {
    let (base, _) = spawn_api().await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/conversations", base);

    for payload in [json!([]), json!({ "id": "x" }), json!([{ "id": 1 }])] {
        let resp = client.post(&url).json(&payload).send().await.unwrap();
        assert_eq!(resp.status(), 400, "payload {}", payload);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("Invalid payload"));
    }
}

#[tokio::test]
async fn ingest_endpoint_runs_pipeline() {
    let (base, store) = spawn_api().await;
    let encode = |s: &str| base64::engine::general_purpose::STANDARD.encode(s);

    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/ingest", base))
        .json(&json!({
            "files": [
                { "name": "b.txt", "data": encode("human: hi\nassistant: hello\n") },
                { "name": "scan.pdf", "data": encode("%PDF-1.4") },
                { "name": "a.exe", "data": encode("MZ") }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["inserted"], 1);
    assert_eq!(body["conversations"][0]["title"], "Imported: b.txt");
    let kinds: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    // BTreeMap order: a.exe, scan.pdf
    assert_eq!(kinds, vec!["UnsupportedFormat", "ExtractionFailed"]);
    assert_eq!(store.len(), 1);
}
