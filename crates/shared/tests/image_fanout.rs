use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::config::ImageProviderConfig;
use shared::llm::{ImageApiClient, generate_images};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone, Default)]
struct TestServerState {
    seen_prompts: Arc<Mutex<Vec<String>>>,
}

#[tokio::test]
async fn failed_prompt_keeps_its_index_without_shifting() {
    let state = TestServerState::default();
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = ImageApiClient::new(config_for(url)).expect("client should build");
    let prompts = vec![
        "FAIL diagram of the water cycle".to_string(),
        "labeled plant cell".to_string(),
    ];
    let results = generate_images(&client, &prompts, 4).await;

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0], None, "failed prompt must hold its slot");
    assert_eq!(
        results[1].as_deref(),
        Some("https://images.test/labeled plant cell.png")
    );
}

#[tokio::test]
async fn results_stay_positional_under_concurrency() {
    let state = TestServerState::default();
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = ImageApiClient::new(config_for(url)).expect("client should build");
    let prompts: Vec<String> = (0..4).map(|idx| format!("prompt {idx}")).collect();
    let results = generate_images(&client, &prompts, 8).await;

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    for (idx, result) in results.iter().enumerate() {
        assert_eq!(
            result.as_deref(),
            Some(format!("https://images.test/prompt {idx}.png").as_str()),
            "result {idx} must correspond to prompt {idx}"
        );
    }
}

#[tokio::test]
async fn fan_out_is_capped_at_max_images() {
    let state = TestServerState::default();
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = ImageApiClient::new(config_for(url)).expect("client should build");
    let prompts: Vec<String> = (0..6).map(|idx| format!("prompt {idx}")).collect();
    let results = generate_images(&client, &prompts, 2).await;

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    assert_eq!(results.len(), 2);
    assert_eq!(state.seen_prompts.lock().await.len(), 2);
}

#[tokio::test]
async fn malformed_payload_counts_as_failure_not_panic() {
    let state = TestServerState::default();
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = ImageApiClient::new(config_for(url)).expect("client should build");
    let prompts = vec!["NOURL broken provider reply".to_string()];
    let results = generate_images(&client, &prompts, 4).await;

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("test server task should join");

    assert_eq!(results, vec![None]);
}

fn config_for(images_url: String) -> ImageProviderConfig {
    ImageProviderConfig {
        images_url,
        api_key: "test-image-key".to_string(),
        model: "test-image-model".to_string(),
        timeout_ms: 5_000,
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/images/generations", post(test_images_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (
        format!("http://{local_addr}/images/generations"),
        shutdown_tx,
        server_task,
    )
}

// Replies are keyed on the prompt text so concurrent requests stay
// deterministic: "FAIL…" prompts get a 500, "NOURL…" prompts a payload with
// no url field, everything else an echo URL.
async fn test_images_handler(
    State(state): State<TestServerState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let prompt = payload
        .get("prompt")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state.seen_prompts.lock().await.push(prompt.clone());

    if prompt.starts_with("FAIL") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "generation failed" })),
        );
    }

    if prompt.starts_with("NOURL") {
        return (StatusCode::OK, Json(json!({ "data": [{}] })));
    }

    (
        StatusCode::OK,
        Json(json!({
            "data": [
                { "url": format!("https://images.test/{prompt}.png") }
            ]
        })),
    )
}
